//! Single stages runnable against the local CI
//!
//! A stage knows which task it submits, which files go into its `book`
//! directory and which artifact directories below
//! `<data>/<collection id>/` it reads and writes.

use crate::execution::process::{CommandRunner, CommandSpec, ProcessError};
use crate::tasks::artifacts::*;
use crate::tasks::{TaskArgs, TaskError, TaskKind};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;

/// Style name used for recipe and stylesheet files handed to `bake`
pub const STYLE_NAME: &str = "stylesheet";

#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to prepare {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("failed to render task definition: {0}")]
    Render(#[from] serde_yaml::Error),

    #[error("build tool failed: {0}")]
    BuildTool(#[from] ProcessError),
}

impl StageError {
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            StageError::BuildTool(e) => e.captured_output(),
            _ => None,
        }
    }
}

fn prepare_err(path: &Path) -> impl FnOnce(std::io::Error) -> StageError + '_ {
    move |source| StageError::Prepare {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalStage {
    Fetch {
        server: String,
        collection_id: String,
        version: String,
    },
    Assemble {
        collection_id: String,
    },
    Bake {
        collection_id: String,
        recipe: PathBuf,
        style: PathBuf,
    },
    Mathify {
        collection_id: String,
    },
    BuildPdf {
        collection_id: String,
    },
    AssembleMeta {
        collection_id: String,
    },
    BakeMeta {
        collection_id: String,
    },
    Disassemble {
        collection_id: String,
    },
    Jsonify {
        collection_id: String,
    },
}

impl LocalStage {
    pub fn collection_id(&self) -> &str {
        match self {
            LocalStage::Fetch { collection_id, .. }
            | LocalStage::Assemble { collection_id }
            | LocalStage::Bake { collection_id, .. }
            | LocalStage::Mathify { collection_id }
            | LocalStage::BuildPdf { collection_id }
            | LocalStage::AssembleMeta { collection_id }
            | LocalStage::BakeMeta { collection_id }
            | LocalStage::Disassemble { collection_id }
            | LocalStage::Jsonify { collection_id } => collection_id,
        }
    }

    pub fn task_kind(&self) -> TaskKind {
        match self {
            LocalStage::Fetch { .. } => TaskKind::FetchBook,
            LocalStage::Assemble { .. } => TaskKind::AssembleBook,
            LocalStage::Bake { .. } => TaskKind::BakeBook,
            LocalStage::Mathify { .. } => TaskKind::MathifyBook,
            LocalStage::BuildPdf { .. } => TaskKind::BuildPdf,
            LocalStage::AssembleMeta { .. } => TaskKind::AssembleBookMetadata,
            LocalStage::BakeMeta { .. } => TaskKind::BakeBookMetadata,
            LocalStage::Disassemble { .. } => TaskKind::DisassembleBook,
            LocalStage::Jsonify { .. } => TaskKind::JsonifyBook,
        }
    }

    /// Earlier stages' outputs this stage reads from the data directory
    pub fn data_inputs(&self) -> &'static [&'static str] {
        match self {
            LocalStage::Fetch { .. } => &[],
            LocalStage::Assemble { .. } => &[FETCHED_BOOK],
            LocalStage::Bake { .. } => &[ASSEMBLED_BOOK],
            LocalStage::Mathify { .. } => &[BAKED_BOOK],
            LocalStage::BuildPdf { .. } => &[MATHIFIED_BOOK],
            LocalStage::AssembleMeta { .. } => &[ASSEMBLED_BOOK],
            LocalStage::BakeMeta { .. } => &[FETCHED_BOOK, BAKED_BOOK, ASSEMBLED_BOOK_METADATA],
            LocalStage::Disassemble { .. } => &[FETCHED_BOOK, BAKED_BOOK, BAKED_BOOK_METADATA],
            LocalStage::Jsonify { .. } => &[DISASSEMBLED_BOOK],
        }
    }

    pub fn output(&self) -> &'static str {
        match self {
            LocalStage::Fetch { .. } => FETCHED_BOOK,
            LocalStage::Assemble { .. } => ASSEMBLED_BOOK,
            LocalStage::Bake { .. } => BAKED_BOOK,
            LocalStage::Mathify { .. } => MATHIFIED_BOOK,
            LocalStage::BuildPdf { .. } => ARTIFACTS,
            LocalStage::AssembleMeta { .. } => ASSEMBLED_BOOK_METADATA,
            LocalStage::BakeMeta { .. } => BAKED_BOOK_METADATA,
            LocalStage::Disassemble { .. } => DISASSEMBLED_BOOK,
            LocalStage::Jsonify { .. } => JSONIFIED_BOOK,
        }
    }

    /// Files written into the `book` input directory
    pub fn book_files(&self) -> Vec<(&'static str, String)> {
        let mut files = Vec::new();
        if let LocalStage::Fetch { server, .. } = self {
            files.push(("server", server.clone()));
        }
        files.push(("collection_id", self.collection_id().to_string()));
        match self {
            LocalStage::Fetch { version, .. } => files.push(("version", version.clone())),
            LocalStage::Bake { .. } => files.push(("style", STYLE_NAME.to_string())),
            LocalStage::BuildPdf { .. } => files.push(("pdf_filename", "collection.pdf".to_string())),
            _ => {}
        }
        files
    }

    /// Stage-specific task arguments on top of the caller's
    pub fn task_args(&self, mut args: TaskArgs) -> TaskArgs {
        if let LocalStage::BuildPdf { .. } = self {
            // No bucket behind a local run
            args.bucket_name = Some("none".to_string());
        }
        args
    }

    /// Create the temporary input directories and the artifact arguments
    pub fn prepare(&self, data_dir: &Path) -> Result<PreparedStage, StageError> {
        let book_dir = TempDir::new().map_err(prepare_err(data_dir))?;
        for (name, content) in self.book_files() {
            let path = book_dir.path().join(name);
            fs::write(&path, content).map_err(prepare_err(&path))?;
        }

        let data_dir = if data_dir.is_absolute() {
            data_dir.to_path_buf()
        } else {
            std::env::current_dir().map_err(prepare_err(data_dir))?.join(data_dir)
        };
        let book_data = data_dir.join(self.collection_id());

        let mut artifact_args = vec![input_arg(BOOK, book_dir.path())];
        for name in self.data_inputs() {
            artifact_args.push(input_arg(name, &book_data.join(name)));
        }

        let recipes_dir = match self {
            LocalStage::Bake { recipe, style, .. } => {
                let dir = recipes_dir(recipe, style)?;
                artifact_args.push(input_arg(CNX_RECIPES, dir.path()));
                Some(dir)
            }
            _ => None,
        };

        artifact_args.push(format!(
            "--output={}={}",
            self.output(),
            book_data.join(self.output()).display()
        ));

        debug!("Prepared {} with {:?}", self.task_kind(), artifact_args);

        Ok(PreparedStage {
            book_dir,
            recipes_dir,
            artifact_args,
        })
    }
}

fn input_arg(name: &str, path: &Path) -> String {
    format!("--input={}={}", name, path.display())
}

/// Recipe and stylesheet laid out where the bake body looks for them
fn recipes_dir(recipe: &Path, style: &Path) -> Result<TempDir, StageError> {
    let dir = TempDir::new().map_err(prepare_err(recipe))?;
    let copies = [
        (recipe, format!("recipes/output/{}.css", STYLE_NAME)),
        (style, format!("styles/output/{}-pdf.css", STYLE_NAME)),
    ];
    for (source, relative) in copies {
        let target = dir.path().join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(prepare_err(parent))?;
        }
        fs::copy(source, &target).map_err(prepare_err(source))?;
    }
    Ok(dir)
}

/// Input directories of one stage run; removed when dropped
#[derive(Debug)]
pub struct PreparedStage {
    book_dir: TempDir,
    recipes_dir: Option<TempDir>,
    artifact_args: Vec<String>,
}

impl PreparedStage {
    pub fn book_dir(&self) -> &Path {
        self.book_dir.path()
    }

    pub fn recipes_dir(&self) -> Option<&Path> {
        self.recipes_dir.as_ref().map(TempDir::path)
    }

    /// `--input=`/`--output=` arguments for the submission
    pub fn artifact_args(&self) -> &[String] {
        &self.artifact_args
    }
}

/// Where task definitions come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSource {
    /// The builders compiled into this binary
    Builtin,
    /// `<cops>/bakery/build task <name> --taskargs=<json>`
    BuildTool { cops_dir: PathBuf },
}

impl TaskSource {
    /// Serialized task definition for `kind`
    pub async fn render(
        &self,
        kind: TaskKind,
        args: &TaskArgs,
        runner: &dyn CommandRunner,
    ) -> Result<String, StageError> {
        match self {
            TaskSource::Builtin => Ok(kind.build(args)?.to_yaml()?),
            TaskSource::BuildTool { cops_dir } => {
                let build = cops_dir.join("bakery").join("build");
                let mut command = CommandSpec::new(&build.to_string_lossy())
                    .arg("task")
                    .arg(kind.name());
                if *args != TaskArgs::default() {
                    command = command.arg(format!("--taskargs={}", args.to_json()?));
                }
                Ok(runner.capture(&command).await?)
            }
        }
    }
}
