//! CLI command definitions

use crate::execution::{LocalStage, StageOptions, TaskSource};
use crate::pipelines::PipelineKind;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Run one stage locally
#[derive(Debug, Args, Clone)]
pub struct ExecuteCommand {
    /// Path to output-producer-service directory; its build tool renders the task
    #[arg(short, long, global = true)]
    pub cops: Option<PathBuf>,

    /// Path to data directory (required)
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Name of image to use instead of default
    #[arg(short, long, global = true)]
    pub image: Option<String>,

    /// Use a particular tag of the default remote task image resource
    #[arg(short, long, global = true)]
    pub tag: Option<String>,

    /// Persist containers after running the command
    #[arg(short, long, global = true)]
    pub persist: bool,

    #[command(subcommand)]
    pub stage: StageCommand,
}

impl ExecuteCommand {
    pub fn task_source(&self) -> TaskSource {
        match &self.cops {
            Some(cops_dir) => TaskSource::BuildTool {
                cops_dir: cops_dir.clone(),
            },
            None => TaskSource::Builtin,
        }
    }

    /// Options are global, so clap cannot enforce `--data` itself
    pub fn options(&self) -> Result<StageOptions> {
        let Some(data_dir) = self.data.clone() else {
            bail!("the --data <DATA> option is required");
        };
        Ok(StageOptions {
            data_dir,
            image: self.image.clone(),
            tag: self.tag.clone(),
            persist: self.persist,
        })
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum StageCommand {
    /// Fetch a book
    #[command(alias = "f")]
    Fetch {
        /// Content server to fetch from
        server: String,
        /// Collection id of collection to fetch
        collid: String,
        /// Version of collection to fetch
        version: String,
    },

    /// Assemble a book
    #[command(alias = "a")]
    Assemble { collid: String },

    /// Bake a book
    #[command(alias = "b")]
    Bake {
        collid: String,
        /// Path to recipe file
        recipe: PathBuf,
        /// Path to style file
        style: PathBuf,
    },

    /// Mathify a book
    #[command(alias = "m")]
    Mathify { collid: String },

    /// Build a pdf from a book
    #[command(alias = "p")]
    BuildPdf { collid: String },

    /// Build metadata files from an assembled book
    #[command(alias = "am")]
    AssembleMeta { collid: String },

    /// Build metadata files from a baked book
    #[command(alias = "bm")]
    BakeMeta { collid: String },

    /// Disassemble a baked book
    #[command(alias = "d")]
    Disassemble { collid: String },

    /// Build metadata from a disassembled book
    #[command(alias = "j")]
    Jsonify { collid: String },
}

impl StageCommand {
    pub fn to_stage(&self) -> LocalStage {
        match self.clone() {
            StageCommand::Fetch {
                server,
                collid,
                version,
            } => LocalStage::Fetch {
                server,
                collection_id: collid,
                version,
            },
            StageCommand::Assemble { collid } => LocalStage::Assemble { collection_id: collid },
            StageCommand::Bake { collid, recipe, style } => LocalStage::Bake {
                collection_id: collid,
                recipe,
                style,
            },
            StageCommand::Mathify { collid } => LocalStage::Mathify { collection_id: collid },
            StageCommand::BuildPdf { collid } => LocalStage::BuildPdf { collection_id: collid },
            StageCommand::AssembleMeta { collid } => LocalStage::AssembleMeta { collection_id: collid },
            StageCommand::BakeMeta { collid } => LocalStage::BakeMeta { collection_id: collid },
            StageCommand::Disassemble { collid } => LocalStage::Disassemble { collection_id: collid },
            StageCommand::Jsonify { collid } => LocalStage::Jsonify { collection_id: collid },
        }
    }
}

/// Print a task definition as YAML
#[derive(Debug, Args, Clone)]
pub struct TaskCommand {
    /// Task name, e.g. bake-book
    pub name: String,

    /// JSON task arguments
    #[arg(long)]
    pub taskargs: Option<String>,
}

/// Print a pipeline plan as YAML
#[derive(Debug, Args, Clone)]
pub struct PipelineCommand {
    /// Pipeline variant
    pub kind: PipelineKind,

    /// Path to environment YAML file
    pub env: PathBuf,

    /// Environment overrides (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}


/// Check a queued book entry and describe it
#[derive(Debug, Args, Clone)]
pub struct EntryCommand {
    /// Path to a JSON queue entry
    pub file: PathBuf,
}
