//! Task descriptor builders, one per pipeline stage
//!
//! Every builder takes the caller's [`TaskArgs`] and returns an immutable
//! [`TaskDescriptor`]. Builders never validate argument values: a missing
//! value becomes a null parameter and the stage's executable body decides
//! what to do with it.

pub mod artifacts;
pub mod book;
pub mod feed;
pub mod group;
pub mod validate;

use crate::core::image::{resolve, ImageCoordinates, ImageSource};
use crate::core::task::TaskDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while selecting or building a task
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("unknown task '{0}'")]
    UnknownTask(String),

    #[error("invalid task arguments: {0}")]
    InvalidArgs(#[from] serde_json::Error),

    #[error("task '{task}' needs '{arg}' to name one of its inputs")]
    MissingArtifactName { task: String, arg: String },
}

/// Stage-specific arguments, as passed with `--taskargs`.
///
/// Keys a stage does not recognize are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageCoordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_access_key_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_secret_access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_file_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioned_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_secret_creds: Option<String>,

    /// Validation: artifact holding the files to check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_source: Option<String>,

    /// Validation: glob below the input artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_names: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_source: Option<String>,
}

impl TaskArgs {
    pub fn from_json(json: &str) -> Result<Self, TaskError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TaskError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn with_image(mut self, image: ImageCoordinates) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_bucket_name(mut self, bucket: &str) -> Self {
        self.bucket_name = Some(bucket.to_string());
        self
    }

    pub fn with_aws_credentials(mut self, key_id: &str, secret: &str) -> Self {
        self.aws_access_key_id = Some(key_id.to_string());
        self.aws_secret_access_key = Some(secret.to_string());
        self
    }

    pub fn with_versioned_file(mut self, file: &str) -> Self {
        self.versioned_file = Some(file.to_string());
        self
    }
}

/// Resolve a stage's default image against the caller's overrides
pub(crate) fn image_source(default: ImageCoordinates, args: &TaskArgs) -> ImageSource {
    match &args.image {
        Some(overrides) => ImageSource::from(&resolve(&default, overrides)),
        None => ImageSource::from(&default),
    }
}

pub(crate) const BAKERY_SCRIPTS: &str = "openstax/cops-bakery-scripts";
pub(crate) const NEBUCHADNEZZAR: &str = "openstax/nebuchadnezzar";

/// Every task the builder vocabulary knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    FetchBook,
    AssembleBook,
    AssembleBookMetadata,
    BakeBook,
    BakeBookMetadata,
    MathifyBook,
    BuildPdf,
    DisassembleBook,
    JsonifyBook,
    UploadBook,
    LookUpFeed,
    LookUpBook,
    CheckFeed,
    DequeueBook,
    ValidateXhtml,
    FetchBookGroup,
    AssembleBookGroup,
    BakeBookMetadataGroup,
    ChecksumSingle,
    PatchDisassembledLinksSingle,
    JsonifySingle,
}

impl TaskKind {
    pub const ALL: [TaskKind; 21] = [
        TaskKind::FetchBook,
        TaskKind::AssembleBook,
        TaskKind::AssembleBookMetadata,
        TaskKind::BakeBook,
        TaskKind::BakeBookMetadata,
        TaskKind::MathifyBook,
        TaskKind::BuildPdf,
        TaskKind::DisassembleBook,
        TaskKind::JsonifyBook,
        TaskKind::UploadBook,
        TaskKind::LookUpFeed,
        TaskKind::LookUpBook,
        TaskKind::CheckFeed,
        TaskKind::DequeueBook,
        TaskKind::ValidateXhtml,
        TaskKind::FetchBookGroup,
        TaskKind::AssembleBookGroup,
        TaskKind::BakeBookMetadataGroup,
        TaskKind::ChecksumSingle,
        TaskKind::PatchDisassembledLinksSingle,
        TaskKind::JsonifySingle,
    ];

    /// Name used on the command line and by the external build tool
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::FetchBook => "fetch-book",
            TaskKind::AssembleBook => "assemble-book",
            TaskKind::AssembleBookMetadata => "assemble-book-metadata",
            TaskKind::BakeBook => "bake-book",
            TaskKind::BakeBookMetadata => "bake-book-metadata",
            TaskKind::MathifyBook => "mathify-book",
            TaskKind::BuildPdf => "build-pdf",
            TaskKind::DisassembleBook => "disassemble-book",
            TaskKind::JsonifyBook => "jsonify-book",
            TaskKind::UploadBook => "upload-book",
            TaskKind::LookUpFeed => "look-up-feed",
            TaskKind::LookUpBook => "look-up-book",
            TaskKind::CheckFeed => "check-feed",
            TaskKind::DequeueBook => "dequeue-book",
            TaskKind::ValidateXhtml => "validate-xhtml",
            TaskKind::FetchBookGroup => "fetch-book-group",
            TaskKind::AssembleBookGroup => "assemble-book-group",
            TaskKind::BakeBookMetadataGroup => "bake-book-metadata-group",
            TaskKind::ChecksumSingle => "checksum-single",
            TaskKind::PatchDisassembledLinksSingle => "patch-disassembled-links-single",
            TaskKind::JsonifySingle => "jsonify-single",
        }
    }

    pub fn build(&self, args: &TaskArgs) -> Result<TaskDescriptor, TaskError> {
        let task = match self {
            TaskKind::FetchBook => book::fetch(args),
            TaskKind::AssembleBook => book::assemble(args),
            TaskKind::AssembleBookMetadata => book::assemble_metadata(args),
            TaskKind::BakeBook => book::bake(args),
            TaskKind::BakeBookMetadata => book::bake_metadata(args),
            TaskKind::MathifyBook => book::mathify(args),
            TaskKind::BuildPdf => book::build_pdf(args),
            TaskKind::DisassembleBook => book::disassemble(args),
            TaskKind::JsonifyBook => book::jsonify(args),
            TaskKind::UploadBook => book::upload(args),
            TaskKind::LookUpFeed => feed::look_up_feed(args),
            TaskKind::LookUpBook => feed::look_up_book(args),
            TaskKind::CheckFeed => feed::check_feed(args),
            TaskKind::DequeueBook => feed::dequeue_book(args),
            TaskKind::ValidateXhtml => return validate::validate_xhtml(args),
            TaskKind::FetchBookGroup => group::fetch(args),
            TaskKind::AssembleBookGroup => group::assemble(args),
            TaskKind::BakeBookMetadataGroup => group::bake_metadata(args),
            TaskKind::ChecksumSingle => group::checksum_single(args),
            TaskKind::PatchDisassembledLinksSingle => group::patch_disassembled_links_single(args),
            TaskKind::JsonifySingle => group::jsonify_single(args),
        };
        Ok(task)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskKind {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .iter()
            .find(|kind| kind.name() == s)
            .copied()
            .ok_or_else(|| TaskError::UnknownTask(s.to_string()))
    }
}

/// Build a task by name from an optional `--taskargs` JSON document
pub fn build_task(name: &str, taskargs: Option<&str>) -> Result<TaskDescriptor, TaskError> {
    let kind: TaskKind = name.parse()?;
    let args = match taskargs {
        Some(json) => TaskArgs::from_json(json)?,
        None => TaskArgs::default(),
    };
    kind.build(&args)
}
