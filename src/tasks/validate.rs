//! XHTML validation stage

use super::artifacts::{BOOK, COMMON_LOG};
use super::{image_source, TaskArgs, TaskError};
use crate::core::image::ImageCoordinates;
use crate::core::task::{ExecutableBody, TaskDescriptor};

const VALIDATE_XHTML_SCRIPT: &str = include_str!("scripts/validate_xhtml.sh");

/// Content source assumed when the caller does not name one
pub const DEFAULT_CONTENT_SOURCE: &str = "archive";

/// Validate the files matched by `inputPath` below the `inputSource` artifact.
///
/// `inputSource` becomes an input name, so unlike other arguments it cannot
/// be passed through as a null parameter.
pub fn validate_xhtml(args: &TaskArgs) -> Result<TaskDescriptor, TaskError> {
    let input_source = args
        .input_source
        .as_deref()
        .ok_or_else(|| TaskError::MissingArtifactName {
            task: "validate-xhtml".to_string(),
            arg: "inputSource".to_string(),
        })?;

    let content_source = args
        .content_source
        .clone()
        .unwrap_or_else(|| DEFAULT_CONTENT_SOURCE.to_string());

    Ok(TaskDescriptor::builder(
        "validate xhtml",
        image_source(ImageCoordinates::tagged("openstax/xhtml-validator", "trunk"), args),
    )
    .input(BOOK)
    .input(input_source)
    .output(COMMON_LOG)
    .param("CONTENT_SOURCE", content_source)
    .param("INPUT_SOURCE", input_source)
    .param("INPUT_PATH", args.input_path.clone())
    .param("VALIDATION_NAMES", args.validation_names.as_ref().map(|names| names.join(" ")))
    .body(ExecutableBody::bash(VALIDATE_XHTML_SCRIPT)))
}
