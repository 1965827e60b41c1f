//! Stages of the single-book path: fetch through upload

use super::artifacts::*;
use super::{image_source, TaskArgs, BAKERY_SCRIPTS, NEBUCHADNEZZAR};
use crate::core::image::ImageCoordinates;
use crate::core::task::{ExecutableBody, TaskDescriptor};

const FETCH_BOOK_SCRIPT: &str = include_str!("scripts/fetch_book.sh");
const ASSEMBLE_BOOK_SCRIPT: &str = include_str!("scripts/assemble_book.sh");
const ASSEMBLE_BOOK_METADATA_SCRIPT: &str = include_str!("scripts/assemble_book_metadata.sh");
const BAKE_BOOK_SCRIPT: &str = include_str!("scripts/bake_book.sh");
const BAKE_BOOK_METADATA_SCRIPT: &str = include_str!("scripts/bake_book_metadata.sh");
const MATHIFY_BOOK_SCRIPT: &str = include_str!("scripts/mathify_book.sh");
const BUILD_PDF_SCRIPT: &str = include_str!("scripts/build_pdf.sh");
const DISASSEMBLE_BOOK_SCRIPT: &str = include_str!("scripts/disassemble_book.sh");
const JSONIFY_BOOK_SCRIPT: &str = include_str!("scripts/jsonify_book.sh");
const UPLOAD_BOOK_SCRIPT: &str = include_str!("scripts/upload_book.sh");

pub fn fetch(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "fetch book",
        image_source(ImageCoordinates::tagged(NEBUCHADNEZZAR, "trunk"), args),
    )
    .input(BOOK)
    .output(FETCHED_BOOK)
    .param("COLUMNS", 80_i64)
    .body(ExecutableBody::bash(FETCH_BOOK_SCRIPT))
}

pub fn assemble(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "assemble book",
        image_source(ImageCoordinates::tagged(NEBUCHADNEZZAR, "trunk"), args),
    )
    .input(BOOK)
    .input(FETCHED_BOOK)
    .output(ASSEMBLED_BOOK)
    .body(ExecutableBody::bash(ASSEMBLE_BOOK_SCRIPT))
}

pub fn assemble_metadata(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "assemble book metadata",
        image_source(ImageCoordinates::tagged(BAKERY_SCRIPTS, "trunk"), args),
    )
    .input(BOOK)
    .input(ASSEMBLED_BOOK)
    .output(ASSEMBLED_BOOK_METADATA)
    .body(ExecutableBody::bash(ASSEMBLE_BOOK_METADATA_SCRIPT))
}

pub fn bake(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "bake book",
        image_source(ImageCoordinates::tagged("openstax/recipes", "trunk"), args),
    )
    .input(BOOK)
    .input(ASSEMBLED_BOOK)
    .input(CNX_RECIPES)
    .output(BAKED_BOOK)
    .body(ExecutableBody::bash(BAKE_BOOK_SCRIPT))
}

pub fn bake_metadata(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "bake book metadata",
        image_source(ImageCoordinates::tagged(BAKERY_SCRIPTS, "master"), args),
    )
    .input(BOOK)
    .input(FETCHED_BOOK)
    .input(BAKED_BOOK)
    .input(ASSEMBLED_BOOK_METADATA)
    .output(BAKED_BOOK_METADATA)
    .body(ExecutableBody::bash(BAKE_BOOK_METADATA_SCRIPT))
}

pub fn mathify(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "mathify book",
        image_source(ImageCoordinates::tagged("openstax/mathify", "trunk"), args),
    )
    .input(BOOK)
    .input(BAKED_BOOK)
    .output(MATHIFIED_BOOK)
    .body(ExecutableBody::bash(MATHIFY_BOOK_SCRIPT))
}

/// Render the PDF; `bucketName` only shapes the public URL written next to it
pub fn build_pdf(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "build pdf",
        image_source(ImageCoordinates::tagged("openstax/princexml", "trunk"), args),
    )
    .input(BOOK)
    .input(MATHIFIED_BOOK)
    .output(ARTIFACTS)
    .param("BUCKET_NAME", args.bucket_name.clone())
    .body(ExecutableBody::bash(BUILD_PDF_SCRIPT))
}

pub fn disassemble(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "disassemble book",
        image_source(ImageCoordinates::tagged(BAKERY_SCRIPTS, "trunk"), args),
    )
    .input(BOOK)
    .input(FETCHED_BOOK)
    .input(BAKED_BOOK)
    .input(BAKED_BOOK_METADATA)
    .output(DISASSEMBLED_BOOK)
    .body(ExecutableBody::bash(DISASSEMBLE_BOOK_SCRIPT))
}

pub fn jsonify(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "jsonify book",
        image_source(ImageCoordinates::tagged(BAKERY_SCRIPTS, "trunk"), args),
    )
    .input(BOOK)
    .input(DISASSEMBLED_BOOK)
    .output(JSONIFIED_BOOK)
    .body(ExecutableBody::bash(JSONIFY_BOOK_SCRIPT))
}

pub fn upload(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "upload book",
        image_source(ImageCoordinates::untagged(BAKERY_SCRIPTS), args),
    )
    .input(BOOK)
    .input(JSONIFIED_BOOK)
    .output(UPLOAD_BOOK)
    .param("AWS_ACCESS_KEY_ID", args.aws_access_key_id.clone())
    .param("AWS_SECRET_ACCESS_KEY", args.aws_secret_access_key.clone())
    .param("BUCKET_NAME", args.bucket_name.clone())
    .body(ExecutableBody::bash(UPLOAD_BOOK_SCRIPT))
}
