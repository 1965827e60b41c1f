//! Stages for git-sourced book groups and the single books split out of them

use super::artifacts::*;
use super::{image_source, TaskArgs, BAKERY_SCRIPTS, NEBUCHADNEZZAR};
use crate::core::image::ImageCoordinates;
use crate::core::task::{ExecutableBody, TaskDescriptor};

const FETCH_BOOK_GROUP_SCRIPT: &str = include_str!("scripts/fetch_book_group.sh");
const ASSEMBLE_BOOK_GROUP_SCRIPT: &str = include_str!("scripts/assemble_book_group.sh");
const BAKE_BOOK_METADATA_GROUP_SCRIPT: &str = include_str!("scripts/bake_book_metadata_group.sh");
const CHECKSUM_SINGLE_SCRIPT: &str = include_str!("scripts/checksum_single.sh");
const PATCH_DISASSEMBLED_LINKS_SINGLE_SCRIPT: &str =
    include_str!("scripts/patch_disassembled_links_single.sh");
const JSONIFY_SINGLE_SCRIPT: &str = include_str!("scripts/jsonify_single.sh");

const BOOK_SLUGS_URL: &str =
    "https://raw.githubusercontent.com/openstax/content-manager-approved-books/master/book-slugs.json";

fn scripts_image(args: &TaskArgs) -> crate::core::image::ImageSource {
    image_source(ImageCoordinates::tagged(BAKERY_SCRIPTS, "trunk"), args)
}

pub fn fetch(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder("fetch book group", scripts_image(args))
        .input(BOOK)
        .output(FETCHED_BOOK_GROUP)
        .output(FETCHED_BOOK_GROUP_RESOURCES)
        .param("COLUMNS", 80_i64)
        .param("BOOK_INPUT", BOOK)
        .param("GH_SECRET_CREDS", args.github_secret_creds.clone())
        .param("CONTENT_OUTPUT", FETCHED_BOOK_GROUP)
        .param("BOOK_SLUGS_URL", BOOK_SLUGS_URL)
        .param("RESOURCE_OUTPUT", FETCHED_BOOK_GROUP_RESOURCES)
        .body(ExecutableBody::bash(FETCH_BOOK_GROUP_SCRIPT))
}

pub fn assemble(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "assemble book group",
        image_source(ImageCoordinates::tagged(NEBUCHADNEZZAR, "trunk"), args),
    )
    .input(FETCHED_BOOK_GROUP)
    .output(ASSEMBLED_BOOK_GROUP)
    .output(MODULE_SYMLINKS)
    .param("ASSEMBLED_OUTPUT", ASSEMBLED_BOOK_GROUP)
    .param("SYMLINK_OUTPUT", MODULE_SYMLINKS)
    .param("RAW_COLLECTION_DIR", format!("{}/raw", FETCHED_BOOK_GROUP))
    .body(ExecutableBody::bash(ASSEMBLE_BOOK_GROUP_SCRIPT))
}

pub fn bake_metadata(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder("bake book metadata group", scripts_image(args))
        .input(FETCHED_BOOK_GROUP)
        .input(BAKED_BOOK_GROUP)
        .input(ASSEMBLED_BOOK_METADATA_GROUP)
        .output(BAKED_BOOK_METADATA_GROUP)
        .param("BAKED_META_OUTPUT", BAKED_BOOK_METADATA_GROUP)
        .param("BAKED_INPUT", BAKED_BOOK_GROUP)
        .param("FETCHED_INPUT", FETCHED_BOOK_GROUP)
        .param("ASSEMBLED_META_INPUT", ASSEMBLED_BOOK_METADATA_GROUP)
        .body(ExecutableBody::bash(BAKE_BOOK_METADATA_GROUP_SCRIPT))
}

pub fn checksum_single(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder("checksum book", scripts_image(args))
        .input(BOOK)
        .input(FETCHED_BOOK_GROUP)
        .input(MODULE_SYMLINKS)
        .input(LINKED_SINGLE)
        .output(CHECKSUM_RESOURCES)
        .output(RESOURCE_LINKED_SINGLE)
        .param("SYMLINK_INPUT", MODULE_SYMLINKS)
        .param("LINKED_INPUT", LINKED_SINGLE)
        .param("RESOURCES_OUTPUT", CHECKSUM_RESOURCES)
        .param("BOOK_INPUT", BOOK)
        .param("RESOURCES_LINKED_SINGLE_OUTPUT", RESOURCE_LINKED_SINGLE)
        .body(ExecutableBody::bash(CHECKSUM_SINGLE_SCRIPT))
}

pub fn patch_disassembled_links_single(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder("patch disassembled links single", scripts_image(args))
        .input(BOOK)
        .input(DISASSEMBLED_SINGLE)
        .output(DISASSEMBLED_LINKED_SINGLE)
        .param("DISASSEMBLED_INPUT", DISASSEMBLED_SINGLE)
        .param("DISASSEMBLED_LINKED_OUTPUT", DISASSEMBLED_LINKED_SINGLE)
        .param("BOOK_INPUT", BOOK)
        .body(ExecutableBody::bash(PATCH_DISASSEMBLED_LINKS_SINGLE_SCRIPT))
}

pub fn jsonify_single(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder("jsonify single", scripts_image(args))
        .input(BOOK)
        .input(DISASSEMBLED_SINGLE)
        .output(JSONIFIED_SINGLE)
        .param("DISASSEMBLED_INPUT", DISASSEMBLED_SINGLE)
        .param("JSONIFIED_OUTPUT", JSONIFIED_SINGLE)
        .param("BOOK_INPUT", BOOK)
        .body(ExecutableBody::bash(JSONIFY_SINGLE_SCRIPT))
}
