//! Artifact names shared between stages.
//!
//! Stage N's output name is stage N+1's input name; the pairs are fixed here
//! rather than derived from a dependency graph.

pub const BOOK: &str = "book";
pub const FETCHED_BOOK: &str = "fetched-book";
pub const ASSEMBLED_BOOK: &str = "assembled-book";
pub const ASSEMBLED_BOOK_METADATA: &str = "assembled-book-metadata";
pub const BAKED_BOOK: &str = "baked-book";
pub const BAKED_BOOK_METADATA: &str = "baked-book-metadata";
pub const MATHIFIED_BOOK: &str = "mathified-book";
pub const ARTIFACTS: &str = "artifacts";
pub const DISASSEMBLED_BOOK: &str = "disassembled-book";
pub const JSONIFIED_BOOK: &str = "jsonified-book";
pub const UPLOAD_BOOK: &str = "upload-book";
pub const COMMON_LOG: &str = "common-log";

// Resources whose fetched contents are handed to tasks under the same name
pub const CNX_RECIPES: &str = "cnx-recipes";
pub const S3_FEED: &str = "s3-feed";
pub const S3_QUEUE: &str = "s3-queue";
pub const OUTPUT_PRODUCER: &str = "output-producer";

// Git-sourced book groups
pub const FETCHED_BOOK_GROUP: &str = "fetched-book-group";
pub const FETCHED_BOOK_GROUP_RESOURCES: &str = "fetched-book-group-resources";
pub const ASSEMBLED_BOOK_GROUP: &str = "assembled-book-group";
pub const MODULE_SYMLINKS: &str = "module-symlinks";
pub const BAKED_BOOK_GROUP: &str = "baked-book-group";
pub const ASSEMBLED_BOOK_METADATA_GROUP: &str = "assembled-book-metadata-group";
pub const BAKED_BOOK_METADATA_GROUP: &str = "baked-book-metadata-group";
pub const LINKED_SINGLE: &str = "linked-single";
pub const CHECKSUM_RESOURCES: &str = "checksum-resources";
pub const RESOURCE_LINKED_SINGLE: &str = "resource-linked-single";
pub const DISASSEMBLED_SINGLE: &str = "disassembled-single";
pub const DISASSEMBLED_LINKED_SINGLE: &str = "disassembled-linked-single";
pub const JSONIFIED_SINGLE: &str = "jsonified-single";
