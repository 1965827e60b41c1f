//! Stages that turn a trigger resource into a `book` directory

use super::artifacts::*;
use super::{image_source, TaskArgs, BAKERY_SCRIPTS, NEBUCHADNEZZAR};
use crate::core::image::ImageCoordinates;
use crate::core::queue::{ARCHIVE_PROVENANCE, PROVENANCE_FIELD};
use crate::core::task::{ExecutableBody, TaskDescriptor};

const LOOK_UP_FEED_SCRIPT: &str = include_str!("scripts/look_up_feed.sh");
const LOOK_UP_BOOK_SCRIPT: &str = include_str!("scripts/look_up_book.sh");
const CHECK_FEED_SCRIPT: &str = include_str!("scripts/check_feed.sh");
const DEQUEUE_BOOK_SCRIPT: &str = include_str!("scripts/dequeue_book.sh");

/// Read the book coordinates out of the versioned feed file
pub fn look_up_feed(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "look up feed",
        image_source(ImageCoordinates::tagged(BAKERY_SCRIPTS, "master"), args),
    )
    .input(S3_FEED)
    .output(BOOK)
    .param("VERSIONED_FILE", args.versioned_file.clone())
    .body(ExecutableBody::bash(LOOK_UP_FEED_SCRIPT))
}

/// Copy the job fields of a PDF request into `book`
pub fn look_up_book(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "look up book",
        image_source(ImageCoordinates::untagged(NEBUCHADNEZZAR), args),
    )
    .input(OUTPUT_PRODUCER)
    .output(BOOK)
    .body(ExecutableBody::bash(LOOK_UP_BOOK_SCRIPT))
}

/// Pick the first feed entry that has not been marked complete in the bucket
pub fn check_feed(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "check feed",
        image_source(ImageCoordinates::untagged(BAKERY_SCRIPTS), args),
    )
    .output(BOOK)
    .param("AWS_ACCESS_KEY_ID", args.aws_access_key_id.clone())
    .param("AWS_SECRET_ACCESS_KEY", args.aws_secret_access_key.clone())
    .param("BUCKET_NAME", args.bucket_name.clone())
    .param("FEED_FILE_URL", args.feed_file_url.clone())
    .body(ExecutableBody::bash(CHECK_FEED_SCRIPT))
}

/// Pop one queued entry; provenance comes from the entry's tag field
pub fn dequeue_book(args: &TaskArgs) -> TaskDescriptor {
    TaskDescriptor::builder(
        "dequeue book",
        image_source(ImageCoordinates::tagged(BAKERY_SCRIPTS, "trunk"), args),
    )
    .input(S3_QUEUE)
    .output(BOOK)
    .param("QUEUE_FILENAME", args.queue_filename.clone())
    .param("PROVENANCE_FIELD", PROVENANCE_FIELD)
    .param("ARCHIVE_PROVENANCE", ARCHIVE_PROVENANCE)
    .body(ExecutableBody::bash(DEQUEUE_BOOK_SCRIPT))
}
