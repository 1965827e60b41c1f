//! Feed-driven distribution pipeline

use super::cnx_recipes;
use crate::core::environment::PipelineEnvironment;
use crate::core::plan::{Job, PipelinePlan, PlanError, Resource, Step};
use crate::tasks::artifacts::{CNX_RECIPES, S3_FEED};
use crate::tasks::{book, feed, TaskArgs};

pub fn assemble(env: &PipelineEnvironment) -> Result<PipelinePlan, PlanError> {
    let bucket = env.secret_or_local("S3_DIST_BUCKET", "aws-s3-distribution-bucket")?;
    let versioned_file = env.secret_or_local("VERSIONED_FILE", "versioned-feed-file")?;
    let access_key_id = env.secret_or_local("S3_ACCESS_KEY_ID", "aws-sandbox-secret-key-id")?;
    let secret_access_key =
        env.secret_or_local("S3_SECRET_ACCESS_KEY", "aws-sandbox-secret-access-key")?;

    let resources = vec![
        cnx_recipes(),
        Resource::new(S3_FEED, "s3")
            .with_source("bucket", bucket.as_str())
            .with_source("versioned_file", versioned_file.as_str())
            .with_source("access_key_id", access_key_id.as_str())
            .with_source("secret_access_key", secret_access_key.as_str()),
    ];

    let args = TaskArgs::default();
    let feed_args = TaskArgs::default().with_versioned_file(&versioned_file);
    let upload_args = TaskArgs::default()
        .with_bucket_name(&bucket)
        .with_aws_credentials(&access_key_id, &secret_access_key);

    let plan = vec![
        Step::trigger_every(S3_FEED),
        Step::get(CNX_RECIPES),
        Step::task(&feed::look_up_feed(&feed_args)),
        Step::task(&book::fetch(&args)),
        Step::task(&book::assemble(&args)),
        Step::task(&book::assemble_metadata(&args)),
        Step::task(&book::bake(&args)),
        Step::task(&book::bake_metadata(&args)),
        Step::task(&book::disassemble(&args)),
        Step::task(&book::jsonify(&args)),
        Step::task(&book::upload(&upload_args)),
    ];

    Ok(PipelinePlan {
        resource_types: Vec::new(),
        resources,
        jobs: vec![Job::new("bakery", plan).max_in_flight(1)],
    })
}
