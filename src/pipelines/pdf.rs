//! Request-driven PDF pipeline
//!
//! Progress is reported back to the request queue through `put` steps on
//! the `output-producer` resource.

use super::cnx_recipes;
use crate::core::environment::PipelineEnvironment;
use crate::core::plan::{Job, PipelinePlan, PlanError, Resource, ResourceType, Step};
use crate::core::task::{ParamValue, Params};
use crate::tasks::artifacts::{CNX_RECIPES, OUTPUT_PRODUCER};
use crate::tasks::{book, feed, TaskArgs};

const S3: &str = "s3";

/// Job status ids understood by the request backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued = 1,
    Assigned = 2,
    Processing = 3,
    Failed = 4,
    Succeeded = 5,
}

impl JobStatus {
    pub fn id(self) -> i64 {
        self as i64
    }
}

fn report(status: JobStatus, extras: &[(&str, &str)]) -> Step {
    let mut params = Params::new();
    params.insert("id".to_string(), ParamValue::from("output-producer/id"));
    params.insert("status_id".to_string(), ParamValue::from(status.id()));
    for (key, value) in extras {
        params.insert(key.to_string(), ParamValue::from(*value));
    }
    Step::put(OUTPUT_PRODUCER, params)
}

pub fn assemble(env: &PipelineEnvironment) -> Result<PipelinePlan, PlanError> {
    let api_root = env.required("COPS_TARGET")?;
    let bucket = env.required("S3_BUCKET")?;
    let access_key_id = env.secret_or_local("S3_ACCESS_KEY_ID", "aws-sandbox-secret-key-id")?;
    let secret_access_key =
        env.secret_or_local("S3_SECRET_ACCESS_KEY", "aws-sandbox-secret-access-key")?;

    let resource_types = vec![ResourceType {
        name: OUTPUT_PRODUCER.to_string(),
        kind: "docker-image".to_string(),
        source: [
            ("repository".to_string(), ParamValue::from("openstax/output-producer-resource")),
            ("tag".to_string(), ParamValue::from("1.1.1")),
        ]
        .into_iter()
        .collect(),
    }];

    let resources = vec![
        cnx_recipes(),
        Resource::new(OUTPUT_PRODUCER, OUTPUT_PRODUCER)
            .with_source("api_root", api_root.as_str())
            .with_source("status_id", JobStatus::Queued.id()),
        Resource::new(S3, "s3")
            .with_source("bucket", bucket.as_str())
            .with_source("access_key_id", access_key_id.as_str())
            .with_source("secret_access_key", secret_access_key.as_str())
            .with_source("skip_download", true),
    ];

    let args = TaskArgs::default();
    let mut upload = Params::new();
    upload.insert("file".to_string(), ParamValue::from("artifacts/*.pdf"));
    upload.insert("acl".to_string(), ParamValue::from("public-read"));
    upload.insert("content_type".to_string(), ParamValue::from("application/pdf"));

    let plan = vec![
        Step::trigger_every(OUTPUT_PRODUCER),
        report(JobStatus::Assigned, &[]),
        Step::get(CNX_RECIPES),
        Step::task(&feed::look_up_book(&args)),
        report(JobStatus::Processing, &[]),
        Step::task(&book::fetch(&args)),
        Step::task(&book::assemble(&args)),
        Step::task(&book::bake(&args)),
        Step::task(&book::mathify(&args)),
        Step::task(&book::build_pdf(&TaskArgs::default().with_bucket_name(&bucket))),
        Step::put(S3, upload),
    ];

    let job = Job::new("bakery", plan)
        .on_success(report(JobStatus::Succeeded, &[("pdf_url", "artifacts/pdf_url")]))
        .on_failure(report(JobStatus::Failed, &[]))
        .on_abort(report(JobStatus::Failed, &[]));

    Ok(PipelinePlan {
        resource_types,
        resources,
        jobs: vec![job],
    })
}
