//! Pipeline plan domain model: resources, jobs and their step sequences

use crate::core::task::{ParamValue, Params, TaskDefinition, TaskDescriptor};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised while assembling or checking a pipeline plan
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("job '{job}': task '{task}' consumes '{artifact}' but no earlier step provides it")]
    DanglingInput { job: String, task: String, artifact: String },

    #[error("job '{job}': artifact '{artifact}' is produced more than once (again by task '{task}')")]
    DuplicateArtifact { job: String, task: String, artifact: String },

    #[error("job '{job}' references undeclared resource '{resource}'")]
    UnknownResource { job: String, resource: String },

    #[error("resource '{resource}' has undeclared type '{kind}'")]
    UnknownResourceType { resource: String, kind: String },

    #[error("'{0}' is not a valid resource, job or artifact name")]
    InvalidName(String),

    #[error("environment value {0} is required for a local deployment")]
    MissingValue(String),

    #[error("unknown pipeline '{0}'")]
    UnknownPipeline(String),
}

/// Resource types every CI installation ships with
const BUILTIN_RESOURCE_TYPES: &[&str] = &["git", "s3", "time", "docker-image", "registry-image"];

const NAME_PATTERN: &str = r"^[a-z][a-z0-9\-_.]*$";

fn name_pattern() -> Option<&'static Regex> {
    static NAME: OnceLock<Option<Regex>> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(NAME_PATTERN).ok()).as_ref()
}

/// Whether `name` can be used for a resource, job or artifact
pub fn valid_name(name: &str) -> bool {
    name_pattern().is_some_and(|pattern| pattern.is_match(name))
}

/// Custom resource-type declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: Params,
}

/// Named external dependency: feed, queue, repository, timer, bucket...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: Params,
}

impl Resource {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            source: Params::new(),
        }
    }

    pub fn with_source(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.source.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetStep {
    pub get: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub trigger: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutStep {
    pub put: String,

    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
}

/// One entry of a job's plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Get(GetStep),
    Put(PutStep),
    Task(TaskDefinition),
}

impl Step {
    pub fn get(resource: &str) -> Self {
        Step::Get(GetStep {
            get: resource.to_string(),
            trigger: false,
            version: None,
        })
    }

    /// Get that triggers the job on every new version of the resource
    pub fn trigger_every(resource: &str) -> Self {
        Step::Get(GetStep {
            get: resource.to_string(),
            trigger: true,
            version: Some("every".to_string()),
        })
    }

    pub fn put(resource: &str, params: Params) -> Self {
        Step::Put(PutStep {
            put: resource.to_string(),
            params,
        })
    }

    pub fn task(descriptor: &TaskDescriptor) -> Self {
        Step::Task(descriptor.to_definition())
    }

    /// Resource a get or put step refers to
    fn resource(&self) -> Option<&str> {
        match self {
            Step::Get(get) => Some(&get.get),
            Step::Put(put) => Some(&put.put),
            Step::Task(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub plan: Vec<Step>,

    /// Bound on concurrent builds of this job across trigger events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<Box<Step>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<Box<Step>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_abort: Option<Box<Step>>,
}

impl Job {
    pub fn new(name: &str, plan: Vec<Step>) -> Self {
        Self {
            name: name.to_string(),
            plan,
            max_in_flight: None,
            on_success: None,
            on_failure: None,
            on_abort: None,
        }
    }

    pub fn max_in_flight(mut self, limit: u32) -> Self {
        self.max_in_flight = Some(limit);
        self
    }

    pub fn on_success(mut self, step: Step) -> Self {
        self.on_success = Some(Box::new(step));
        self
    }

    pub fn on_failure(mut self, step: Step) -> Self {
        self.on_failure = Some(Box::new(step));
        self
    }

    pub fn on_abort(mut self, step: Step) -> Self {
        self.on_abort = Some(Box::new(step));
        self
    }

    fn callbacks(&self) -> impl Iterator<Item = &Step> {
        [&self.on_success, &self.on_failure, &self.on_abort]
            .into_iter()
            .filter_map(|step| step.as_deref())
    }
}

/// Ordered job list plus the resources the jobs share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinePlan {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_types: Vec<ResourceType>,
    pub resources: Vec<Resource>,
    pub jobs: Vec<Job>,
}

impl PipelinePlan {
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.name == name)
    }

    /// Check names, resource references and artifact wiring.
    ///
    /// Within a job every task input must be provided by exactly one earlier
    /// step: a `get` of that name or a prior task output. Output names are
    /// unique within the job's artifact namespace.
    pub fn check_artifact_wiring(&self) -> Result<(), PlanError> {
        let declared_types: HashSet<&str> = BUILTIN_RESOURCE_TYPES
            .iter()
            .copied()
            .chain(self.resource_types.iter().map(|t| t.name.as_str()))
            .collect();

        for resource in &self.resources {
            if !valid_name(&resource.name) {
                return Err(PlanError::InvalidName(resource.name.clone()));
            }
            if !declared_types.contains(resource.kind.as_str()) {
                return Err(PlanError::UnknownResourceType {
                    resource: resource.name.clone(),
                    kind: resource.kind.clone(),
                });
            }
        }

        let resources: HashSet<&str> = self.resources.iter().map(|r| r.name.as_str()).collect();

        for job in &self.jobs {
            if !valid_name(&job.name) {
                return Err(PlanError::InvalidName(job.name.clone()));
            }

            for step in job.plan.iter().chain(job.callbacks()) {
                if let Some(resource) = step.resource() {
                    if !resources.contains(resource) {
                        return Err(PlanError::UnknownResource {
                            job: job.name.clone(),
                            resource: resource.to_string(),
                        });
                    }
                }
            }

            let mut available: HashSet<&str> = HashSet::new();
            for step in &job.plan {
                match step {
                    Step::Get(get) => {
                        if !available.insert(&get.get) {
                            return Err(PlanError::DuplicateArtifact {
                                job: job.name.clone(),
                                task: format!("get {}", get.get),
                                artifact: get.get.clone(),
                            });
                        }
                    }
                    Step::Put(_) => {}
                    Step::Task(task) => {
                        for input in task.input_names() {
                            if !available.contains(input) {
                                return Err(PlanError::DanglingInput {
                                    job: job.name.clone(),
                                    task: task.task.clone(),
                                    artifact: input.to_string(),
                                });
                            }
                        }
                        for output in task.output_names() {
                            if !valid_name(output) {
                                return Err(PlanError::InvalidName(output.to_string()));
                            }
                            if !available.insert(output) {
                                return Err(PlanError::DuplicateArtifact {
                                    job: job.name.clone(),
                                    task: task.task.clone(),
                                    artifact: output.to_string(),
                                });
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
