//! Deployment environment for pipeline assembly, loaded from YAML

use crate::core::plan::PlanError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Where an assembled pipeline is going to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Raw values from the environment file are written into the plan
    Local,
    /// Secret-store references are written instead of raw values
    Deployed,
}

/// Environment values a pipeline is assembled against.
///
/// Keys follow the environment files of the deployment (`ENV_NAME`,
/// `S3_BUCKET`, `COPS_TARGET`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineEnvironment {
    #[serde(rename = "ENV_NAME")]
    pub env_name: String,

    #[serde(flatten)]
    values: BTreeMap<String, String>,
}

impl PipelineEnvironment {
    pub fn new(env_name: &str) -> Self {
        Self {
            env_name: env_name.to_string(),
            values: BTreeMap::new(),
        }
    }

    /// Load an environment from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse an environment from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let env: PipelineEnvironment = serde_yaml::from_str(yaml)?;
        env.validate()?;
        Ok(env)
    }

    pub fn validate(&self) -> Result<()> {
        if self.env_name.trim().is_empty() {
            anyhow::bail!("ENV_NAME must not be empty");
        }
        Ok(())
    }

    pub fn mode(&self) -> DeploymentMode {
        if self.env_name == "local" {
            DeploymentMode::Local
        } else {
            DeploymentMode::Deployed
        }
    }

    /// Set or replace a value; `ENV_NAME` changes the deployment mode
    pub fn set(&mut self, key: &str, value: &str) {
        if key == "ENV_NAME" {
            self.env_name = value.to_string();
        } else {
            self.values.insert(key.to_string(), value.to_string());
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// A value every deployment mode reads straight from the environment
    pub fn required(&self, key: &str) -> Result<String, PlanError> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| PlanError::MissingValue(key.to_string()))
    }

    /// The raw value of `key` locally, or a `((secret))` reference when deployed.
    ///
    /// Secrets are never resolved here; deployed plans only name them.
    pub fn secret_or_local(&self, key: &str, secret: &str) -> Result<String, PlanError> {
        match self.mode() {
            DeploymentMode::Local => self.required(key),
            DeploymentMode::Deployed => Ok(format!("(({}))", secret)),
        }
    }
}
