//! Task descriptor domain model and its task-definition wire form

use crate::core::image::ImageSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameter value handed to a task's executable body as an environment variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(i64),
    Text(String),
    /// A value the caller never supplied; passed through untouched
    Null,
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

/// String-keyed parameter mapping (task params, resource sources, put params)
pub type Params = BTreeMap<String, ParamValue>;

/// Opaque executable payload of a task.
///
/// The body is carried verbatim into the task definition and never parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableBody {
    path: String,
    args: Vec<String>,
}

impl ExecutableBody {
    /// A bash script run with `-cxe`
    pub fn bash(script: &str) -> Self {
        Self {
            path: "/bin/bash".to_string(),
            args: vec!["-cxe".to_string(), script.to_string()],
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// One executable pipeline stage.
///
/// Built once by a stage builder and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDescriptor {
    name: String,
    image: ImageSource,
    inputs: Vec<String>,
    outputs: Vec<String>,
    params: Params,
    body: ExecutableBody,
}

impl TaskDescriptor {
    pub fn builder(name: &str, image: ImageSource) -> TaskDescriptorBuilder {
        TaskDescriptorBuilder {
            name: name.to_string(),
            image,
            inputs: Vec::new(),
            outputs: Vec::new(),
            params: Params::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &ImageSource {
        &self.image
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn body(&self) -> &ExecutableBody {
        &self.body
    }

    /// Wire form consumed by the CI system
    pub fn to_definition(&self) -> TaskDefinition {
        TaskDefinition {
            task: self.name.clone(),
            config: TaskConfig {
                platform: "linux".to_string(),
                image_resource: ImageResource {
                    kind: "docker-image".to_string(),
                    source: self.image.clone(),
                },
                inputs: self.inputs.iter().map(|name| Artifact::new(name)).collect(),
                outputs: self.outputs.iter().map(|name| Artifact::new(name)).collect(),
                params: self.params.clone(),
                run: RunConfig {
                    path: self.body.path.clone(),
                    args: self.body.args.clone(),
                },
            },
        }
    }

    /// Task definition as a YAML document
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.to_definition())
    }
}

/// Accumulates a descriptor's parts; `body` finishes it
#[derive(Debug)]
pub struct TaskDescriptorBuilder {
    name: String,
    image: ImageSource,
    inputs: Vec<String>,
    outputs: Vec<String>,
    params: Params,
}

impl TaskDescriptorBuilder {
    pub fn input(mut self, name: &str) -> Self {
        self.inputs.push(name.to_string());
        self
    }

    pub fn output(mut self, name: &str) -> Self {
        self.outputs.push(name.to_string());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn body(self, body: ExecutableBody) -> TaskDescriptor {
        TaskDescriptor {
            name: self.name,
            image: self.image,
            inputs: self.inputs,
            outputs: self.outputs,
            params: self.params,
            body,
        }
    }
}

/// Task definition document: `task` plus `config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task: String,
    pub config: TaskConfig,
}

impl TaskDefinition {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.config.inputs.iter().map(|a| a.name.as_str())
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.config.outputs.iter().map(|a| a.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub platform: String,
    pub image_resource: ImageResource,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Artifact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Artifact>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: Params,

    pub run: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: ImageSource,
}

/// Named artifact slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
}

impl Artifact {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub path: String,
    pub args: Vec<String>,
}
