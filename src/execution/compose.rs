//! Infrastructure manifest for the disposable local CI
//!
//! A docker-compose document with the control plane, its database and the
//! throwaway image registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureManifest {
    pub version: String,
    pub services: BTreeMap<String, Service>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub image: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub privileged: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
}

impl Service {
    fn new(image: &str) -> Self {
        Self {
            image: image.to_string(),
            ..Self::default()
        }
    }
}

const DATABASE: &str = "concourse-db";
const CONTROL_PLANE: &str = "concourse";
const REGISTRY: &str = "registry";

impl InfrastructureManifest {
    /// Database, control plane and registry on their fixed local ports
    pub fn local(control_plane_image: &str) -> Self {
        let database = Service {
            environment: env(&[
                "POSTGRES_DB=concourse",
                "POSTGRES_PASSWORD=concourse_pass",
                "POSTGRES_USER=concourse_user",
                "PGDATA=/database",
            ]),
            ..Service::new("postgres")
        };

        let control_plane = Service {
            command: Some("quickstart".to_string()),
            privileged: true,
            depends_on: vec![DATABASE.to_string()],
            ports: vec!["8080:8080".to_string()],
            environment: env(&[
                "CONCOURSE_POSTGRES_HOST=concourse-db",
                "CONCOURSE_POSTGRES_USER=concourse_user",
                "CONCOURSE_POSTGRES_PASSWORD=concourse_pass",
                "CONCOURSE_POSTGRES_DATABASE=concourse",
                "CONCOURSE_EXTERNAL_URL",
                "CONCOURSE_ADD_LOCAL_USER=admin:admin",
                "CONCOURSE_MAIN_TEAM_LOCAL_USER=admin",
            ]),
            ..Service::new(control_plane_image)
        };

        let registry = Service {
            ports: vec!["5000:5000".to_string()],
            restart: Some("always".to_string()),
            ..Service::new("registry:2")
        };

        let services = [
            (DATABASE.to_string(), database),
            (CONTROL_PLANE.to_string(), control_plane),
            (REGISTRY.to_string(), registry),
        ]
        .into_iter()
        .collect();

        Self {
            version: "3".to_string(),
            services,
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Write the manifest to a temporary file owned by the caller
    pub fn materialize(&self) -> std::io::Result<NamedTempFile> {
        self.materialize_in(&std::env::temp_dir())
    }

    pub fn materialize_in(&self, dir: &Path) -> std::io::Result<NamedTempFile> {
        let yaml = self
            .to_yaml()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = tempfile::Builder::new()
            .prefix("bakery-compose-")
            .suffix(".yml")
            .tempfile_in(dir)?;
        file.write_all(yaml.as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}

fn env(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|entry| entry.to_string()).collect()
}
