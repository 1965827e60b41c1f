//! Container image coordinates and their resolution into task image sources

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while selecting or pushing a task image
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("an image name and a tag override are mutually exclusive, supply only one")]
    ConflictingSelectors,

    #[error("specified image {image} does not have prefix '{prefix}'. Not safe to automatically push!")]
    MissingLocalPrefix { image: String, prefix: String },
}

/// Registry coordinates of a task image.
///
/// Every field is optional so the same type describes both a stage's default
/// image and a caller's partial override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCoordinates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Registry host; `None` means the CI system's default registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ImageCoordinates {
    /// Default coordinates with a pinned tag
    pub fn tagged(name: &str, tag: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            tag: Some(tag.to_string()),
            ..Self::default()
        }
    }

    /// Default coordinates that leave the tag to the registry
    pub fn untagged(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Override carrying only a tag
    pub fn tag_only(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Merge `overrides` onto `default` field by field.
///
/// A field present in `overrides` always wins; an absent one falls through to
/// `default`. The merge is purely structural and never touches the network.
pub fn resolve(default: &ImageCoordinates, overrides: &ImageCoordinates) -> ImageCoordinates {
    fn pick(over: &Option<String>, base: &Option<String>) -> Option<String> {
        over.as_ref().or(base.as_ref()).cloned()
    }

    ImageCoordinates {
        name: pick(&overrides.name, &default.name),
        tag: pick(&overrides.tag, &default.tag),
        registry: pick(&overrides.registry, &default.registry),
        username: pick(&overrides.username, &default.username),
        password: pick(&overrides.password, &default.password),
    }
}

/// `image_resource.source` block of a task definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    pub repository: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insecure_registries: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl From<&ImageCoordinates> for ImageSource {
    fn from(coords: &ImageCoordinates) -> Self {
        let name = coords.name.clone().unwrap_or_default();
        let (repository, insecure_registries) = match &coords.registry {
            Some(registry) => (format!("{}/{}", registry, name), vec![registry.clone()]),
            None => (name, Vec::new()),
        };

        ImageSource {
            repository,
            tag: coords.tag.clone(),
            insecure_registries,
            username: coords.username.clone(),
            password: coords.password.clone(),
        }
    }
}

/// The throwaway registry that runs next to the local CI instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRegistry {
    /// Prefix images carry on the host side, e.g. `localhost.localdomain:5000`
    pub host_prefix: String,

    /// Address the CI workers use to reach the same registry
    pub cluster_address: String,
}

impl Default for LocalRegistry {
    fn default() -> Self {
        Self {
            host_prefix: "localhost.localdomain:5000".to_string(),
            cluster_address: "registry:5000".to_string(),
        }
    }
}

impl LocalRegistry {
    /// Strip the host prefix; `None` when the reference does not carry it
    pub fn strip<'a>(&self, reference: &'a str) -> Option<&'a str> {
        reference
            .strip_prefix(self.host_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }

    /// Coordinates a task should use to pull a locally pushed image
    pub fn coordinates(&self, reference: &str) -> ImageCoordinates {
        let stripped = self.strip(reference).unwrap_or(reference);
        let (name, tag) = match stripped.rfind(':') {
            Some(idx) => (&stripped[..idx], &stripped[idx + 1..]),
            None => (stripped, "latest"),
        };

        ImageCoordinates {
            name: Some(name.to_string()),
            tag: Some(tag.to_string()),
            registry: Some(self.cluster_address.clone()),
            ..ImageCoordinates::default()
        }
    }
}

/// Caller's choice of task image for a local run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSelection {
    /// A locally built image, pushed to the throwaway registry before running
    Local(String),
    /// A different tag of each stage's default remote image
    Tag(String),
}

impl ImageSelection {
    /// Build a selection from the two mutually exclusive CLI selectors
    pub fn from_args(image: Option<&str>, tag: Option<&str>) -> Result<Option<Self>, ImageError> {
        match (image, tag) {
            (Some(_), Some(_)) => Err(ImageError::ConflictingSelectors),
            (Some(image), None) => Ok(Some(ImageSelection::Local(image.to_string()))),
            (None, Some(tag)) => Ok(Some(ImageSelection::Tag(tag.to_string()))),
            (None, None) => Ok(None),
        }
    }

    /// Task-image override for this selection
    pub fn overrides(&self, registry: &LocalRegistry) -> ImageCoordinates {
        match self {
            ImageSelection::Local(reference) => registry.coordinates(reference),
            ImageSelection::Tag(tag) => ImageCoordinates::tag_only(tag),
        }
    }

    /// Image reference that has to be pushed before the stage runs
    pub fn push_reference(&self) -> Option<&str> {
        match self {
            ImageSelection::Local(reference) => Some(reference),
            ImageSelection::Tag(_) => None,
        }
    }
}
