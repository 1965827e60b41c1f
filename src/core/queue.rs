//! Schema of a queued book entry
//!
//! Provenance is an explicit tag so the dequeue task never has to guess
//! whether an entry came from the archive from the absence of a field.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field carrying the provenance tag
pub const PROVENANCE_FIELD: &str = "source";

/// Tag value of archive-sourced entries
pub const ARCHIVE_PROVENANCE: &str = "archive";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum QueueEntry {
    Archive {
        collection_id: String,
        server: String,
        style: String,
        version: String,
        #[serde(default)]
        uuid: Option<Uuid>,
    },
    Git {
        repo: String,
        slug: String,
        style: String,
        version: String,
        #[serde(default)]
        uuid: Option<Uuid>,
    },
}

impl QueueEntry {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, QueueEntry::Archive { .. })
    }

    pub fn style(&self) -> &str {
        match self {
            QueueEntry::Archive { style, .. } | QueueEntry::Git { style, .. } => style,
        }
    }

    /// Collection id for archive entries, slug for git entries
    pub fn book(&self) -> &str {
        match self {
            QueueEntry::Archive { collection_id, .. } => collection_id,
            QueueEntry::Git { slug, .. } => slug,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            QueueEntry::Archive { version, .. } | QueueEntry::Git { version, .. } => version,
        }
    }

    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            QueueEntry::Archive { uuid, .. } | QueueEntry::Git { uuid, .. } => *uuid,
        }
    }

    /// One-line description: provenance, book, version, style and uuid if any
    pub fn summary(&self) -> String {
        let (provenance, origin) = match self {
            QueueEntry::Archive { server, .. } => (ARCHIVE_PROVENANCE, server.as_str()),
            QueueEntry::Git { repo, .. } => ("git", repo.as_str()),
        };
        let mut line = format!(
            "{} {}@{} from {} (style {})",
            provenance,
            self.book(),
            self.version(),
            origin,
            self.style()
        );
        if let Some(uuid) = self.uuid() {
            line.push_str(&format!(" uuid {}", uuid));
        }
        line
    }
}
