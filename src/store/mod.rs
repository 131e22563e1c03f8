//! Artifact store client.
//!
//! The stage talks to the store through the [`ArtifactStore`] trait: resolve
//! an input reference to a local payload file, and ingest a finished draft as
//! a new immutable artifact version. [`FsArtifactStore`] is the filesystem
//! implementation used by the CLI; tests substitute their own.

mod fs;

pub use fs::{ArtifactManifest, FileEntry, FsArtifactStore};

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A new artifact version under construction: metadata plus the payload
/// file(s) to ingest and the lineage to record.
#[derive(Debug, Clone)]
pub struct ArtifactDraft {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
    pub files: Vec<PathBuf>,
    pub inputs: Vec<String>,
    pub run_config: Option<serde_json::Value>,
}

impl ArtifactDraft {
    pub fn new(
        name: impl Into<String>,
        artifact_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            artifact_type: artifact_type.into(),
            description: description.into(),
            files: Vec::new(),
            inputs: Vec::new(),
            run_config: None,
        }
    }

    /// Add a local payload file to ingest.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Record an input reference this artifact was derived from.
    pub fn with_input(mut self, reference: impl Into<String>) -> Self {
        self.inputs.push(reference.into());
        self
    }

    /// Record the run configuration that produced this artifact.
    pub fn with_run_config(mut self, config: serde_json::Value) -> Self {
        self.run_config = Some(config);
        self
    }
}

/// Store-assigned identity of a published artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactId {
    pub name: String,
    pub version: u32,
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:v{}", self.name, self.version)
    }
}

/// The stage's seam to the artifact store.
///
/// Implementations own their retry and caching behavior; the stage treats
/// both operations as fallible black boxes and never retries.
pub trait ArtifactStore {
    /// Resolve an artifact reference (`name`, `name:latest`, or `name:vN`) to
    /// the local path of its payload file.
    fn resolve(&self, reference: &str) -> Result<PathBuf>;

    /// Ingest `draft` as a new version and return its assigned identity.
    /// After this returns the store owns a copy of the payload; the caller's
    /// local file may be deleted.
    fn log_artifact(&self, draft: &ArtifactDraft) -> Result<ArtifactId>;
}

impl<S: ArtifactStore + ?Sized> ArtifactStore for &S {
    fn resolve(&self, reference: &str) -> Result<PathBuf> {
        (**self).resolve(reference)
    }

    fn log_artifact(&self, draft: &ArtifactDraft) -> Result<ArtifactId> {
        (**self).log_artifact(draft)
    }
}

/// File name of a payload path, used when recording manifest entries.
pub(crate) fn payload_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "payload".to_string())
}
