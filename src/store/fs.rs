//! Filesystem-backed artifact store.
//!
//! Layout: `<root>/<name>/v<N>/` holds one immutable artifact version — the
//! payload file(s) plus a `manifest.json` describing them. Version numbers
//! are assigned `max + 1` per artifact name; `latest` resolves to the highest
//! number present.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{ArtifactDraft, ArtifactId, ArtifactStore, payload_file_name};
use crate::error::{CleaningError, Result};

/// Metadata persisted beside every version's payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: String,
    pub version: u32,
    pub artifact_type: String,
    pub description: String,
    pub files: Vec<FileEntry>,
    pub inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_config: Option<serde_json::Value>,
    pub created_at: String,
}

/// One ingested payload file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size_bytes: u64,
    pub sha256: String,
}

const MANIFEST_FILE: &str = "manifest.json";

/// Which version of an artifact a reference selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VersionSelector {
    Latest,
    Exact(u32),
}

/// Filesystem artifact store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open a store at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the manifest of a published version.
    pub fn manifest(&self, id: &ArtifactId) -> Result<ArtifactManifest> {
        let path = self.version_dir(&id.name, id.version).join(MANIFEST_FILE);
        let raw = fs::read_to_string(&path).map_err(|e| CleaningError::Resolution {
            reference: id.to_string(),
            reason: format!("manifest unreadable: {}", e),
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join(dir_name(name))
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{}", version))
    }

    /// Highest version number published under `name`, if any.
    fn latest_version(&self, name: &str) -> Result<Option<u32>> {
        let dir = self.artifact_dir(name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut latest = None;
        for entry in entries {
            let entry = entry?;
            if let Some(version) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.strip_prefix('v'))
                .and_then(|n| n.parse::<u32>().ok())
            {
                latest = latest.max(Some(version));
            }
        }
        Ok(latest)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let (name, selector) = parse_reference(reference)?;

        let version = match selector {
            VersionSelector::Exact(version) => version,
            VersionSelector::Latest => {
                self.latest_version(name)?
                    .ok_or_else(|| CleaningError::Resolution {
                        reference: reference.to_string(),
                        reason: "no such artifact".to_string(),
                    })?
            }
        };

        let id = ArtifactId {
            name: name.to_string(),
            version,
        };
        let manifest = self.manifest(&id).map_err(|_| CleaningError::Resolution {
            reference: reference.to_string(),
            reason: format!("version v{} not found", version),
        })?;

        let entry = manifest
            .files
            .first()
            .ok_or_else(|| CleaningError::Resolution {
                reference: reference.to_string(),
                reason: "artifact version has no payload".to_string(),
            })?;

        let payload = self.version_dir(name, version).join(&entry.name);
        if !payload.exists() {
            return Err(CleaningError::Resolution {
                reference: reference.to_string(),
                reason: format!("payload file {} missing", entry.name),
            });
        }

        debug!("Resolved {} to {}", reference, payload.display());
        Ok(payload)
    }

    fn log_artifact(&self, draft: &ArtifactDraft) -> Result<ArtifactId> {
        if draft.files.is_empty() {
            return Err(CleaningError::Publish {
                name: draft.name.clone(),
                reason: "draft has no payload files".to_string(),
            });
        }

        let publish_err = |reason: String| CleaningError::Publish {
            name: draft.name.clone(),
            reason,
        };

        let version = self.latest_version(&draft.name)?.map_or(1, |v| v + 1);
        let dir = self.version_dir(&draft.name, version);
        fs::create_dir_all(&dir).map_err(|e| publish_err(e.to_string()))?;

        let mut entries = Vec::with_capacity(draft.files.len());
        for path in &draft.files {
            let bytes = fs::read(path)
                .map_err(|e| publish_err(format!("cannot read {}: {}", path.display(), e)))?;

            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            let digest = hex::encode(hasher.finalize());

            let file_name = payload_file_name(path);
            fs::write(dir.join(&file_name), &bytes)
                .map_err(|e| publish_err(format!("cannot store {}: {}", file_name, e)))?;

            entries.push(FileEntry {
                name: file_name,
                size_bytes: bytes.len() as u64,
                sha256: digest,
            });
        }

        let manifest = ArtifactManifest {
            name: draft.name.clone(),
            version,
            artifact_type: draft.artifact_type.clone(),
            description: draft.description.clone(),
            files: entries,
            inputs: draft.inputs.clone(),
            run_config: draft.run_config.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let raw = serde_json::to_string_pretty(&manifest)?;
        fs::write(dir.join(MANIFEST_FILE), raw).map_err(|e| publish_err(e.to_string()))?;

        let id = ArtifactId {
            name: draft.name.clone(),
            version,
        };
        debug!("Logged artifact {}", id);
        Ok(id)
    }
}

/// Directory name for an artifact.
///
/// Artifact names may be file paths (the CLI reuses the output path as the
/// name), so path separators and other unsafe characters are flattened to
/// keep every artifact inside the store root. The manifest records the true
/// name.
fn dir_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Split a reference into its name and version selector.
fn parse_reference(reference: &str) -> Result<(&str, VersionSelector)> {
    let Some((name, selector)) = reference.split_once(':') else {
        return Ok((reference, VersionSelector::Latest));
    };

    if name.is_empty() {
        return Err(CleaningError::Resolution {
            reference: reference.to_string(),
            reason: "empty artifact name".to_string(),
        });
    }

    match selector {
        "latest" => Ok((name, VersionSelector::Latest)),
        v => {
            let version = v
                .strip_prefix('v')
                .and_then(|n| n.parse::<u32>().ok())
                .ok_or_else(|| CleaningError::Resolution {
                    reference: reference.to_string(),
                    reason: format!("malformed version selector '{}'", v),
                })?;
            Ok((name, VersionSelector::Exact(version)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store_with_payload(contents: &str) -> (TempDir, FsArtifactStore, ArtifactId) {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::open(dir.path().join("store")).unwrap();

        let payload = dir.path().join("sample.csv");
        fs::write(&payload, contents).unwrap();

        let draft = ArtifactDraft::new("sample", "raw_data", "Raw listings").with_file(&payload);
        let id = store.log_artifact(&draft).unwrap();
        (dir, store, id)
    }

    // ==================== parse_reference tests ====================

    #[test]
    fn test_parse_reference_forms() {
        assert_eq!(
            parse_reference("sample").unwrap(),
            ("sample", VersionSelector::Latest)
        );
        assert_eq!(
            parse_reference("sample:latest").unwrap(),
            ("sample", VersionSelector::Latest)
        );
        assert_eq!(
            parse_reference("sample:v3").unwrap(),
            ("sample", VersionSelector::Exact(3))
        );
    }

    #[test]
    fn test_parse_reference_malformed() {
        assert!(parse_reference("sample:3").is_err());
        assert!(parse_reference("sample:vx").is_err());
        assert!(parse_reference(":v1").is_err());
    }

    // ==================== publish/resolve tests ====================

    #[test]
    fn test_log_artifact_assigns_v1_then_increments() {
        let (dir, store, first) = store_with_payload("a,b\n1,2\n");
        assert_eq!(first.version, 1);

        let payload = dir.path().join("sample.csv");
        let draft = ArtifactDraft::new("sample", "raw_data", "Raw listings").with_file(&payload);
        let second = store.log_artifact(&draft).unwrap();
        assert_eq!(second.version, 2);
    }

    #[test]
    fn test_resolve_latest_and_exact() {
        let (dir, store, _) = store_with_payload("a,b\n1,2\n");

        let payload = dir.path().join("sample.csv");
        fs::write(&payload, "a,b\n3,4\n").unwrap();
        let draft = ArtifactDraft::new("sample", "raw_data", "Raw listings").with_file(&payload);
        store.log_artifact(&draft).unwrap();

        let latest = store.resolve("sample:latest").unwrap();
        assert_eq!(fs::read_to_string(latest).unwrap(), "a,b\n3,4\n");

        let v1 = store.resolve("sample:v1").unwrap();
        assert_eq!(fs::read_to_string(v1).unwrap(), "a,b\n1,2\n");

        // A bare name means latest.
        let bare = store.resolve("sample").unwrap();
        assert_eq!(fs::read_to_string(bare).unwrap(), "a,b\n3,4\n");
    }

    #[test]
    fn test_resolve_unknown_artifact() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::open(dir.path()).unwrap();

        let err = store.resolve("missing:latest").unwrap_err();
        assert!(matches!(err, CleaningError::Resolution { .. }));
    }

    #[test]
    fn test_resolve_unknown_version() {
        let (_dir, store, _) = store_with_payload("a,b\n1,2\n");

        let err = store.resolve("sample:v9").unwrap_err();
        assert!(matches!(err, CleaningError::Resolution { .. }));
    }

    #[test]
    fn test_manifest_records_metadata_and_digest() {
        let contents = "a,b\n1,2\n";
        let (_dir, store, id) = store_with_payload(contents);

        let manifest = store.manifest(&id).unwrap();
        assert_eq!(manifest.name, "sample");
        assert_eq!(manifest.artifact_type, "raw_data");
        assert_eq!(manifest.description, "Raw listings");
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].size_bytes, contents.len() as u64);

        let mut hasher = Sha256::new();
        hasher.update(contents.as_bytes());
        assert_eq!(manifest.files[0].sha256, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_manifest_records_lineage_and_config() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::open(dir.path().join("store")).unwrap();
        let payload = dir.path().join("clean.csv");
        fs::write(&payload, "a\n1\n").unwrap();

        let draft = ArtifactDraft::new("clean_sample", "clean_sample", "Cleaned listings")
            .with_file(&payload)
            .with_input("sample:v1")
            .with_run_config(serde_json::json!({"min_price": 10.0}));
        let id = store.log_artifact(&draft).unwrap();

        let manifest = store.manifest(&id).unwrap();
        assert_eq!(manifest.inputs, vec!["sample:v1".to_string()]);
        assert_eq!(
            manifest.run_config.unwrap()["min_price"],
            serde_json::json!(10.0)
        );
    }

    #[test]
    fn test_path_like_names_stay_inside_the_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("store");
        let store = FsArtifactStore::open(&root).unwrap();
        let payload = dir.path().join("clean.csv");
        fs::write(&payload, "a\n1\n").unwrap();

        let name = payload.to_string_lossy().into_owned();
        let draft =
            ArtifactDraft::new(name.as_str(), "clean_sample", "Cleaned").with_file(&payload);
        let id = store.log_artifact(&draft).unwrap();

        let resolved = store.resolve(&id.to_string()).unwrap();
        assert!(resolved.starts_with(&root));
        assert_eq!(store.manifest(&id).unwrap().name, name);
    }

    #[test]
    fn test_log_artifact_rejects_empty_draft() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::open(dir.path()).unwrap();

        let draft = ArtifactDraft::new("empty", "raw_data", "nothing");
        let err = store.log_artifact(&draft).unwrap_err();
        assert!(matches!(err, CleaningError::Publish { .. }));
    }

    #[test]
    fn test_log_artifact_missing_payload_file() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::open(dir.path()).unwrap();

        let draft = ArtifactDraft::new("sample", "raw_data", "Raw listings")
            .with_file(dir.path().join("does-not-exist.csv"));
        let err = store.log_artifact(&draft).unwrap_err();
        assert!(matches!(err, CleaningError::Publish { .. }));
    }
}
