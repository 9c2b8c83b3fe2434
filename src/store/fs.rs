//! Local filesystem artifact store.
//!
//! Layout under the store root:
//!
//! ```text
//! artifacts/<name>/v<N>/<payload file>
//! artifacts/<name>/v<N>/manifest.json
//! artifacts/<name>/latest
//! ```
//!
//! A publish stages the payload and manifest into a hidden directory inside
//! the artifact directory, syncs them, and renames the directory to `v<N>`.
//! The rename is the commit point: a version either exists completely or not
//! at all, and concurrent publishers cannot overwrite an existing version.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CleanerError, Result};
use crate::store::{
    sha256_hex, ArtifactDescriptor, ArtifactManifest, ArtifactRef, ArtifactStore,
    ResolvedArtifact, Revision,
};

const MANIFEST_FILE: &str = "manifest.json";
const LATEST_ALIAS_FILE: &str = "latest";

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let _ = fs::create_dir_all(root.join("artifacts"));
        Self { root }
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join("artifacts").join(name)
    }

    fn version_dir(&self, name: &str, version: u64) -> PathBuf {
        self.artifact_dir(name).join(format!("v{}", version))
    }

    /// Newest published version, read from the alias pointer.
    fn latest_version(&self, name: &str) -> Result<u64> {
        let alias_path = self.artifact_dir(name).join(LATEST_ALIAS_FILE);
        let raw = fs::read_to_string(&alias_path)
            .map_err(|_| CleanerError::NotFound(name.to_string()))?;
        raw.trim()
            .strip_prefix('v')
            .and_then(|n| n.parse::<u64>().ok())
            .ok_or_else(|| {
                CleanerError::Store(format!("corrupt latest alias for artifact '{}'", name))
            })
    }

    /// Highest version directory present, or 0 when none exist yet.
    fn max_version(&self, name: &str) -> u64 {
        let dir = self.artifact_dir(name);
        let Ok(entries) = fs::read_dir(dir) else {
            return 0;
        };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|n| n.strip_prefix('v'))
                    .and_then(|n| n.parse::<u64>().ok())
            })
            .max()
            .unwrap_or(0)
    }

    fn read_manifest(&self, name: &str, version: u64) -> Result<ArtifactManifest> {
        let path = self.version_dir(name, version).join(MANIFEST_FILE);
        let raw = fs::read_to_string(&path)
            .map_err(|_| CleanerError::NotFound(format!("{}:v{}", name, version)))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Point the `latest` alias at a version via write-then-rename.
    fn update_latest_alias(&self, name: &str, version: u64) -> Result<()> {
        let dir = self.artifact_dir(name);
        let tmp = dir.join(format!(".latest-{}", Uuid::new_v4()));
        fs::write(&tmp, format!("v{}\n", version))?;
        File::open(&tmp)?.sync_all()?;
        fs::rename(&tmp, dir.join(LATEST_ALIAS_FILE))?;
        Ok(())
    }

    fn sync_dir(path: &Path) -> Result<()> {
        // Directory fsync is required for the rename to be durable on unix;
        // other platforms get best-effort behavior.
        #[cfg(unix)]
        File::open(path)?.sync_all()?;
        #[cfg(not(unix))]
        let _ = path;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn resolve(&self, reference: &ArtifactRef) -> Result<ResolvedArtifact> {
        let version = match reference.revision {
            Revision::Latest => self.latest_version(&reference.name)?,
            Revision::Version(n) => n,
        };
        let manifest = self.read_manifest(&reference.name, version)?;
        let payload_path = self.version_dir(&reference.name, version).join(&manifest.file_name);
        let bytes = fs::read(&payload_path)
            .map_err(|_| CleanerError::NotFound(format!("{}:v{}", reference.name, version)))?;
        let checksum = sha256_hex(&bytes);
        if checksum != manifest.checksum_sha256 {
            return Err(CleanerError::Store(format!(
                "checksum mismatch for {}:v{} (expected {}, got {})",
                reference.name, version, manifest.checksum_sha256, checksum
            )));
        }
        counter!("listings_store_reads_total").increment(1);
        debug!(
            "Resolved {} to version v{} at {}",
            reference,
            version,
            payload_path.display()
        );
        Ok(ResolvedArtifact {
            name: reference.name.clone(),
            version,
            local_path: payload_path,
            manifest,
        })
    }

    async fn publish(
        &self,
        descriptor: &ArtifactDescriptor,
        payload: &Path,
    ) -> Result<ArtifactManifest> {
        let bytes = fs::read(payload)?;
        let file_name = payload
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CleanerError::Publish(format!("bad payload path {}", payload.display())))?
            .to_string();

        let artifact_dir = self.artifact_dir(&descriptor.name);
        fs::create_dir_all(&artifact_dir)?;
        let version = self.max_version(&descriptor.name) + 1;

        let manifest = ArtifactManifest {
            name: descriptor.name.clone(),
            version,
            artifact_type: descriptor.artifact_type.clone(),
            description: descriptor.description.clone(),
            file_name: file_name.clone(),
            size_bytes: bytes.len() as u64,
            checksum_sha256: sha256_hex(&bytes),
            created_at: Utc::now(),
            lineage: descriptor.lineage.clone(),
        };

        // Stage the full version out of sight, then commit with one rename.
        let staging = artifact_dir.join(format!(".staging-{}", Uuid::new_v4()));
        fs::create_dir_all(&staging)?;
        let staged_payload = staging.join(&file_name);
        fs::write(&staged_payload, &bytes)?;
        File::open(&staged_payload)?.sync_all()?;
        let staged_manifest = staging.join(MANIFEST_FILE);
        fs::write(&staged_manifest, serde_json::to_string_pretty(&manifest)?)?;
        File::open(&staged_manifest)?.sync_all()?;

        let version_dir = self.version_dir(&descriptor.name, version);
        if let Err(e) = fs::rename(&staging, &version_dir) {
            let _ = fs::remove_dir_all(&staging);
            return Err(CleanerError::Publish(format!(
                "could not commit {}:v{}: {}",
                descriptor.name, version, e
            )));
        }
        Self::sync_dir(&artifact_dir)?;
        self.update_latest_alias(&descriptor.name, version)?;

        counter!("listings_store_writes_total").increment(1);
        info!(
            "Registered artifact {}:v{} ({} bytes, sha256 {})",
            descriptor.name, version, manifest.size_bytes, manifest.checksum_sha256
        );
        Ok(manifest)
    }
}
