//! In-memory artifact store for development and testing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use crate::error::{CleanerError, Result};
use crate::store::{
    sha256_hex, ArtifactDescriptor, ArtifactManifest, ArtifactRef, ArtifactStore,
    ResolvedArtifact, Revision,
};

struct StoredVersion {
    manifest: ArtifactManifest,
    bytes: Vec<u8>,
}

pub struct InMemoryStore {
    artifacts: Arc<Mutex<HashMap<String, Vec<StoredVersion>>>>,
    // Resolved payloads are materialized here so callers get a real path.
    scratch: TempDir,
}

impl InMemoryStore {
    pub fn new() -> Result<Self> {
        Ok(Self {
            artifacts: Arc::new(Mutex::new(HashMap::new())),
            scratch: tempfile::tempdir()?,
        })
    }
}

#[async_trait]
impl ArtifactStore for InMemoryStore {
    async fn resolve(&self, reference: &ArtifactRef) -> Result<ResolvedArtifact> {
        let artifacts = self.artifacts.lock().unwrap();
        let versions = artifacts
            .get(&reference.name)
            .ok_or_else(|| CleanerError::NotFound(reference.to_string()))?;
        let stored = match reference.revision {
            Revision::Latest => versions.last(),
            Revision::Version(n) => versions.iter().find(|v| v.manifest.version == n),
        }
        .ok_or_else(|| CleanerError::NotFound(reference.to_string()))?;

        let dir = self
            .scratch
            .path()
            .join(&reference.name)
            .join(format!("v{}", stored.manifest.version));
        fs::create_dir_all(&dir)?;
        let local_path = dir.join(&stored.manifest.file_name);
        fs::write(&local_path, &stored.bytes)?;

        Ok(ResolvedArtifact {
            name: reference.name.clone(),
            version: stored.manifest.version,
            local_path,
            manifest: stored.manifest.clone(),
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

        let mut artifacts = self.artifacts.lock().unwrap();
        let versions = artifacts.entry(descriptor.name.clone()).or_default();
        let manifest = ArtifactManifest {
            name: descriptor.name.clone(),
            version: versions.len() as u64 + 1,
            artifact_type: descriptor.artifact_type.clone(),
            description: descriptor.description.clone(),
            file_name,
            size_bytes: bytes.len() as u64,
            checksum_sha256: sha256_hex(&bytes),
            created_at: Utc::now(),
            lineage: descriptor.lineage.clone(),
        };
        versions.push(StoredVersion {
            manifest: manifest.clone(),
            bytes,
        });
        Ok(manifest)
    }
}
