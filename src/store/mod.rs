//! Versioned artifact store.
//!
//! An artifact is an immutable, named, versioned data object. The store is
//! keyed by name + version, keeps a `latest` alias per artifact, and records
//! lineage (which input version produced an output) on the version manifest.
//! Two backends are provided: a local filesystem store and an HTTP client for
//! a remote store service, selected from configuration.

pub mod fs;
pub mod http;
pub mod in_memory;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CleanerError, Result};

pub use fs::FsArtifactStore;
pub use http::HttpArtifactStore;
pub use in_memory::InMemoryStore;

static ARTIFACT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid artifact name pattern"));

/// Which version of an artifact a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Revision {
    /// The newest published version.
    #[default]
    Latest,
    /// An explicit version number.
    Version(u64),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Latest => write!(f, "latest"),
            Revision::Version(n) => write!(f, "v{}", n),
        }
    }
}

/// Parsed `name[:version|:alias]` artifact reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub revision: Revision,
}

impl ArtifactRef {
    /// Parses a reference string. A bare name means `latest`; the revision
    /// part is either the `latest` alias or an explicit `vN`.
    pub fn parse(reference: &str) -> Result<Self> {
        let (name, revision) = match reference.split_once(':') {
            None => (reference, Revision::Latest),
            Some((name, rev)) => {
                let revision = if rev == "latest" {
                    Revision::Latest
                } else if let Some(n) = rev.strip_prefix('v').and_then(|n| n.parse::<u64>().ok()) {
                    Revision::Version(n)
                } else {
                    return Err(CleanerError::InvalidReference(reference.to_string()));
                };
                (name, revision)
            }
        };
        if !ARTIFACT_NAME_RE.is_match(name) {
            return Err(CleanerError::InvalidReference(reference.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            revision,
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.revision)
    }
}

/// Input version an artifact was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub source_name: String,
    pub source_version: u64,
}

/// Caller-declared metadata for a new artifact version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
    pub lineage: Option<Lineage>,
}

/// Stored metadata for one published artifact version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: String,
    pub version: u64,
    pub artifact_type: String,
    pub description: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub checksum_sha256: String,
    pub created_at: DateTime<Utc>,
    pub lineage: Option<Lineage>,
}

/// A reference resolved to a concrete version with a readable local payload.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub name: String,
    pub version: u64,
    pub local_path: PathBuf,
    pub manifest: ArtifactManifest,
}

/// Store operations used by the stage. `publish` must not return until the
/// new version is durable, and must never leave a partial version visible.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn resolve(&self, reference: &ArtifactRef) -> Result<ResolvedArtifact>;
    async fn publish(&self, descriptor: &ArtifactDescriptor, payload: &Path)
        -> Result<ArtifactManifest>;
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
