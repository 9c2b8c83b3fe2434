//! Stage configuration.
//!
//! Settings come from three layers: an optional `config.toml`, environment
//! variables (`LISTINGS_STORE_ROOT`, `LISTINGS_STORE_URL`,
//! `LISTINGS_STORE_TOKEN`, `LISTINGS_RUNS_DIR`), and CLI flags applied by the
//! caller. A configured store URL selects the remote HTTP store; otherwise
//! the local filesystem store under the store root is used.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::constants::{DEFAULT_RUNS_DIR, DEFAULT_STORE_ROOT};
use crate::error::Result;
use crate::store::{ArtifactStore, FsArtifactStore, HttpArtifactStore};

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    runs: RunsSection,
}

#[derive(Debug, Default, Deserialize)]
struct StoreSection {
    root: Option<PathBuf>,
    url: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RunsSection {
    dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub store_root: PathBuf,
    pub store_url: Option<String>,
    pub store_token: Option<String>,
    pub runs_dir: PathBuf,
}

impl Settings {
    /// Loads `config.toml` when present and applies environment overrides.
    pub fn load() -> Result<Self> {
        let file = match fs::read_to_string(CONFIG_FILE) {
            Ok(raw) => toml::from_str::<FileConfig>(&raw)?,
            Err(_) => FileConfig::default(),
        };

        let store_root = std::env::var("LISTINGS_STORE_ROOT")
            .ok()
            .map(PathBuf::from)
            .or(file.store.root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_ROOT));
        let store_url = std::env::var("LISTINGS_STORE_URL").ok().or(file.store.url);
        let store_token = std::env::var("LISTINGS_STORE_TOKEN")
            .ok()
            .or(file.store.token);
        let runs_dir = std::env::var("LISTINGS_RUNS_DIR")
            .ok()
            .map(PathBuf::from)
            .or(file.runs.dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RUNS_DIR));

        Ok(Self {
            store_root,
            store_url,
            store_token,
            runs_dir,
        })
    }

    /// Builds the artifact store this run talks to.
    pub fn make_store(&self) -> Arc<dyn ArtifactStore> {
        match &self.store_url {
            Some(url) => {
                info!("Using remote artifact store at {}", url);
                Arc::new(HttpArtifactStore::new(
                    url,
                    self.store_token.clone(),
                    self.store_root.join("cache"),
                ))
            }
            None => {
                info!("Using local artifact store at {}", self.store_root.display());
                Arc::new(FsArtifactStore::new(&self.store_root))
            }
        }
    }
}
