//! HTTP client for a remote artifact store service.
//!
//! Configured with a base URL and an optional bearer token. Resolved payloads
//! are cached under a local directory so the stage always hands the transform
//! a readable file path, remote or not. The service is expected to commit a
//! version atomically and to answer 404 for unknown names or versions.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use metrics::counter;
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::error::{CleanerError, Result};
use crate::store::{
    sha256_hex, ArtifactDescriptor, ArtifactManifest, ArtifactRef, ArtifactStore,
    ResolvedArtifact,
};

pub struct HttpArtifactStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    cache_dir: PathBuf,
}

impl HttpArtifactStore {
    pub fn new<P: Into<PathBuf>>(base_url: &str, token: Option<String>, cache_dir: P) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            cache_dir: cache_dir.into(),
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn fetch_manifest(&self, reference: &ArtifactRef) -> Result<ArtifactManifest> {
        let url = format!(
            "{}/artifacts/{}/{}/manifest",
            self.base_url, reference.name, reference.revision
        );
        let resp = self.authed(self.client.get(&url)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(CleanerError::NotFound(reference.to_string()));
        }
        if !resp.status().is_success() {
            return Err(CleanerError::Store(format!(
                "manifest fetch for {} failed with status {}",
                reference,
                resp.status()
            )));
        }
        Ok(resp.json::<ArtifactManifest>().await?)
    }

    async fn fetch_payload(&self, manifest: &ArtifactManifest) -> Result<Vec<u8>> {
        let url = format!(
            "{}/artifacts/{}/v{}/payload",
            self.base_url, manifest.name, manifest.version
        );
        let resp = self.authed(self.client.get(&url)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(CleanerError::NotFound(format!(
                "{}:v{}",
                manifest.name, manifest.version
            )));
        }
        if !resp.status().is_success() {
            return Err(CleanerError::Store(format!(
                "payload fetch for {}:v{} failed with status {}",
                manifest.name,
                manifest.version,
                resp.status()
            )));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn resolve(&self, reference: &ArtifactRef) -> Result<ResolvedArtifact> {
        let manifest = self.fetch_manifest(reference).await?;
        let bytes = self.fetch_payload(&manifest).await?;
        let checksum = sha256_hex(&bytes);
        if checksum != manifest.checksum_sha256 {
            return Err(CleanerError::Store(format!(
                "checksum mismatch for {}:v{} (expected {}, got {})",
                manifest.name, manifest.version, manifest.checksum_sha256, checksum
            )));
        }

        let cache_dir = self
            .cache_dir
            .join(&manifest.name)
            .join(format!("v{}", manifest.version));
        fs::create_dir_all(&cache_dir)?;
        let local_path = cache_dir.join(&manifest.file_name);
        fs::write(&local_path, &bytes)?;

        counter!("listings_store_reads_total").increment(1);
        debug!(
            "Resolved {} to version v{}, cached at {}",
            reference,
            manifest.version,
            local_path.display()
        );
        Ok(ResolvedArtifact {
            name: manifest.name.clone(),
            version: manifest.version,
            local_path,
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

        let url = format!("{}/artifacts/{}", self.base_url, descriptor.name);
        let mut req = self
            .authed(self.client.put(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header("x-artifact-type", descriptor.artifact_type.as_str())
            .header("x-artifact-description", descriptor.description.as_str())
            .header("x-file-name", file_name.as_str())
            .query(&[("checksum", sha256_hex(&bytes))]);
        if let Some(lineage) = &descriptor.lineage {
            req = req
                .header("x-lineage-name", lineage.source_name.as_str())
                .header("x-lineage-version", lineage.source_version.to_string());
        }

        // The store answers only after the version is durable.
        let resp = req.body(bytes).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CleanerError::Publish(format!(
                "upload of {} failed with status {}: {}",
                descriptor.name, status, body
            )));
        }
        let manifest = resp.json::<ArtifactManifest>().await?;

        counter!("listings_store_writes_total").increment(1);
        info!(
            "Registered artifact {}:v{} with remote store",
            manifest.name, manifest.version
        );
        Ok(manifest)
    }
}
