//! Input artifact resolution.

use tracing::info;

use crate::error::Result;
use crate::run_context::RunContext;
use crate::store::{ArtifactRef, ArtifactStore, ResolvedArtifact};

/// Resolves the input reference to a concrete local file and records the
/// consumed version on the run context. Resolution failures propagate; there
/// is no retry and no fallback version.
pub async fn resolve_input(
    store: &dyn ArtifactStore,
    ctx: &mut RunContext,
    reference: &str,
) -> Result<ResolvedArtifact> {
    let artifact_ref = ArtifactRef::parse(reference)?;
    let resolved = store.resolve(&artifact_ref).await?;
    ctx.record_input(&resolved.name, resolved.version);
    info!(
        "📡 Using input artifact {}:v{} ({})",
        resolved.name,
        resolved.version,
        resolved.local_path.display()
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ArtifactDescriptor, InMemoryStore};
    use tempfile::tempdir;

    #[tokio::test]
    async fn resolving_records_the_exact_version_used() {
        let store = InMemoryStore::new().unwrap();
        let staging = tempdir().unwrap();
        let path = staging.path().join("sample.csv");
        std::fs::write(&path, "a\n1\n").unwrap();
        let descriptor = ArtifactDescriptor {
            name: "sample.csv".to_string(),
            artifact_type: "raw_data".to_string(),
            description: "test".to_string(),
            lineage: None,
        };
        store.publish(&descriptor, &path).await.unwrap();
        store.publish(&descriptor, &path).await.unwrap();

        let runs = tempdir().unwrap();
        let mut ctx = RunContext::open("basic_cleaning", runs.path()).unwrap();
        let resolved = resolve_input(&store, &mut ctx, "sample.csv:v1").await.unwrap();
        assert_eq!(resolved.version, 1);
        ctx.finish(crate::run_context::RunState::Finished).unwrap();
    }

    #[tokio::test]
    async fn unknown_reference_propagates_not_found() {
        let store = InMemoryStore::new().unwrap();
        let runs = tempdir().unwrap();
        let mut ctx = RunContext::open("basic_cleaning", runs.path()).unwrap();
        let err = resolve_input(&store, &mut ctx, "missing.csv").await.unwrap_err();
        assert!(matches!(err, crate::error::CleanerError::NotFound(_)));
    }

    #[tokio::test]
    async fn bad_reference_is_rejected_before_the_store_is_hit() {
        let store = InMemoryStore::new().unwrap();
        let runs = tempdir().unwrap();
        let mut ctx = RunContext::open("basic_cleaning", runs.path()).unwrap();
        let err = resolve_input(&store, &mut ctx, "sample.csv:vX").await.unwrap_err();
        assert!(matches!(err, crate::error::CleanerError::InvalidReference(_)));
    }
}
