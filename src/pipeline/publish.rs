//! Output artifact publication.

use tracing::info;

use crate::error::Result;
use crate::run_context::RunContext;
use crate::store::{ArtifactDescriptor, ArtifactManifest, ArtifactStore};
use crate::table::Table;

/// Serializes the cleaned table into a scoped staging directory and registers
/// it with the store. The staging directory lives only for the duration of
/// this call; it is removed on success and failure alike. The store call does
/// not return until the new version is durable.
pub async fn publish_cleaned(
    store: &dyn ArtifactStore,
    ctx: &mut RunContext,
    table: &Table,
    descriptor: ArtifactDescriptor,
) -> Result<ArtifactManifest> {
    let staging = tempfile::tempdir()?;
    let file_name = payload_file_name(&descriptor.name);
    let staged_path = staging.path().join(&file_name);
    table.to_csv_path(&staged_path)?;
    info!(
        "💾 Staged {} rows at {}",
        table.n_rows(),
        staged_path.display()
    );

    let manifest = store.publish(&descriptor, &staged_path).await?;
    ctx.record_output(&manifest.name, manifest.version);
    info!(
        "✅ Published {}:v{} (type={})",
        manifest.name, manifest.version, manifest.artifact_type
    );
    Ok(manifest)
}

fn payload_file_name(artifact_name: &str) -> String {
    if artifact_name.ends_with(".csv") {
        artifact_name.to_string()
    } else {
        format!("{}.csv", artifact_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_context::RunState;
    use crate::store::{ArtifactRef, InMemoryStore};
    use crate::table::Value;
    use tempfile::tempdir;

    fn small_table() -> Table {
        let mut t = Table::new(vec!["id".to_string(), "price".to_string()]);
        t.push_row(vec![
            Value::Text("1".to_string()),
            Value::Text("100".to_string()),
        ])
        .unwrap();
        t
    }

    #[tokio::test]
    async fn publishing_registers_and_records_the_output() {
        let store = InMemoryStore::new().unwrap();
        let runs = tempdir().unwrap();
        let mut ctx = RunContext::open("basic_cleaning", runs.path()).unwrap();

        let descriptor = ArtifactDescriptor {
            name: "clean_sample.csv".to_string(),
            artifact_type: "clean_data".to_string(),
            description: "cleaned listings".to_string(),
            lineage: None,
        };
        let manifest = publish_cleaned(&store, &mut ctx, &small_table(), descriptor)
            .await
            .unwrap();
        assert_eq!(manifest.version, 1);
        assert_eq!(manifest.file_name, "clean_sample.csv");

        let resolved = store
            .resolve(&ArtifactRef::parse("clean_sample.csv").unwrap())
            .await
            .unwrap();
        let bytes = std::fs::read_to_string(resolved.local_path).unwrap();
        assert_eq!(bytes, "id,price\n1,100\n");
        ctx.finish(RunState::Finished).unwrap();
    }

    #[test]
    fn payload_file_name_appends_csv_once() {
        assert_eq!(payload_file_name("clean_sample.csv"), "clean_sample.csv");
        assert_eq!(payload_file_name("clean_sample"), "clean_sample.csv");
    }
}
