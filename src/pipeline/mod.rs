//! The cleaning stage: resolve → transform → publish.

pub mod clean;
pub mod publish;
pub mod resolve;

pub use clean::{clean, CleaningParams};

use std::fmt;
use std::time::Instant;

use metrics::histogram;
use serde::Serialize;
use tracing::info;

use crate::constants::JOB_TYPE;
use crate::error::Result;
use crate::run_context::{ArtifactUse, RunContext};
use crate::store::{ArtifactDescriptor, ArtifactStore, Lineage};
use crate::table::Table;

/// Stage lifecycle. Transitions are strictly forward; any error leaves the
/// stage failed with no partial output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Init,
    Resolving,
    Transforming,
    Publishing,
    Done,
    Failed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageState::Init => "INIT",
            StageState::Resolving => "RESOLVING",
            StageState::Transforming => "TRANSFORMING",
            StageState::Publishing => "PUBLISHING",
            StageState::Done => "DONE",
            StageState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Invocation parameters for one stage run, recorded verbatim on the run
/// context for reproducibility.
#[derive(Debug, Clone, Serialize)]
pub struct StageArgs {
    pub input_artifact: String,
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    pub min_price: f64,
    pub max_price: f64,
}

/// Result summary of a completed stage run.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub state: StageState,
    pub input: ArtifactUse,
    pub output: ArtifactUse,
    pub rows_in: usize,
    pub rows_out: usize,
    pub elapsed_secs: f64,
}

/// Runs the full stage against the given store. Steps run strictly in
/// sequence; the first error aborts the run and propagates to the caller,
/// which finishes the run record as failed.
pub async fn run_stage(
    store: &dyn ArtifactStore,
    ctx: &mut RunContext,
    args: &StageArgs,
) -> Result<StageReport> {
    let started = Instant::now();
    let mut state = StageState::Init;
    ctx.record_config(args)?;
    info!("🚀 Starting {} run {} ({})", JOB_TYPE, ctx.run_id(), state);

    state = StageState::Resolving;
    info!("Stage state: {}", state);
    let resolved = resolve::resolve_input(store, ctx, &args.input_artifact).await?;
    let table = Table::from_csv_path(&resolved.local_path)?;
    let rows_in = table.n_rows();

    state = StageState::Transforming;
    info!("Stage state: {}", state);
    let params = CleaningParams {
        min_price: args.min_price,
        max_price: args.max_price,
    };
    let cleaned = clean(&table, &params)?;

    state = StageState::Publishing;
    info!("Stage state: {}", state);
    let descriptor = ArtifactDescriptor {
        name: args.output_artifact.clone(),
        artifact_type: args.output_type.clone(),
        description: args.output_description.clone(),
        lineage: Some(Lineage {
            source_name: resolved.name.clone(),
            source_version: resolved.version,
        }),
    };
    let manifest = publish::publish_cleaned(store, ctx, &cleaned, descriptor).await?;

    state = StageState::Done;
    let elapsed_secs = started.elapsed().as_secs_f64();
    histogram!("listings_stage_duration_seconds").record(elapsed_secs);
    info!("Stage state: {} ({:.3}s)", state, elapsed_secs);

    Ok(StageReport {
        state,
        input: ArtifactUse {
            name: resolved.name,
            version: resolved.version,
        },
        output: ArtifactUse {
            name: manifest.name,
            version: manifest.version,
        },
        rows_in,
        rows_out: cleaned.n_rows(),
        elapsed_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CleanerError;
    use crate::run_context::RunState;
    use crate::store::InMemoryStore;
    use tempfile::tempdir;

    const RAW: &str = "\
id,name,price,longitude,latitude,last_review
1,kept,120,-73.95,40.70,2019-05-21
2,too cheap,5,-73.95,40.70,2019-05-21
3,off the map,120,-122.33,47.60,2019-05-21
4,bad date,120,-73.95,40.70,never
";

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new().unwrap();
        let staging = tempdir().unwrap();
        let path = staging.path().join("sample.csv");
        std::fs::write(&path, RAW).unwrap();
        let descriptor = ArtifactDescriptor {
            name: "sample.csv".to_string(),
            artifact_type: "raw_data".to_string(),
            description: "raw listings".to_string(),
            lineage: None,
        };
        store.publish(&descriptor, &path).await.unwrap();
        store
    }

    fn args() -> StageArgs {
        StageArgs {
            input_artifact: "sample.csv:latest".to_string(),
            output_artifact: "clean_sample.csv".to_string(),
            output_type: "clean_data".to_string(),
            output_description: "cleaned listings".to_string(),
            min_price: 10.0,
            max_price: 350.0,
        }
    }

    #[tokio::test]
    async fn stage_runs_end_to_end() {
        let store = seeded_store().await;
        let runs = tempdir().unwrap();
        let mut ctx = RunContext::open(JOB_TYPE, runs.path()).unwrap();

        let report = run_stage(&store, &mut ctx, &args()).await.unwrap();
        assert_eq!(report.state, StageState::Done);
        assert_eq!(report.rows_in, 4);
        assert_eq!(report.rows_out, 2);
        assert_eq!(report.input, ArtifactUse { name: "sample.csv".to_string(), version: 1 });
        assert_eq!(
            report.output,
            ArtifactUse { name: "clean_sample.csv".to_string(), version: 1 }
        );
        ctx.finish(RunState::Finished).unwrap();
    }

    #[tokio::test]
    async fn stage_fails_on_unknown_input_without_publishing() {
        let store = InMemoryStore::new().unwrap();
        let runs = tempdir().unwrap();
        let mut ctx = RunContext::open(JOB_TYPE, runs.path()).unwrap();

        let err = run_stage(&store, &mut ctx, &args()).await.unwrap_err();
        assert!(matches!(err, CleanerError::NotFound(_)));

        let published = store
            .resolve(&crate::store::ArtifactRef::parse("clean_sample.csv").unwrap())
            .await;
        assert!(published.is_err());
    }

    #[tokio::test]
    async fn published_artifact_carries_lineage_to_the_resolved_input() {
        let store = seeded_store().await;
        let runs = tempdir().unwrap();
        let mut ctx = RunContext::open(JOB_TYPE, runs.path()).unwrap();
        run_stage(&store, &mut ctx, &args()).await.unwrap();

        let resolved = store
            .resolve(&crate::store::ArtifactRef::parse("clean_sample.csv").unwrap())
            .await
            .unwrap();
        assert_eq!(
            resolved.manifest.lineage,
            Some(Lineage {
                source_name: "sample.csv".to_string(),
                source_version: 1,
            })
        );
        ctx.finish(RunState::Finished).unwrap();
    }
}
