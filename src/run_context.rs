//! Per-run tracking context.
//!
//! One [`RunContext`] is opened per stage invocation. It accumulates the run
//! configuration, the artifact versions consumed, and the versions registered,
//! then appends the completed record to a daily-rotated NDJSON run log on
//! `finish`. A context dropped without finishing is written out as failed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Finished,
    Failed,
}

/// An artifact version consumed or produced by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactUse {
    pub name: String,
    pub version: u64,
}

/// The durable record of one run, one NDJSON line in the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub job_type: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: RunState,
    pub config: serde_json::Value,
    pub inputs: Vec<ArtifactUse>,
    pub outputs: Vec<ArtifactUse>,
}

pub struct RunContext {
    record: RunRecord,
    runs_dir: PathBuf,
    finished: bool,
}

impl RunContext {
    pub fn open<P: Into<PathBuf>>(job_type: &str, runs_dir: P) -> Result<Self> {
        let runs_dir = runs_dir.into();
        fs::create_dir_all(&runs_dir)?;
        let record = RunRecord {
            run_id: Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            state: RunState::Running,
            config: serde_json::Value::Null,
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        info!("Opened run {} (job_type={})", record.run_id, job_type);
        Ok(Self {
            record,
            runs_dir,
            finished: false,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.record.run_id
    }

    /// Snapshot the run configuration for reproducibility.
    pub fn record_config<T: Serialize>(&mut self, config: &T) -> Result<()> {
        self.record.config = serde_json::to_value(config)?;
        Ok(())
    }

    /// Record that this run consumed an exact artifact version.
    pub fn record_input(&mut self, name: &str, version: u64) {
        self.record.inputs.push(ArtifactUse {
            name: name.to_string(),
            version,
        });
    }

    /// Record that this run registered a new artifact version.
    pub fn record_output(&mut self, name: &str, version: u64) {
        self.record.outputs.push(ArtifactUse {
            name: name.to_string(),
            version,
        });
    }

    pub fn finish(mut self, state: RunState) -> Result<()> {
        self.write(state)
    }

    fn write(&mut self, state: RunState) -> Result<()> {
        self.finished = true;
        self.record.state = state;
        self.record.finished_at = Some(Utc::now());

        // Daily-rotated log file, one JSON object per line.
        let date_str = Utc::now().format("%Y-%m-%d");
        let path = self.runs_dir.join(format!("runs_{}.ndjson", date_str));
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let line = serde_json::to_string(&self.record)?;
        writeln!(file, "{}", line)?;
        file.sync_all()?;

        info!("Closed run {} ({:?})", self.record.run_id, state);
        Ok(())
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.write(RunState::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_records(dir: &std::path::Path) -> Vec<RunRecord> {
        let mut records = Vec::new();
        for entry in fs::read_dir(dir).unwrap() {
            let raw = fs::read_to_string(entry.unwrap().path()).unwrap();
            for line in raw.lines() {
                records.push(serde_json::from_str(line).unwrap());
            }
        }
        records
    }

    #[test]
    fn finish_appends_a_complete_record() {
        let tmp = tempdir().unwrap();
        let mut ctx = RunContext::open("basic_cleaning", tmp.path()).unwrap();
        ctx.record_config(&serde_json::json!({"min_price": 10.0})).unwrap();
        ctx.record_input("sample.csv", 1);
        ctx.record_output("clean_sample.csv", 1);
        ctx.finish(RunState::Finished).unwrap();

        let records = read_records(tmp.path());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.state, RunState::Finished);
        assert_eq!(record.job_type, "basic_cleaning");
        assert_eq!(record.inputs, vec![ArtifactUse { name: "sample.csv".to_string(), version: 1 }]);
        assert_eq!(
            record.outputs,
            vec![ArtifactUse { name: "clean_sample.csv".to_string(), version: 1 }]
        );
        assert!(record.finished_at.is_some());
    }

    #[test]
    fn dropped_context_is_recorded_as_failed() {
        let tmp = tempdir().unwrap();
        {
            let _ctx = RunContext::open("basic_cleaning", tmp.path()).unwrap();
        }
        let records = read_records(tmp.path());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, RunState::Failed);
    }

    #[test]
    fn runs_append_to_the_same_daily_file() {
        let tmp = tempdir().unwrap();
        RunContext::open("basic_cleaning", tmp.path())
            .unwrap()
            .finish(RunState::Finished)
            .unwrap();
        RunContext::open("basic_cleaning", tmp.path())
            .unwrap()
            .finish(RunState::Failed)
            .unwrap();

        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
        assert_eq!(read_records(tmp.path()).len(), 2);
    }
}
