// Run report (outcome of one provisioning run)
//
// Serialized as camelCase JSON beside the session log so support can see which steps ran,
// which failed and which never started.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Exit code when every step completed (WARN failures allowed).
pub const EXIT_OK: i32 = 0;
/// Exit code when a FATAL step failure halted the run.
pub const EXIT_STEP_FATAL: i32 = 1;

/// Failure policy declared by each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    /// Failure halts the run; later steps are not attempted.
    Fatal,
    /// Failure is recorded and the run continues.
    Warn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    NotRun,
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub name: String,
    pub criticality: Criticality,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub instance: String,
    pub connection_target: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    /// A pending report with every step `NotRun`.
    pub fn pending(
        instance: &str,
        connection_target: &str,
        steps: impl IntoIterator<Item = (String, Criticality)>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            instance: instance.to_string(),
            connection_target: connection_target.to_string(),
            state: RunState::Pending,
            started_at: Utc::now(),
            finished_at: None,
            steps: steps
                .into_iter()
                .map(|(name, criticality)| StepRecord {
                    name,
                    criticality,
                    status: StepStatus::NotRun,
                    error: None,
                    duration_ms: None,
                })
                .collect(),
        }
    }

    pub fn start(&mut self) {
        self.state = RunState::Running;
        self.started_at = Utc::now();
    }

    pub fn record_ok(&mut self, index: usize, duration_ms: u128) {
        if let Some(step) = self.steps.get_mut(index) {
            step.status = StepStatus::Ok;
            step.duration_ms = Some(duration_ms);
        }
    }

    pub fn record_failure(&mut self, index: usize, error: String, duration_ms: u128) {
        if let Some(step) = self.steps.get_mut(index) {
            step.status = StepStatus::Failed;
            step.error = Some(error);
            step.duration_ms = Some(duration_ms);
        }
    }

    pub fn halt(&mut self) {
        self.state = RunState::Halted;
        self.finished_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.state = RunState::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Steps that failed under WARN criticality.
    pub fn warning_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed && s.criticality == Criticality::Warn)
            .count()
    }

    /// First step that failed under FATAL criticality, if any.
    pub fn fatal_step(&self) -> Option<&StepRecord> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Failed && s.criticality == Criticality::Fatal)
    }

    pub fn exit_code(&self) -> i32 {
        match self.state {
            RunState::Completed => EXIT_OK,
            _ => EXIT_STEP_FATAL,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report: {:?}", path))?;
        Ok(())
    }
}
