//! The execution engine boundary.
//!
//! The orchestrator only decides *when* a stage runs. Running it (splitting
//! input, parallel per-record work, writing output) is the job of an
//! [`ExecutionEngine`]. [`LocalEngine`] is the in-process implementation;
//! [`ScriptedEngine`](crate::testing::ScriptedEngine) is a test double.

pub mod jobs;
mod local;

pub use jobs::JobKind;
pub use local::LocalEngine;

use crate::orchestrator::StageSpec;
use anyhow::Result;
use std::path::Path;

/// Where a submitted job is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Running,
    Succeeded,
    Failed(String),
}

/// A point-in-time status snapshot for one job.
///
/// Progress values are fractions in `0.0..=1.0` for the distribute (map) and
/// aggregate (reduce) halves of the job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    pub distribute_progress: f32,
    pub aggregate_progress: f32,
}

impl JobStatus {
    #[must_use]
    pub fn running(distribute_progress: f32, aggregate_progress: f32) -> Self {
        Self {
            state: JobState::Running,
            distribute_progress,
            aggregate_progress,
        }
    }

    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            state: JobState::Succeeded,
            distribute_progress: 1.0,
            aggregate_progress: 1.0,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: JobState::Failed(message.into()),
            distribute_progress: 0.0,
            aggregate_progress: 0.0,
        }
    }
}

/// Runs stages on behalf of the orchestrator.
pub trait ExecutionEngine {
    /// Start the job for `stage`. Must not block until it completes.
    ///
    /// # Errors
    ///
    /// Returns an error when the job cannot be started; the orchestrator
    /// marks the stage failed.
    fn submit(&self, stage: &StageSpec) -> Result<()>;

    /// Current status of a previously submitted stage.
    ///
    /// # Errors
    ///
    /// Returns an error when the stage is unknown to the engine or its state
    /// cannot be read.
    fn status(&self, stage: &str) -> Result<JobStatus>;

    /// Recursively delete a stage output.
    ///
    /// # Errors
    ///
    /// Returns an error when the path exists but cannot be removed.
    fn delete(&self, path: &Path) -> Result<()>;
}

impl<E: ExecutionEngine + ?Sized> ExecutionEngine for &E {
    fn submit(&self, stage: &StageSpec) -> Result<()> {
        (**self).submit(stage)
    }

    fn status(&self, stage: &str) -> Result<JobStatus> {
        (**self).status(stage)
    }

    fn delete(&self, path: &Path) -> Result<()> {
        (**self).delete(path)
    }
}
