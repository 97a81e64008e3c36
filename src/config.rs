//! Pipeline configuration.
//!
//! Every field has a default, so a JSON config file only needs the keys it
//! changes:
//!
//! ```json
//! { "poll_interval_secs": 5, "engine": { "workers": 2 } }
//! ```
//!
//! Command-line flags are applied on top of the loaded file.

use crate::orchestrator::RunOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Settings for the local execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Threads in the engine's rayon pool.
    pub workers: usize,
    /// Line chunks the distribute phase splits its input into.
    pub distribute_units: usize,
    /// Part files the aggregate phase writes.
    pub aggregate_tasks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cpus = num_cpus::get().max(1);
        Self {
            workers: cpus,
            distribute_units: 2 * cpus,
            aggregate_tasks: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub poll_interval_secs: u64,
    pub report_progress: bool,
    /// Delete intermediate stage outputs after a fully successful run.
    pub cleanup: bool,
    pub engine: EngineConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            report_progress: false,
            cleanup: true,
            engine: EngineConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON for
    /// this structure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            report_progress: self.report_progress,
        }
    }
}
