//! Staged pipeline orchestration.
//!
//! An [`Orchestrator`] holds a DAG of named stages. [`Orchestrator::run`]
//! submits every stage whose dependencies have succeeded, polls the
//! [`ExecutionEngine`] at a fixed interval, and stops once every stage is
//! terminal or nothing can make progress any more (a failed dependency leaves
//! its dependents waiting forever).
//!
//! Stage state moves `Waiting -> Pending -> Running -> {Succeeded | Failed}`.
//! A stage with no dependencies starts `Pending`. Only the run loop mutates
//! state; progress reports are owned snapshots.
//!
//! # Example
//!
//! ```
//! use logbeam::orchestrator::{CancellationToken, Orchestrator, RunOptions};
//! use logbeam::testing::ScriptedEngine;
//! use std::time::Duration;
//!
//! let engine = ScriptedEngine::new().succeed_after("parse", 1);
//! let mut orch = Orchestrator::new(&engine);
//! orch.add_stage("parse", "in", "out/parse", &[]);
//!
//! let options = RunOptions { poll_interval: Duration::ZERO, report_progress: false };
//! let result = orch.run(&options, &CancellationToken::new())?;
//! assert!(result.is_success());
//! # Ok::<(), logbeam::PipelineError>(())
//! ```

use crate::engine::{ExecutionEngine, JobState};
use crate::error::PipelineError;
use chrono::{DateTime, Local};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use tracing::{error, info, warn};

/// What a stage is: its name, where it reads and writes, and what it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageState {
    /// Ready to submit.
    Pending,
    /// At least one dependency has not succeeded.
    Waiting,
    Running,
    Succeeded,
    Failed(String),
}

impl StageState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }
}

#[derive(Debug)]
struct Stage {
    spec: StageSpec,
    state: StageState,
    distribute_progress: f32,
    aggregate_progress: f32,
}

/// Poll loop settings.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub poll_interval: Duration,
    pub report_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            report_progress: false,
        }
    }
}

/// Cooperative cancellation for [`Orchestrator::run`].
///
/// Clones share one flag. Cancelling wakes a run that is sleeping between
/// polls.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for up to `timeout`; returns `true` if cancelled.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Progress of one running stage, in whole percent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningStage {
    pub name: String,
    pub distribute_percent: u32,
    pub aggregate_percent: u32,
}

/// One poll's worth of pipeline status.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub timestamp: DateTime<Local>,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub waiting: Vec<String>,
    pub running: Vec<RunningStage>,
}

impl Display for StatusReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        writeln!(f)?;
        writeln!(
            f,
            "Pipeline status update: {}",
            self.timestamp.format("%a %b %d %H:%M:%S %Y")
        )?;
        writeln!(f, "Successful stages: {}", self.succeeded.join(", "))?;
        writeln!(f, "Failed stages: {}", self.failed.join(", "))?;
        writeln!(f, "Waiting stages: {}", self.waiting.join(", "))?;
        write!(f, "Running stages:")?;
        for stage in &self.running {
            write!(
                f,
                "\n\t{}: distribute {}%\t aggregate {}%",
                stage.name, stage.distribute_percent, stage.aggregate_percent
            )?;
        }
        Ok(())
    }
}

/// Final state of every stage, in definition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub stages: Vec<(String, StageState)>,
    pub cancelled: bool,
}

impl PipelineResult {
    fn names_where(&self, pred: impl Fn(&StageState) -> bool) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|(_, state)| pred(state))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.names_where(|s| *s == StageState::Succeeded)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.names_where(|s| matches!(s, StageState::Failed(_)))
    }

    /// Stages that never reached a terminal state.
    pub fn waiting(&self) -> Vec<&str> {
        self.names_where(|s| !s.is_terminal())
    }

    pub fn state(&self, name: &str) -> Option<&StageState> {
        self.stages.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Every stage succeeded and the run was not cancelled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.stages.iter().all(|(_, s)| *s == StageState::Succeeded)
    }
}

fn percent(fraction: f32) -> u32 {
    // Clamped to 0..=100 before the cast.
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Runs a DAG of stages on an [`ExecutionEngine`].
pub struct Orchestrator<E> {
    engine: E,
    stages: Vec<Stage>,
}

impl<E: ExecutionEngine> Orchestrator<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            stages: Vec::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Define a stage. The graph is checked when the run starts.
    pub fn add_stage(
        &mut self,
        name: impl Into<String>,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        depends_on: &[&str],
    ) -> &mut Self {
        self.stages.push(Stage {
            spec: StageSpec {
                name: name.into(),
                input: input.as_ref().to_path_buf(),
                output: output.as_ref().to_path_buf(),
                depends_on: depends_on.iter().map(|d| (*d).to_string()).collect(),
            },
            state: StageState::Waiting,
            distribute_progress: 0.0,
            aggregate_progress: 0.0,
        });
        self
    }

    pub fn stages(&self) -> impl Iterator<Item = &StageSpec> {
        self.stages.iter().map(|s| &s.spec)
    }

    pub fn state(&self, name: &str) -> Option<&StageState> {
        self.stages
            .iter()
            .find(|s| s.spec.name == name)
            .map(|s| &s.state)
    }

    /// Check names are unique, dependencies exist and there is no cycle.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] misconfiguration found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut index = HashMap::with_capacity(self.stages.len());
        let mut graph = DiGraph::<usize, ()>::with_capacity(self.stages.len(), 0);
        for (i, stage) in self.stages.iter().enumerate() {
            if index.insert(stage.spec.name.as_str(), graph.add_node(i)).is_some() {
                return Err(PipelineError::DuplicateStage {
                    name: stage.spec.name.clone(),
                });
            }
        }
        for stage in &self.stages {
            let to = index[stage.spec.name.as_str()];
            for dep in &stage.spec.depends_on {
                let from = index.get(dep.as_str()).ok_or_else(|| PipelineError::UnknownDependency {
                    stage: stage.spec.name.clone(),
                    dependency: dep.clone(),
                })?;
                graph.add_edge(*from, to, ());
            }
        }
        toposort(&graph, None).map_err(|cycle| PipelineError::Cycle {
            stage: self.stages[graph[cycle.node_id()]].spec.name.clone(),
        })?;
        Ok(())
    }

    /// Run to completion, printing status reports to stdout when enabled.
    ///
    /// # Errors
    ///
    /// Fails before any submission if the stage graph is misconfigured.
    /// Stage failures are reported in the [`PipelineResult`], not as errors.
    pub fn run(
        &mut self,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        self.run_with(options, cancel, |report| println!("{report}"))
    }

    /// Like [`run`](Self::run) but hands each status report to `on_report`.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_with(
        &mut self,
        options: &RunOptions,
        cancel: &CancellationToken,
        mut on_report: impl FnMut(&StatusReport),
    ) -> Result<PipelineResult, PipelineError> {
        self.validate()?;
        for stage in &mut self.stages {
            stage.state = if stage.spec.depends_on.is_empty() {
                StageState::Pending
            } else {
                StageState::Waiting
            };
            stage.distribute_progress = 0.0;
            stage.aggregate_progress = 0.0;
        }

        let mut cancelled = false;
        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            self.submit_ready();
            self.poll();
            if options.report_progress {
                on_report(&self.report());
            }
            if self.stages.iter().all(|s| s.state.is_terminal()) {
                break;
            }
            if !self.can_progress() {
                warn!(
                    waiting = %self.names_in(|s| !s.is_terminal()).join(", "),
                    "no stage can make progress; stopping"
                );
                break;
            }
            if cancel.wait(options.poll_interval) {
                cancelled = true;
                break;
            }
        }

        if cancelled {
            info!("pipeline run cancelled");
        }
        Ok(PipelineResult {
            stages: self
                .stages
                .iter()
                .map(|s| (s.spec.name.clone(), s.state.clone()))
                .collect(),
            cancelled,
        })
    }

    fn succeeded_names(&self) -> HashSet<&str> {
        self.stages
            .iter()
            .filter(|s| s.state == StageState::Succeeded)
            .map(|s| s.spec.name.as_str())
            .collect()
    }

    fn names_in(&self, pred: impl Fn(&StageState) -> bool) -> Vec<String> {
        self.stages
            .iter()
            .filter(|s| pred(&s.state))
            .map(|s| s.spec.name.clone())
            .collect()
    }

    fn submit_ready(&mut self) {
        let succeeded: HashSet<String> = self
            .succeeded_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        for stage in &mut self.stages {
            if stage.state == StageState::Waiting
                && stage.spec.depends_on.iter().all(|d| succeeded.contains(d))
            {
                stage.state = StageState::Pending;
            }
            if stage.state != StageState::Pending {
                continue;
            }
            match self.engine.submit(&stage.spec) {
                Ok(()) => {
                    info!(stage = %stage.spec.name, "stage submitted");
                    stage.state = StageState::Running;
                }
                Err(err) => {
                    error!(
                        stage = %stage.spec.name,
                        error = %format!("{err:#}"),
                        "stage submission failed"
                    );
                    stage.state = StageState::Failed(format!("submit failed: {err:#}"));
                }
            }
        }
    }

    fn poll(&mut self) {
        for stage in &mut self.stages {
            if stage.state != StageState::Running {
                continue;
            }
            match self.engine.status(&stage.spec.name) {
                Ok(status) => {
                    stage.distribute_progress = status.distribute_progress;
                    stage.aggregate_progress = status.aggregate_progress;
                    match status.state {
                        JobState::Running => {}
                        JobState::Succeeded => {
                            info!(stage = %stage.spec.name, "stage succeeded");
                            stage.state = StageState::Succeeded;
                        }
                        JobState::Failed(message) => {
                            error!(stage = %stage.spec.name, %message, "stage failed");
                            stage.state = StageState::Failed(message);
                        }
                    }
                }
                Err(err) => {
                    error!(
                        stage = %stage.spec.name,
                        error = %format!("{err:#}"),
                        "stage status unavailable"
                    );
                    stage.state = StageState::Failed(format!("status failed: {err:#}"));
                }
            }
        }
    }

    fn can_progress(&self) -> bool {
        let succeeded = self.succeeded_names();
        self.stages.iter().any(|s| match s.state {
            StageState::Running | StageState::Pending => true,
            StageState::Waiting => s.spec.depends_on.iter().all(|d| succeeded.contains(d.as_str())),
            StageState::Succeeded | StageState::Failed(_) => false,
        })
    }

    /// Snapshot of the current stage states.
    #[must_use]
    pub fn report(&self) -> StatusReport {
        StatusReport {
            timestamp: Local::now(),
            succeeded: self.names_in(|s| *s == StageState::Succeeded),
            failed: self.names_in(|s| matches!(s, StageState::Failed(_))),
            waiting: self.names_in(|s| matches!(s, StageState::Waiting | StageState::Pending)),
            running: self
                .stages
                .iter()
                .filter(|s| s.state == StageState::Running)
                .map(|s| RunningStage {
                    name: s.spec.name.clone(),
                    distribute_percent: percent(s.distribute_progress),
                    aggregate_percent: percent(s.aggregate_progress),
                })
                .collect(),
        }
    }

    /// Delete the outputs of every stage another stage depends on.
    ///
    /// Returns the deleted paths. Final outputs are left alone.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotFinished`] if any stage is not terminal, or
    /// [`PipelineError::Engine`] if a deletion fails.
    pub fn cleanup_intermediate_artifacts(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let pending = self.names_in(|s| !s.is_terminal());
        if !pending.is_empty() {
            return Err(PipelineError::NotFinished {
                pending: pending.join(", "),
            });
        }

        let needed: HashSet<&str> = self
            .stages
            .iter()
            .flat_map(|s| s.spec.depends_on.iter().map(String::as_str))
            .collect();
        let mut deleted = Vec::new();
        for stage in self.stages.iter().filter(|s| needed.contains(s.spec.name.as_str())) {
            self.engine.delete(&stage.spec.output)?;
            info!(
                stage = %stage.spec.name,
                path = %stage.spec.output.display(),
                "intermediate output removed"
            );
            deleted.push(stage.spec.output.clone());
        }
        Ok(deleted)
    }
}
