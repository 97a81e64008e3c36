//! The canonical stage graphs.
//!
//! | pipeline        | stages                                            |
//! |-----------------|---------------------------------------------------|
//! | `clickstream`   | `ClickStream` → `VisitorPathing`                  |
//! | `client-stats`  | `ClientStatistics`                                |
//! | `visit-to-text` | `VisitToText`                                     |
//!
//! Each stage writes to `<output>/<stage name>`. `ClickStream` is an
//! intermediate stage: its binary visits are removed by cleanup.

use crate::config::PipelineConfig;
use crate::engine::{ExecutionEngine, JobKind, LocalEngine};
use crate::orchestrator::{CancellationToken, Orchestrator, PipelineResult};
use crate::parse::ParseContext;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CLICK_STREAM: &str = "ClickStream";
pub const VISITOR_PATHING: &str = "VisitorPathing";
pub const VISIT_TO_TEXT: &str = "VisitToText";
pub const CLIENT_STATISTICS: &str = "ClientStatistics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    ClickStream,
    ClientStats,
    VisitToText,
}

/// One stage of a canonical pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStage {
    pub name: &'static str,
    pub job: JobKind,
    pub input: PathBuf,
    pub output: PathBuf,
    pub depends_on: &'static [&'static str],
}

impl PipelineKind {
    #[must_use]
    pub fn plan(self, input: &Path, output: &Path) -> Vec<PlannedStage> {
        match self {
            Self::ClickStream => vec![
                PlannedStage {
                    name: CLICK_STREAM,
                    job: JobKind::ParseClickStream,
                    input: input.to_path_buf(),
                    output: output.join(CLICK_STREAM),
                    depends_on: &[],
                },
                PlannedStage {
                    name: VISITOR_PATHING,
                    job: JobKind::VisitorPathing,
                    input: output.join(CLICK_STREAM),
                    output: output.join(VISITOR_PATHING),
                    depends_on: &[CLICK_STREAM],
                },
            ],
            Self::ClientStats => vec![PlannedStage {
                name: CLIENT_STATISTICS,
                job: JobKind::ClientStatistics,
                input: input.to_path_buf(),
                output: output.join(CLIENT_STATISTICS),
                depends_on: &[],
            }],
            Self::VisitToText => vec![PlannedStage {
                name: VISIT_TO_TEXT,
                job: JobKind::VisitToText,
                input: input.to_path_buf(),
                output: output.join(VISIT_TO_TEXT),
                depends_on: &[],
            }],
        }
    }

    /// Bind every stage name of this pipeline to its job.
    pub fn register(self, engine: &mut LocalEngine) {
        for stage in self.plan(Path::new(""), Path::new("")) {
            engine.register(stage.name, stage.job);
        }
    }

    /// An orchestrator holding this pipeline's stages.
    pub fn orchestrator<E: ExecutionEngine>(
        self,
        engine: E,
        input: &Path,
        output: &Path,
    ) -> Orchestrator<E> {
        let mut orch = Orchestrator::new(engine);
        for stage in self.plan(input, output) {
            orch.add_stage(stage.name, &stage.input, &stage.output, stage.depends_on);
        }
        orch
    }
}

/// Outcome of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub result: PipelineResult,
    /// Intermediate outputs removed after the run.
    pub cleaned: Vec<PathBuf>,
}

/// Run a canonical pipeline on a [`LocalEngine`].
///
/// Intermediate outputs are removed only when `config.cleanup` is set and
/// every stage succeeded.
///
/// # Errors
///
/// Returns an error if the engine cannot start, the stage graph is invalid,
/// or cleanup fails. Stage failures are reported in the result instead.
pub fn run_pipeline(
    kind: PipelineKind,
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
    parse: ParseContext,
    cancel: &CancellationToken,
) -> Result<PipelineRun> {
    let mut engine = LocalEngine::new(config.engine.clone())?.with_parse_context(parse);
    kind.register(&mut engine);

    let mut orch = kind.orchestrator(&engine, input, output);
    let result = orch.run(&config.run_options(), cancel)?;

    let cleaned = if config.cleanup && result.is_success() {
        orch.cleanup_intermediate_artifacts()?
    } else {
        Vec::new()
    };
    info!(
        succeeded = result.succeeded().len(),
        failed = result.failed().len(),
        cancelled = result.cancelled,
        "pipeline finished"
    );
    Ok(PipelineRun { result, cleaned })
}
