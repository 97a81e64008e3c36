use super::jobs::{JobContext, JobKind, JobSummary, Progress};
use super::{ExecutionEngine, JobStatus};
use crate::config::EngineConfig;
use crate::io::remove_output;
use crate::orchestrator::StageSpec;
use crate::parse::ParseContext;
use anyhow::{Context, Result, anyhow, bail};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

#[derive(Default)]
struct JobHandle {
    progress: Progress,
    outcome: Mutex<Option<Result<JobSummary, String>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl JobHandle {
    fn thread_finished(&self) -> bool {
        self.thread
            .lock()
            .map(|t| t.as_ref().is_none_or(JoinHandle::is_finished))
            .unwrap_or(true)
    }
}

/// Runs registered jobs in this process.
///
/// Each submitted stage gets its own thread; the per-record work of every
/// stage shares one rayon pool sized by [`EngineConfig::workers`].
pub struct LocalEngine {
    config: EngineConfig,
    pool: Arc<ThreadPool>,
    parse: ParseContext,
    kinds: HashMap<String, JobKind>,
    jobs: Mutex<HashMap<String, Arc<JobHandle>>>,
}

impl LocalEngine {
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be built.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("logbeam-worker-{i}"))
            .build()
            .context("build worker pool")?;
        Ok(Self {
            config,
            pool: Arc::new(pool),
            parse: ParseContext::default(),
            kinds: HashMap::new(),
            jobs: Mutex::new(HashMap::new()),
        })
    }

    /// Replace the parse collaborators (diagnostics sink, user-agent parser).
    #[must_use]
    pub fn with_parse_context(mut self, parse: ParseContext) -> Self {
        self.parse = parse;
        self
    }

    /// Bind a stage name to the job it runs.
    pub fn register(&mut self, stage: impl Into<String>, kind: JobKind) -> &mut Self {
        self.kinds.insert(stage.into(), kind);
        self
    }

    fn handle(&self, stage: &str) -> Result<Arc<JobHandle>> {
        let jobs = self.jobs.lock().map_err(|_| anyhow!("job table poisoned"))?;
        jobs.get(stage)
            .cloned()
            .with_context(|| format!("stage '{stage}' was never submitted"))
    }
}

fn run_job(
    kind: JobKind,
    spec: &StageSpec,
    config: &EngineConfig,
    pool: &ThreadPool,
    parse: &ParseContext,
    handle: &JobHandle,
) {
    let cx = JobContext {
        spec,
        config,
        pool,
        progress: &handle.progress,
        parse,
    };
    let outcome = match kind.run(&cx) {
        Ok(summary) => {
            info!(
                stage = %spec.name,
                input = summary.input_records,
                output = summary.output_records,
                skipped = summary.skipped,
                "job finished"
            );
            Ok(summary)
        }
        Err(err) => {
            error!(stage = %spec.name, error = %format!("{err:#}"), "job failed");
            Err(format!("{err:#}"))
        }
    };
    if let Ok(mut slot) = handle.outcome.lock() {
        *slot = Some(outcome);
    }
}

impl ExecutionEngine for LocalEngine {
    fn submit(&self, stage: &StageSpec) -> Result<()> {
        let Some(&kind) = self.kinds.get(&stage.name) else {
            bail!("no job registered for stage '{}'", stage.name);
        };
        let mut jobs = self.jobs.lock().map_err(|_| anyhow!("job table poisoned"))?;
        if jobs.get(&stage.name).is_some_and(|h| !h.thread_finished()) {
            bail!("stage '{}' is already running", stage.name);
        }

        let handle = Arc::new(JobHandle::default());
        let spec = stage.clone();
        let config = self.config.clone();
        let pool = Arc::clone(&self.pool);
        let parse = self.parse.clone();
        let job = Arc::clone(&handle);
        let thread = thread::Builder::new()
            .name(format!("stage-{}", stage.name))
            .spawn(move || run_job(kind, &spec, &config, &pool, &parse, &job))
            .with_context(|| format!("spawn thread for stage '{}'", stage.name))?;

        if let Ok(mut slot) = handle.thread.lock() {
            *slot = Some(thread);
        }
        jobs.insert(stage.name.clone(), handle);
        Ok(())
    }

    fn status(&self, stage: &str) -> Result<JobStatus> {
        let handle = self.handle(stage)?;
        // Read before the outcome: a finished thread has always stored one.
        let finished = handle.thread_finished();
        let outcome = handle
            .outcome
            .lock()
            .map_err(|_| anyhow!("outcome of stage '{stage}' poisoned"))?
            .clone();
        Ok(match outcome {
            Some(Ok(_)) => JobStatus::succeeded(),
            Some(Err(message)) => JobStatus::failed(message),
            None if finished => JobStatus::failed("job thread exited without a result"),
            None => JobStatus::running(handle.progress.distribute(), handle.progress.aggregate()),
        })
    }

    fn delete(&self, path: &Path) -> Result<()> {
        remove_output(path)
    }
}
