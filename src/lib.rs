//! # logbeam
//!
//! Batch processing of web-traffic logs: tolerant parsing of raw log lines
//! into typed records, a canonical binary record encoding, and a staged
//! pipeline orchestrator that runs dependent jobs on an execution engine.
//!
//! ## Key Features
//!
//! - **Tolerant parsing** - malformed or truncated lines are skipped and
//!   reported, never fatal to a batch
//! - **Two log layouts** - tab-delimited analytics click-stream exports and
//!   space-delimited web-server access logs
//! - **Binary records** - [`Location`], [`PageHit`], [`Visit`] and
//!   [`ClientStatistic`] with a fixed big-endian layout, total ordering and
//!   tab-joined text rendering
//! - **Staged orchestration** - a DAG of named stages, polled to completion
//!   with progress reports, cancellation and intermediate cleanup
//! - **Local engine** - runs the built-in jobs on a rayon pool, so pipelines
//!   work end-to-end without a cluster
//!
//! ## Quick Start
//!
//! ```no_run
//! use logbeam::config::PipelineConfig;
//! use logbeam::orchestrator::CancellationToken;
//! use logbeam::parse::ParseContext;
//! use logbeam::pipelines::{PipelineKind, run_pipeline};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PipelineConfig::default();
//! let run = run_pipeline(
//!     PipelineKind::ClickStream,
//!     Path::new("logs/clickstream/*.tsv.gz"),
//!     Path::new("out"),
//!     &config,
//!     ParseContext::default(),
//!     &CancellationToken::new(),
//! )?;
//! assert!(run.result.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Records and parsing
//!
//! The [`parse`] functions overwrite a caller-owned record in place, so each
//! worker parses a whole partition through one scratch record. A line that
//! cannot produce a record yields a [`ParseSkip`] and a warning on the
//! [`DiagnosticsSink`](diagnostics::DiagnosticsSink).
//!
//! ### Stages and engines
//!
//! An [`Orchestrator`] decides when a stage may run; an
//! [`ExecutionEngine`] runs it. Swap [`LocalEngine`] for
//! [`testing::ScriptedEngine`] to exercise orchestration without I/O.
//!
//! ## Feature Flags
//!
//! - `compression-gzip` (default) - read `.gz` inputs
//! - `ua-woothee` (default) - [`user_agent::WootheeUserAgentParser`]

pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod io;
pub mod orchestrator;
pub mod parse;
pub mod pipelines;
pub mod record;
pub mod testing;
pub mod user_agent;
pub mod validate;

pub use codec::RecordCodec;
pub use config::{EngineConfig, PipelineConfig};
pub use engine::{ExecutionEngine, JobKind, JobState, JobStatus, LocalEngine};
pub use error::{CodecError, ParseSkip, PipelineError};
pub use orchestrator::{
    CancellationToken, Orchestrator, PipelineResult, RunOptions, StageSpec, StageState,
    StatusReport,
};
pub use parse::{ParseContext, parse_access_log_line, parse_click_stream_line};
pub use record::{ClientStatistic, Location, PageHit, Visit};
