//! Error types shared across the crate.
//!
//! Line-level parse failures ([`ParseSkip`]) never escape a job: they are
//! reported to the diagnostics sink and counted. [`CodecError`] covers the
//! binary record format, and [`PipelineError`] covers orchestrator
//! misconfiguration, which is fatal before any stage is submitted.

use thiserror::Error;

/// Why a raw log line produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSkip {
    #[error("line has {found} columns, column {index} ({column}) is required")]
    MissingColumn {
        column: &'static str,
        index: usize,
        found: usize,
    },

    #[error("hit date {value:?} does not match the click-stream date format")]
    InvalidHitDate { value: String },

    #[error("required column {column} is blank")]
    BlankField { column: &'static str },

    #[error("line {line} of {file} is not valid UTF-8")]
    InvalidEncoding { file: String, line: usize },
}

/// Binary record encode/decode failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("record i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("record truncated while reading {field}")]
    Truncated { field: &'static str },

    #[error("string field {field} is {len} bytes, the limit is 65535")]
    StringTooLong { field: &'static str, len: usize },

    #[error("string field {field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("hit date {value:?} does not match the record date format")]
    InvalidDate { value: String },
}

/// Orchestrator configuration and lifecycle errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("duplicate stage definition: {name}")]
    DuplicateStage { name: String },

    #[error("stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency { stage: String, dependency: String },

    #[error("stage dependencies form a cycle through '{stage}'")]
    Cycle { stage: String },

    #[error("stages still pending: {pending}")]
    NotFinished { pending: String },

    #[error("execution engine error: {0}")]
    Engine(#[from] anyhow::Error),
}
