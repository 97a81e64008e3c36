//! Diagnostics sink and logging setup.
//!
//! Parsers and validators never log through a global; they take a
//! [`DiagnosticsSink`]. Production code uses [`TracingSink`], tests capture
//! warnings with [`MemorySink`].

use std::error::Error;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt};

/// Receives non-fatal warnings from record parsing.
pub trait DiagnosticsSink: Send + Sync {
    fn warn(&self, message: &str, cause: Option<&(dyn Error + 'static)>);
}

/// Forwards warnings to `tracing` at WARN level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn warn(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        match cause {
            Some(err) => tracing::warn!(error = %err, "{message}"),
            None => tracing::warn!("{message}"),
        }
    }
}

/// A captured warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub cause: Option<String>,
}

/// Keeps every warning in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    warnings: Mutex<Vec<Warning>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the warnings received so far.
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.warnings.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for MemorySink {
    fn warn(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        if let Ok(mut w) = self.warnings.lock() {
            w.push(Warning {
                message: message.to_string(),
                cause: cause.map(ToString::to_string),
            });
        }
    }
}

/// Install the global `tracing` subscriber.
///
/// Filtering comes from `RUST_LOG` (default `info`). Output goes to stderr so
/// stdout stays free for pipeline status reports.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
