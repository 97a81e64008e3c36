//! Test support: a scripted execution engine and raw log line builders.
//!
//! ```
//! use logbeam::parse::{ClickStreamParser, click_stream};
//! use logbeam::testing::ClickStreamLine;
//!
//! let line = ClickStreamLine::new().with(click_stream::SESSION_ID, "s-42").build();
//! let visit = ClickStreamParser::default().parse(&line)?;
//! assert_eq!(visit.hit.session_id, "s-42");
//! # Ok::<(), logbeam::ParseSkip>(())
//! ```

use crate::engine::{ExecutionEngine, JobStatus};
use crate::orchestrator::StageSpec;
use crate::parse::{access_log, click_stream};
use anyhow::{Result, anyhow, bail};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Outcome {
    Succeed,
    Fail(String),
}

#[derive(Debug, Clone)]
struct Script {
    polls: usize,
    outcome: Outcome,
}

#[derive(Debug, Default)]
struct Record {
    submitted: Vec<String>,
    polls: HashMap<String, usize>,
    deleted: Vec<PathBuf>,
}

/// An [`ExecutionEngine`] whose jobs finish on a script.
///
/// A scripted stage reports `Running` until it has been polled the scripted
/// number of times, then its outcome. An unscripted stage runs forever.
/// Submissions and deletions are recorded, nothing touches the filesystem.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    scripts: HashMap<String, Script>,
    rejected: HashMap<String, String>,
    record: Mutex<Record>,
}

impl ScriptedEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `stage` succeeds on its `polls`-th status poll.
    #[must_use]
    pub fn succeed_after(mut self, stage: &str, polls: usize) -> Self {
        self.scripts.insert(
            stage.to_string(),
            Script {
                polls,
                outcome: Outcome::Succeed,
            },
        );
        self
    }

    /// `stage` fails with `message` on its `polls`-th status poll.
    #[must_use]
    pub fn fail_after(mut self, stage: &str, polls: usize, message: &str) -> Self {
        self.scripts.insert(
            stage.to_string(),
            Script {
                polls,
                outcome: Outcome::Fail(message.to_string()),
            },
        );
        self
    }

    /// Submitting `stage` returns an error.
    #[must_use]
    pub fn reject_submit(mut self, stage: &str, message: &str) -> Self {
        self.rejected.insert(stage.to_string(), message.to_string());
        self
    }

    fn record(&self) -> Result<MutexGuard<'_, Record>> {
        self.record.lock().map_err(|_| anyhow!("scripted engine poisoned"))
    }

    /// Stage names in submission order.
    pub fn submitted(&self) -> Vec<String> {
        self.record().map(|r| r.submitted.clone()).unwrap_or_default()
    }

    /// Paths passed to [`ExecutionEngine::delete`], in call order.
    pub fn deleted(&self) -> Vec<PathBuf> {
        self.record().map(|r| r.deleted.clone()).unwrap_or_default()
    }

    pub fn polls(&self, stage: &str) -> usize {
        self.record()
            .map(|r| r.polls.get(stage).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl ExecutionEngine for ScriptedEngine {
    fn submit(&self, stage: &StageSpec) -> Result<()> {
        if let Some(message) = self.rejected.get(&stage.name) {
            bail!("{message}");
        }
        self.record()?.submitted.push(stage.name.clone());
        Ok(())
    }

    fn status(&self, stage: &str) -> Result<JobStatus> {
        let mut record = self.record()?;
        if !record.submitted.iter().any(|s| s == stage) {
            bail!("stage '{stage}' was never submitted");
        }
        let polls = record.polls.entry(stage.to_string()).or_insert(0);
        *polls += 1;

        let Some(script) = self.scripts.get(stage) else {
            return Ok(JobStatus::running(0.0, 0.0));
        };
        if *polls < script.polls {
            return Ok(JobStatus::running(*polls as f32 / script.polls as f32, 0.0));
        }
        Ok(match &script.outcome {
            Outcome::Succeed => JobStatus::succeeded(),
            Outcome::Fail(message) => JobStatus::failed(message.clone()),
        })
    }

    fn delete(&self, path: &Path) -> Result<()> {
        self.record()?.deleted.push(path.to_path_buf());
        Ok(())
    }
}

/// Builds a tab-delimited click-stream line.
///
/// Starts from a valid 114-column line: hit date `2014-01-01 10:00:00`,
/// IP `1.2.3.4`, page URL `http://x/?intent=buy&x=1`, a Chrome user agent,
/// session `s-1`, page sequence 1 and visit number 1.
#[derive(Debug, Clone)]
pub struct ClickStreamLine {
    columns: Vec<String>,
}

pub const CLICK_STREAM_COLUMNS: usize = click_stream::GEO_REGION + 1;

pub const CHROME_USER_AGENT: &str =
    "Mozilla/5.0+(Windows+NT+6.1;+WOW64)+AppleWebKit/537.36+(KHTML,+like+Gecko)+Chrome/31.0.1650.63+Safari/537.36";

impl ClickStreamLine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: vec![String::new(); CLICK_STREAM_COLUMNS],
        }
        .with(click_stream::HIT_DATE, "2014-01-01 10:00:00")
        .with(click_stream::IP_ADDRESS, "1.2.3.4")
        .with(click_stream::PAGE_URL, "http://x/?intent=buy&x=1")
        .with(click_stream::USER_AGENT, CHROME_USER_AGENT)
        .with(click_stream::SESSION_ID, "s-1")
        .with(click_stream::PAGE_SEQUENCE, "1")
        .with(click_stream::VISIT_NUMBER, "1")
    }

    /// Set column `index`, growing the line if needed.
    #[must_use]
    pub fn with(mut self, index: usize, value: &str) -> Self {
        if self.columns.len() <= index {
            self.columns.resize(index + 1, String::new());
        }
        self.columns[index] = value.to_string();
        self
    }

    /// Keep only the first `columns` columns.
    #[must_use]
    pub fn truncate(mut self, columns: usize) -> Self {
        self.columns.truncate(columns);
        self
    }

    #[must_use]
    pub fn build(&self) -> String {
        self.columns.join("\t")
    }
}

impl Default for ClickStreamLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a space-delimited access-log line.
///
/// Starts from a 16-column line with a Chrome-on-Windows user agent and
/// referer `http://example.com/`.
#[derive(Debug, Clone)]
pub struct AccessLogLine {
    columns: Vec<String>,
}

impl AccessLogLine {
    #[must_use]
    pub fn new() -> Self {
        let columns = [
            "2014-01-01",
            "10:00:00",
            "10.0.0.1",
            "GET",
            "/index.html",
            "-",
            "80",
            "-",
            "1.2.3.4",
            CHROME_USER_AGENT,
            "http://example.com/",
            "200",
            "0",
            "0",
            "5120",
            "15",
        ];
        debug_assert_eq!(columns.len(), access_log::TIME_TAKEN + 1);
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn with(mut self, index: usize, value: &str) -> Self {
        if self.columns.len() <= index {
            self.columns.resize(index + 1, String::new());
        }
        self.columns[index] = value.to_string();
        self
    }

    #[must_use]
    pub fn truncate(mut self, columns: usize) -> Self {
        self.columns.truncate(columns);
        self
    }

    #[must_use]
    pub fn build(&self) -> String {
        self.columns.join(" ")
    }
}

impl Default for AccessLogLine {
    fn default() -> Self {
        Self::new()
    }
}
