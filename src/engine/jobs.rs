//! The concrete jobs the local engine knows how to run.
//!
//! Every job has a distribute half (per-record work over input chunks) and an
//! aggregate half (one task per output part file). Both halves run on the
//! engine's rayon pool and advance a shared [`Progress`].

use crate::codec::RecordCodec;
use crate::config::EngineConfig;
use crate::io::{
    create_output_dir, expand_input, mark_success, read_lines, read_records, write_encoded_part,
    write_text_part,
};
use crate::orchestrator::StageSpec;
use crate::parse::{ParseContext, parse_access_log_line, parse_click_stream_line};
use crate::record::{ClientStatistic, Visit};
use anyhow::{Context, Result};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Which transformation a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Click-stream text lines to binary [`Visit`] part files.
    ParseClickStream,
    /// Binary visits to text, sorted by session id and page sequence.
    VisitorPathing,
    /// Binary visits to text, in input order within each part.
    VisitToText,
    /// Access-log lines to `"<statistic>\t<count>"` text.
    ClientStatistics,
}

/// Completed units of each half of a running job.
#[derive(Debug, Default)]
pub struct Progress {
    distribute_total: AtomicUsize,
    distribute_done: AtomicUsize,
    aggregate_total: AtomicUsize,
    aggregate_done: AtomicUsize,
}

fn fraction(done: &AtomicUsize, total: &AtomicUsize) -> f32 {
    let total = total.load(Ordering::Relaxed);
    if total == 0 {
        return 0.0;
    }
    done.load(Ordering::Relaxed) as f32 / total as f32
}

impl Progress {
    fn begin_distribute(&self, units: usize) {
        self.distribute_total.store(units, Ordering::Relaxed);
    }

    fn distribute_step(&self) {
        self.distribute_done.fetch_add(1, Ordering::Relaxed);
    }

    fn begin_aggregate(&self, units: usize) {
        self.aggregate_total.store(units, Ordering::Relaxed);
    }

    fn aggregate_step(&self) {
        self.aggregate_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn distribute(&self) -> f32 {
        fraction(&self.distribute_done, &self.distribute_total)
    }

    pub fn aggregate(&self) -> f32 {
        fraction(&self.aggregate_done, &self.aggregate_total)
    }
}

/// Record counts reported when a job finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub input_records: usize,
    pub output_records: usize,
    pub skipped: usize,
}

/// Everything a job needs while it runs.
pub struct JobContext<'a> {
    pub spec: &'a StageSpec,
    pub config: &'a EngineConfig,
    pub pool: &'a ThreadPool,
    pub progress: &'a Progress,
    pub parse: &'a ParseContext,
}

impl JobContext<'_> {
    fn parts(&self) -> usize {
        self.config.aggregate_tasks.max(1)
    }

    fn chunk_len(&self, total: usize) -> usize {
        total.div_ceil(self.config.distribute_units.max(1)).max(1)
    }
}

impl JobKind {
    /// Run the job to completion on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read, the output directory
    /// already exists, or a part file cannot be written.
    pub fn run(self, cx: &JobContext<'_>) -> Result<JobSummary> {
        let summary = match self {
            Self::ParseClickStream => parse_click_stream(cx),
            Self::VisitorPathing => visits_to_text(cx, true),
            Self::VisitToText => visits_to_text(cx, false),
            Self::ClientStatistics => client_statistics(cx),
        }?;
        mark_success(&cx.spec.output)?;
        Ok(summary)
    }
}

fn bucket_of<K: Hash + ?Sized>(key: &K, buckets: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % buckets as u64) as usize
}

fn partition<T>(items: Vec<T>, buckets: usize, bucket: impl Fn(&T) -> usize) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = (0..buckets).map(|_| Vec::new()).collect();
    for item in items {
        let b = bucket(&item);
        out[b].push(item);
    }
    out
}

/// Text lines to binary visits, hash-partitioned by session id.
///
/// Each worker parses into its own scratch visit and encodes straight into
/// per-partition byte buffers.
fn parse_click_stream(cx: &JobContext<'_>) -> Result<JobSummary> {
    let files = expand_input(&cx.spec.input)?;
    create_output_dir(&cx.spec.output)?;
    let input = read_lines(&files, cx.parse.sink.as_ref())?;
    let lines = input.lines;
    let parts = cx.parts();
    let chunk = cx.chunk_len(lines.len());
    cx.progress.begin_distribute(lines.len().div_ceil(chunk));

    let skipped = AtomicUsize::new(input.undecodable);
    let emitted = AtomicUsize::new(0);
    let chunks: Vec<Vec<Vec<u8>>> = cx.pool.install(|| {
        lines
            .par_chunks(chunk)
            .map_init(Visit::default, |scratch, lines| -> Result<Vec<Vec<u8>>> {
                let mut buffers = vec![Vec::new(); parts];
                for line in lines {
                    if parse_click_stream_line(line, scratch, cx.parse).is_err() {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    let b = bucket_of(scratch.hit.session_id.as_str(), parts);
                    scratch
                        .encode(&mut buffers[b])
                        .with_context(|| {
                            format!("encode visit for session {}", scratch.hit.session_id)
                        })?;
                    emitted.fetch_add(1, Ordering::Relaxed);
                }
                cx.progress.distribute_step();
                Ok(buffers)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    cx.progress.begin_aggregate(parts);
    cx.pool.install(|| {
        (0..parts).into_par_iter().try_for_each(|p| -> Result<()> {
            write_encoded_part(&cx.spec.output, p, chunks.iter().map(|c| c[p].as_slice()))?;
            cx.progress.aggregate_step();
            Ok(())
        })
    })?;

    Ok(JobSummary {
        input_records: lines.len() + input.undecodable,
        output_records: emitted.into_inner(),
        skipped: skipped.into_inner(),
    })
}

/// Binary visits to text part files, partitioned by session id.
fn visits_to_text(cx: &JobContext<'_>, sorted: bool) -> Result<JobSummary> {
    let files = expand_input(&cx.spec.input)?;
    create_output_dir(&cx.spec.output)?;
    cx.progress.begin_distribute(files.len());

    let per_file: Vec<Vec<Visit>> = cx.pool.install(|| {
        files
            .par_iter()
            .map(|file: &PathBuf| {
                let visits = read_records::<Visit>(slice::from_ref(file));
                cx.progress.distribute_step();
                visits
            })
            .collect::<Result<Vec<_>>>()
    })?;
    let visits: Vec<Visit> = per_file.into_iter().flatten().collect();
    let total = visits.len();

    let parts = cx.parts();
    let buckets = partition(visits, parts, |v| bucket_of(v.hit.session_id.as_str(), parts));
    cx.progress.begin_aggregate(parts);
    cx.pool.install(|| {
        buckets
            .into_par_iter()
            .enumerate()
            .try_for_each(|(p, mut bucket)| -> Result<()> {
                if sorted {
                    bucket.sort();
                }
                write_text_part(&cx.spec.output, p, &bucket)?;
                cx.progress.aggregate_step();
                Ok(())
            })
    })?;

    Ok(JobSummary {
        input_records: total,
        output_records: total,
        skipped: 0,
    })
}

fn merge_counts(
    mut into: HashMap<ClientStatistic, u64>,
    from: HashMap<ClientStatistic, u64>,
) -> HashMap<ClientStatistic, u64> {
    if into.len() < from.len() {
        return merge_counts(from, into);
    }
    for (key, count) in from {
        *into.entry(key).or_insert(0) += count;
    }
    into
}

/// Access-log lines to per-statistic counts, sorted within each part.
fn client_statistics(cx: &JobContext<'_>) -> Result<JobSummary> {
    let files = expand_input(&cx.spec.input)?;
    create_output_dir(&cx.spec.output)?;
    let input = read_lines(&files, cx.parse.sink.as_ref())?;
    let lines = input.lines;
    let chunk = cx.chunk_len(lines.len());
    cx.progress.begin_distribute(lines.len().div_ceil(chunk));

    let skipped = AtomicUsize::new(input.undecodable);
    let counts = cx.pool.install(|| {
        lines
            .par_chunks(chunk)
            .map_init(ClientStatistic::default, |scratch, lines| {
                let mut local: HashMap<ClientStatistic, u64> = HashMap::new();
                for line in lines {
                    if parse_access_log_line(line, scratch, cx.parse).is_err() {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    if let Some(count) = local.get_mut(&*scratch) {
                        *count += 1;
                    } else {
                        local.insert(scratch.clone(), 1);
                    }
                }
                cx.progress.distribute_step();
                local
            })
            .reduce(HashMap::new, merge_counts)
    });

    let keys = counts.len();
    let parts = cx.parts();
    let entries: Vec<(ClientStatistic, u64)> = counts.into_iter().collect();
    let buckets = partition(entries, parts, |(stat, _)| bucket_of(stat, parts));
    cx.progress.begin_aggregate(parts);
    cx.pool.install(|| {
        buckets
            .into_par_iter()
            .enumerate()
            .try_for_each(|(p, mut bucket)| -> Result<()> {
                bucket.sort();
                write_text_part(
                    &cx.spec.output,
                    p,
                    bucket.iter().map(|(stat, count)| format!("{stat}\t{count}")),
                )?;
                cx.progress.aggregate_step();
                Ok(())
            })
    })?;

    Ok(JobSummary {
        input_records: lines.len() + input.undecodable,
        output_records: keys,
        skipped: skipped.into_inner(),
    })
}
