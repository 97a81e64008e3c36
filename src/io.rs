//! Stage input and output on the local filesystem.
//!
//! Inputs may name a single file, a directory, or a glob pattern. Directory
//! listings skip names starting with `_` or `.` so a previous stage's
//! `_SUCCESS` marker and hidden files are never read as data. Files ending in
//! `.gz` are decompressed transparently (feature `compression-gzip`).
//!
//! Outputs are directories of `part-r-NNNNN` files followed by an empty
//! `_SUCCESS` marker. An output directory must not exist before a job runs.

use crate::codec::{RecordCodec, RecordReader};
use crate::diagnostics::DiagnosticsSink;
use crate::error::ParseSkip;
use anyhow::{Context, Result, bail};
use glob::glob;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Name of the completion marker written after the last part file.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_') || n.starts_with('.'))
}

/// Expand a glob pattern into a sorted list of regular files.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or a matched entry cannot be
/// read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Resolve a stage input into the files to read, in sorted order.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed, or if nothing matches.
pub fn expand_input(input: &Path) -> Result<Vec<PathBuf>> {
    let files = if input.is_dir() {
        let mut files = Vec::new();
        for entry in fs::read_dir(input).with_context(|| format!("list {}", input.display()))? {
            let path = entry.with_context(|| format!("list {}", input.display()))?.path();
            if path.is_file() && !is_hidden(&path) {
                files.push(path);
            }
        }
        files.sort();
        files
    } else if input.is_file() {
        vec![input.to_path_buf()]
    } else {
        let pattern = input
            .to_str()
            .with_context(|| format!("input path is not valid UTF-8: {}", input.display()))?;
        expand_glob(pattern)?
    };

    if files.is_empty() {
        bail!("no input files found for {}", input.display());
    }
    Ok(files)
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Open one input file, decompressing `.gz` files.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, or if it is gzip and the
/// `compression-gzip` feature is disabled.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    if is_gzip(path) {
        #[cfg(feature = "compression-gzip")]
        {
            use flate2::read::MultiGzDecoder;
            return Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))));
        }
        #[cfg(not(feature = "compression-gzip"))]
        bail!(
            "{} is gzip-compressed but the compression-gzip feature is disabled",
            path.display()
        );
    }
    Ok(Box::new(BufReader::new(file)))
}

/// Lines read from a stage's input files.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputLines {
    pub lines: Vec<String>,
    /// Lines dropped because they were not valid UTF-8.
    pub undecodable: usize,
}

/// Read every line of every input file.
///
/// Trailing `\r\n` or `\n` is stripped. A line that is not valid UTF-8 is
/// warned to `sink` and counted in [`InputLines::undecodable`].
///
/// # Errors
///
/// Returns an error when a file cannot be opened or read.
pub fn read_lines(files: &[PathBuf], sink: &dyn DiagnosticsSink) -> Result<InputLines> {
    let mut out = InputLines::default();
    let mut buf = Vec::new();
    for path in files {
        let mut reader = open_input(path)?;
        let mut line_no = 0usize;
        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("read line {} in {}", line_no + 1, path.display()))?;
            if n == 0 {
                break;
            }
            line_no += 1;
            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }
            match String::from_utf8(std::mem::take(&mut buf)) {
                Ok(line) => out.lines.push(line),
                Err(err) => {
                    let reason = ParseSkip::InvalidEncoding {
                        file: path.display().to_string(),
                        line: line_no,
                    };
                    let text = String::from_utf8_lossy(err.as_bytes());
                    sink.warn(&format!("skipping log line: {text}"), Some(&reason));
                    out.undecodable += 1;
                }
            }
        }
    }
    Ok(out)
}

/// Decode every record stored in the input files.
///
/// # Errors
///
/// Returns an error if a file cannot be opened or holds a malformed record.
pub fn read_records<T: RecordCodec>(files: &[PathBuf]) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for path in files {
        for (idx, record) in RecordReader::<_, T>::new(open_input(path)?).enumerate() {
            let record = record
                .with_context(|| format!("decode record {} in {}", idx + 1, path.display()))?;
            records.push(record);
        }
    }
    Ok(records)
}

/// Create a fresh output directory.
///
/// # Errors
///
/// Returns an error if `dir` already exists or cannot be created.
pub fn create_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        bail!("output directory {} already exists", dir.display());
    }
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))
}

#[must_use]
pub fn part_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("part-r-{index:05}"))
}

/// Write already-encoded record bytes to part file `index`.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub fn write_encoded_part<'a>(
    dir: &Path,
    index: usize,
    chunks: impl IntoIterator<Item = &'a [u8]>,
) -> Result<u64> {
    let path = part_path(dir, index);
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let mut written = 0u64;
    for chunk in chunks {
        out.write_all(chunk)
            .with_context(|| format!("write {}", path.display()))?;
        written += chunk.len() as u64;
    }
    out.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(written)
}

/// Write one `Display` value per line to part file `index`.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub fn write_text_part<T: Display>(
    dir: &Path,
    index: usize,
    lines: impl IntoIterator<Item = T>,
) -> Result<usize> {
    let path = part_path(dir, index);
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let mut n = 0usize;
    for line in lines {
        writeln!(out, "{line}").with_context(|| format!("write {}", path.display()))?;
        n += 1;
    }
    out.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(n)
}

/// Write the empty `_SUCCESS` marker.
///
/// # Errors
///
/// Returns an error if the marker cannot be created.
pub fn mark_success(dir: &Path) -> Result<()> {
    let path = dir.join(SUCCESS_MARKER);
    File::create(&path).with_context(|| format!("create {}", path.display()))?;
    Ok(())
}

/// Remove a file or directory tree. A missing path is not an error.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_output(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path).with_context(|| format!("remove {}", path.display()))
    } else if path.exists() {
        fs::remove_file(path).with_context(|| format!("remove {}", path.display()))
    } else {
        Ok(())
    }
}
