//! Scalar field validation and tolerant parsing.
//!
//! Format checks ([`validate_postal_code`], [`validate_region_code`]) are
//! silent: a rejected value is simply not applied by the caller. The
//! `parse_*` helpers return `None` instead of failing; a value that is present
//! but malformed is reported to the [`DiagnosticsSink`], an empty one is not.
//!
//! # Example
//!
//! ```
//! use logbeam::diagnostics::MemorySink;
//! use logbeam::validate::{parse_int, validate_region_code};
//!
//! let sink = MemorySink::new();
//! assert!(validate_region_code("ca"));
//! assert_eq!(parse_int("42", &sink), Some(42));
//! assert_eq!(parse_int("4x2", &sink), None);
//! assert_eq!(sink.len(), 1);
//! ```

use crate::diagnostics::DiagnosticsSink;
use chrono::NaiveDateTime;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

/// Date layout of the click-stream hit-date column (`yyyy-MM-dd HH:mm:ss`).
pub const CLICK_STREAM_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,5}$").expect("postal code pattern"));
static REGION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z]{2}$").expect("region code pattern"));

/// One to five ASCII digits.
pub fn validate_postal_code(value: &str) -> bool {
    POSTAL_CODE.is_match(value)
}

/// Exactly two letters, either case.
pub fn validate_region_code(value: &str) -> bool {
    REGION_CODE.is_match(value)
}

/// Empty or whitespace only.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Parse `value` with a chrono strftime `format`.
///
/// Returns `None` for an empty value or format, and for a value that does not
/// match (the mismatch is warned to `sink`).
pub fn parse_date(format: &str, value: &str, sink: &dyn DiagnosticsSink) -> Option<NaiveDateTime> {
    if format.is_empty() || value.is_empty() {
        return None;
    }
    match NaiveDateTime::parse_from_str(value, format) {
        Ok(date) => Some(date),
        Err(err) => {
            sink.warn(
                &format!("failed to parse date ({format}) from: {value}"),
                Some(&err),
            );
            None
        }
    }
}

pub fn parse_int(value: &str, sink: &dyn DiagnosticsSink) -> Option<i32> {
    parse_number(value, "int", sink)
}

pub fn parse_float(value: &str, sink: &dyn DiagnosticsSink) -> Option<f32> {
    parse_number(value, "float", sink)
}

pub fn parse_double(value: &str, sink: &dyn DiagnosticsSink) -> Option<f64> {
    parse_number(value, "double", sink)
}

fn parse_number<T>(value: &str, kind: &str, sink: &dyn DiagnosticsSink) -> Option<T>
where
    T: FromStr,
    T::Err: std::error::Error + 'static,
{
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(v) => Some(v),
        Err(err) => {
            sink.warn(&format!("failed to parse {kind} from: {value}"), Some(&err));
            None
        }
    }
}
