//! Raw log line parsing.
//!
//! Two layouts are supported:
//!
//! - click-stream: tab-delimited analytics export, one page hit per line,
//!   parsed into a [`Visit`];
//! - access log: space-delimited web-server log, parsed into a
//!   [`ClientStatistic`] aggregation key.
//!
//! The `parse_*_line` functions overwrite a caller-owned record in place so a
//! worker can keep one scratch record for a whole partition. A line that
//! cannot produce a record returns [`ParseSkip`] after warning the
//! [`DiagnosticsSink`]; nothing panics and nothing propagates past the line.
//!
//! # Example
//!
//! ```
//! use logbeam::parse::AccessLogParser;
//!
//! let line = "2014-01-01 10:00:00 10.0.0.1 GET /index.html - 80 - 1.2.3.4 \
//!             Mozilla/5.0+(Windows+NT+6.1)+Chrome/31.0 http://ref/ 200 0 0 512 15";
//! let stat = AccessLogParser::default().parse(line)?;
//! assert_eq!(stat.browser, "Chrome");
//! assert_eq!(stat.referer, "http://ref/");
//! # Ok::<(), logbeam::ParseSkip>(())
//! ```

use crate::diagnostics::{DiagnosticsSink, TracingSink};
use crate::error::ParseSkip;
use crate::record::{ClientStatistic, Visit, replace};
use crate::user_agent::{PatternUserAgentParser, UserAgentInfo, UserAgentParser};
use crate::validate::{CLICK_STREAM_DATE_FORMAT, is_blank, parse_date, parse_float, parse_int};
use ordered_float::OrderedFloat;
use std::sync::Arc;

/// Column positions of the tab-delimited click-stream layout.
pub mod click_stream {
    pub const HIT_DATE: usize = 3;
    pub const IP_ADDRESS: usize = 8;
    pub const PAGE_URL: usize = 13;
    pub const PAGE_NAME: usize = 14;
    pub const SECTION: usize = 18;
    pub const CATEGORY: usize = 20;
    pub const YEAR: usize = 21;
    pub const POSTAL_CODE: usize = 29;
    pub const REGION: usize = 30;
    pub const COUNTY: usize = 31;
    pub const TRAFFIC_SOURCE: usize = 38;
    pub const SESSION_ID: usize = 58;
    pub const REFERER: usize = 69;
    pub const USER_AGENT: usize = 71;
    pub const VISIT_NUMBER: usize = 108;
    pub const PAGE_SEQUENCE: usize = 109;
    pub const GEO_CITY: usize = 111;
    pub const GEO_REGION: usize = 113;
}

/// Column positions of the space-delimited access-log layout.
pub mod access_log {
    pub const DATE: usize = 0;
    pub const TIME: usize = 1;
    pub const SERVER_IP: usize = 2;
    pub const METHOD: usize = 3;
    pub const URL: usize = 4;
    pub const QUERY: usize = 5;
    pub const PORT: usize = 6;
    pub const USERNAME: usize = 7;
    pub const CLIENT_IP: usize = 8;
    pub const USER_AGENT: usize = 9;
    pub const REFERER: usize = 10;
    pub const STATUS: usize = 11;
    pub const SUBSTATUS: usize = 12;
    pub const WIN32_STATUS: usize = 13;
    pub const BYTES: usize = 14;
    pub const TIME_TAKEN: usize = 15;
}

/// Collaborators shared by every parse call.
#[derive(Clone)]
pub struct ParseContext {
    pub sink: Arc<dyn DiagnosticsSink>,
    pub user_agents: Arc<dyn UserAgentParser>,
}

impl ParseContext {
    #[must_use]
    pub fn new(sink: Arc<dyn DiagnosticsSink>, user_agents: Arc<dyn UserAgentParser>) -> Self {
        Self { sink, user_agents }
    }
}

impl Default for ParseContext {
    /// Warnings go to `tracing`, user agents through the built-in pattern.
    fn default() -> Self {
        Self::new(Arc::new(TracingSink), Arc::new(PatternUserAgentParser))
    }
}

fn skip(ctx: &ParseContext, line: &str, reason: ParseSkip) -> ParseSkip {
    ctx.sink.warn(&format!("skipping log line: {line}"), Some(&reason));
    reason
}

/// Value after `intent=` up to the next `&`, or `None` when absent.
pub fn extract_intent(url: &str) -> Option<&str> {
    let start = url.find("intent=")? + "intent=".len();
    let rest = &url[start..];
    Some(rest.find('&').map_or(rest, |end| &rest[..end]))
}

fn required<'a>(
    cols: &[&'a str],
    index: usize,
    column: &'static str,
) -> Result<&'a str, ParseSkip> {
    cols.get(index).copied().ok_or(ParseSkip::MissingColumn {
        column,
        index,
        found: cols.len(),
    })
}

/// Parse one click-stream line into `visit`.
///
/// On success every field of `visit` has been overwritten. On a skip the
/// record's contents are unspecified and must not be emitted.
///
/// # Errors
///
/// Returns [`ParseSkip`] when the line is shorter than the page-sequence
/// column, the hit date does not parse, or the IP address, page URL or user
/// agent is blank.
pub fn parse_click_stream_line(
    line: &str,
    visit: &mut Visit,
    ctx: &ParseContext,
) -> Result<(), ParseSkip> {
    use click_stream as col;

    let cols: Vec<&str> = line.split('\t').collect();
    if let Err(reason) = required(&cols, col::PAGE_SEQUENCE, "page_sequence") {
        return Err(skip(ctx, line, reason));
    }

    let raw_date = cols[col::HIT_DATE];
    let Some(hit_date) = parse_date(CLICK_STREAM_DATE_FORMAT, raw_date, ctx.sink.as_ref()) else {
        let reason = ParseSkip::InvalidHitDate {
            value: raw_date.to_string(),
        };
        return Err(skip(ctx, line, reason));
    };
    for (index, column) in [
        (col::IP_ADDRESS, "ip_address"),
        (col::PAGE_URL, "page_url"),
        (col::USER_AGENT, "user_agent"),
    ] {
        if is_blank(cols[index]) {
            return Err(skip(ctx, line, ParseSkip::BlankField { column }));
        }
    }

    let page_url = cols[col::PAGE_URL].to_lowercase();
    let ua = ctx.user_agents.parse(cols[col::USER_AGENT]);

    let hit = &mut visit.hit;
    hit.hit_date = hit_date;
    replace(&mut hit.ip_address, cols[col::IP_ADDRESS]);
    replace(&mut hit.referer, cols[col::REFERER]);
    hit.browser = ua.browser_label();
    replace(&mut hit.page_name, cols[col::PAGE_NAME]);
    hit.page_sequence = parse_int(cols[col::PAGE_SEQUENCE], ctx.sink.as_ref()).unwrap_or(0);
    replace(&mut hit.session_id, cols[col::SESSION_ID]);
    replace(&mut hit.traffic_source, cols[col::TRAFFIC_SOURCE]);
    hit.visit_number = parse_int(cols[col::VISIT_NUMBER], ctx.sink.as_ref()).unwrap_or(0);

    replace(&mut visit.intent, extract_intent(&page_url).unwrap_or(""));
    visit.hit.page_url = page_url;
    replace(&mut visit.section, cols[col::SECTION]);

    if cols.len() > col::GEO_REGION {
        visit.location.assign(
            cols[col::POSTAL_CODE],
            cols[col::COUNTY],
            cols[col::REGION],
            cols[col::GEO_CITY],
            cols[col::GEO_REGION],
        );
    } else {
        visit.location.clear();
    }
    Ok(())
}

fn version(value: Option<&str>, ctx: &ParseContext) -> OrderedFloat<f32> {
    OrderedFloat(
        value
            .and_then(|v| parse_float(v, ctx.sink.as_ref()))
            .unwrap_or(0.0),
    )
}

/// Parse one access-log line into `stat`.
///
/// # Errors
///
/// Returns [`ParseSkip::MissingColumn`] when the line stops before the
/// referer column.
pub fn parse_access_log_line(
    line: &str,
    stat: &mut ClientStatistic,
    ctx: &ParseContext,
) -> Result<(), ParseSkip> {
    use access_log as col;

    let cols: Vec<&str> = line.split(' ').collect();
    if let Err(reason) = required(&cols, col::REFERER, "referer") {
        return Err(skip(ctx, line, reason));
    }

    stat.clear();
    replace(&mut stat.referer, cols[col::REFERER]);

    let user_agent = cols[col::USER_AGENT];
    if !is_blank(user_agent) {
        let UserAgentInfo {
            browser,
            browser_version,
            os,
            os_version,
        } = ctx.user_agents.parse(user_agent);
        stat.browser = browser.unwrap_or_default();
        stat.browser_version = version(browser_version.as_deref(), ctx);
        stat.os = os.unwrap_or_default();
        stat.os_version = version(os_version.as_deref(), ctx);
    }
    Ok(())
}

/// Allocating wrapper around [`parse_click_stream_line`].
#[derive(Clone, Default)]
pub struct ClickStreamParser {
    ctx: ParseContext,
}

impl ClickStreamParser {
    #[must_use]
    pub fn new(ctx: ParseContext) -> Self {
        Self { ctx }
    }

    /// # Errors
    ///
    /// See [`parse_click_stream_line`].
    pub fn parse(&self, line: &str) -> Result<Visit, ParseSkip> {
        let mut visit = Visit::default();
        parse_click_stream_line(line, &mut visit, &self.ctx)?;
        Ok(visit)
    }
}

/// Allocating wrapper around [`parse_access_log_line`].
#[derive(Clone, Default)]
pub struct AccessLogParser {
    ctx: ParseContext,
}

impl AccessLogParser {
    #[must_use]
    pub fn new(ctx: ParseContext) -> Self {
        Self { ctx }
    }

    /// # Errors
    ///
    /// See [`parse_access_log_line`].
    pub fn parse(&self, line: &str) -> Result<ClientStatistic, ParseSkip> {
        let mut stat = ClientStatistic::default();
        parse_access_log_line(line, &mut stat, &self.ctx)?;
        Ok(stat)
    }
}
