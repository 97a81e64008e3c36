//! Tests for click-stream and access-log line parsing.

use chrono::NaiveDate;
use logbeam::diagnostics::MemorySink;
use logbeam::error::ParseSkip;
use logbeam::parse::{
    ParseContext, access_log, click_stream, extract_intent, parse_access_log_line,
    parse_click_stream_line,
};
use logbeam::record::{ClientStatistic, Location, PageHit, Visit};
use logbeam::testing::{AccessLogLine, CHROME_USER_AGENT, ClickStreamLine};
use logbeam::user_agent::PatternUserAgentParser;
use ordered_float::OrderedFloat;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn capture() -> (Arc<MemorySink>, ParseContext) {
    let sink = Arc::new(MemorySink::new());
    let ctx = ParseContext::new(sink.clone(), Arc::new(PatternUserAgentParser));
    (sink, ctx)
}

#[test]
fn test_full_click_stream_line() {
    let (sink, ctx) = capture();
    let line = ClickStreamLine::new()
        .with(click_stream::PAGE_URL, "http://X/?Intent=Buy&x=1")
        .with(click_stream::PAGE_NAME, "home")
        .with(click_stream::SECTION, "shop")
        .with(click_stream::POSTAL_CODE, "10001")
        .with(click_stream::REGION, "ny")
        .with(click_stream::COUNTY, "New York")
        .with(click_stream::TRAFFIC_SOURCE, "search")
        .with(click_stream::SESSION_ID, "abc")
        .with(click_stream::REFERER, "http://ref/")
        .with(click_stream::VISIT_NUMBER, "3")
        .with(click_stream::PAGE_SEQUENCE, "7")
        .with(click_stream::GEO_CITY, "Brooklyn")
        .with(click_stream::GEO_REGION, "NY")
        .build();
    assert_eq!(line.split('\t').count(), 114);

    let mut visit = Visit::default();
    parse_click_stream_line(&line, &mut visit, &ctx).unwrap();

    let expected = Visit {
        hit: PageHit {
            hit_date: NaiveDate::from_ymd_opt(2014, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            page_url: "http://x/?intent=buy&x=1".to_string(),
            referer: "http://ref/".to_string(),
            ip_address: "1.2.3.4".to_string(),
            browser: "Chrome 31.0".to_string(),
            page_name: "home".to_string(),
            page_sequence: 7,
            session_id: "abc".to_string(),
            traffic_source: "search".to_string(),
            visit_number: 3,
        },
        intent: "buy".to_string(),
        section: "shop".to_string(),
        location: Location::new("10001", "New York", "ny", "Brooklyn", "NY"),
    };
    assert_eq!(visit, expected);
    assert!(sink.is_empty());
}

#[test]
fn test_default_line_extracts_buy_intent() {
    let (_sink, ctx) = capture();
    let mut visit = Visit::default();
    parse_click_stream_line(&ClickStreamLine::new().build(), &mut visit, &ctx).unwrap();
    assert_eq!(visit.hit.page_url, "http://x/?intent=buy&x=1");
    assert_eq!(visit.intent, "buy");
}

#[test]
fn test_missing_user_agent_column_is_skipped() {
    let (sink, ctx) = capture();
    let line = ClickStreamLine::new().truncate(click_stream::USER_AGENT).build();
    let mut visit = Visit::default();
    let err = parse_click_stream_line(&line, &mut visit, &ctx).unwrap_err();
    assert!(matches!(err, ParseSkip::MissingColumn { .. }));
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_blank_user_agent_is_skipped() {
    let (sink, ctx) = capture();
    let line = ClickStreamLine::new().with(click_stream::USER_AGENT, "  ").build();
    let mut visit = Visit::default();
    let err = parse_click_stream_line(&line, &mut visit, &ctx).unwrap_err();
    assert_eq!(err, ParseSkip::BlankField { column: "user_agent" });
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_blank_ip_and_url_are_skipped() {
    let (_sink, ctx) = capture();
    let mut visit = Visit::default();
    let no_ip = ClickStreamLine::new().with(click_stream::IP_ADDRESS, "").build();
    assert_eq!(
        parse_click_stream_line(&no_ip, &mut visit, &ctx),
        Err(ParseSkip::BlankField { column: "ip_address" })
    );
    let no_url = ClickStreamLine::new().with(click_stream::PAGE_URL, "").build();
    assert_eq!(
        parse_click_stream_line(&no_url, &mut visit, &ctx),
        Err(ParseSkip::BlankField { column: "page_url" })
    );
}

#[test]
fn test_bad_hit_date_is_skipped() {
    let (sink, ctx) = capture();
    let line = ClickStreamLine::new()
        .with(click_stream::HIT_DATE, "01/01/2014 10:00")
        .build();
    let mut visit = Visit::default();
    let err = parse_click_stream_line(&line, &mut visit, &ctx).unwrap_err();
    assert_eq!(
        err,
        ParseSkip::InvalidHitDate {
            value: "01/01/2014 10:00".to_string()
        }
    );
    assert!(!sink.is_empty());
}

#[test]
fn test_short_line_has_empty_location() {
    let (_sink, ctx) = capture();
    let mut visit = Visit::default();
    let full = ClickStreamLine::new()
        .with(click_stream::POSTAL_CODE, "10001")
        .with(click_stream::REGION, "NY")
        .build();
    parse_click_stream_line(&full, &mut visit, &ctx).unwrap();
    assert_eq!(visit.location.postal_code(), "10001");

    let short = ClickStreamLine::new()
        .with(click_stream::POSTAL_CODE, "10001")
        .truncate(click_stream::GEO_REGION)
        .build();
    parse_click_stream_line(&short, &mut visit, &ctx).unwrap();
    assert_eq!(visit.location, Location::default());
}

#[test]
fn test_scratch_reuse_does_not_leak_fields() {
    let (_sink, ctx) = capture();
    let mut visit = Visit::default();
    let first = ClickStreamLine::new()
        .with(click_stream::REGION, "CA")
        .with(click_stream::POSTAL_CODE, "94103")
        .build();
    parse_click_stream_line(&first, &mut visit, &ctx).unwrap();
    assert_eq!(visit.intent, "buy");
    assert_eq!(visit.location.region(), "CA");

    let second = ClickStreamLine::new()
        .with(click_stream::PAGE_URL, "http://x/plain")
        .with(click_stream::REGION, "California")
        .with(click_stream::POSTAL_CODE, "not-a-zip")
        .build();
    parse_click_stream_line(&second, &mut visit, &ctx).unwrap();
    assert_eq!(visit.intent, "");
    assert_eq!(visit.location.region(), "");
    assert_eq!(visit.location.postal_code(), "");
}

#[test]
fn test_non_numeric_sequence_becomes_zero() {
    let (sink, ctx) = capture();
    let line = ClickStreamLine::new()
        .with(click_stream::PAGE_SEQUENCE, "x")
        .with(click_stream::VISIT_NUMBER, "")
        .build();
    let mut visit = Visit::default();
    parse_click_stream_line(&line, &mut visit, &ctx).unwrap();
    assert_eq!(visit.hit.page_sequence, 0);
    assert_eq!(visit.hit.visit_number, 0);
    // Only the non-empty malformed value warns.
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_extract_intent() {
    assert_eq!(extract_intent("http://x/?intent=buy&x=1"), Some("buy"));
    assert_eq!(extract_intent("http://x/?a=1&intent=sell"), Some("sell"));
    assert_eq!(extract_intent("http://x/?intent="), Some(""));
    assert_eq!(extract_intent("http://x/?a=1"), None);
}

#[test]
fn test_access_log_line() {
    let (sink, ctx) = capture();
    let mut stat = ClientStatistic::default();
    parse_access_log_line(&AccessLogLine::new().build(), &mut stat, &ctx).unwrap();
    assert_eq!(
        stat,
        ClientStatistic::new("Chrome", 31.0, "Windows NT", 6.1, "http://example.com/")
    );
    assert!(sink.is_empty());
}

#[test]
fn test_access_log_without_referer_is_skipped() {
    let (sink, ctx) = capture();
    let mut stat = ClientStatistic::default();
    let line = AccessLogLine::new().truncate(access_log::REFERER).build();
    let err = parse_access_log_line(&line, &mut stat, &ctx).unwrap_err();
    assert_eq!(
        err,
        ParseSkip::MissingColumn {
            column: "referer",
            index: access_log::REFERER,
            found: access_log::REFERER,
        }
    );
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_access_log_blank_user_agent_keeps_referer() {
    let (_sink, ctx) = capture();
    let mut stat = ClientStatistic::default();
    parse_access_log_line(&AccessLogLine::new().build(), &mut stat, &ctx).unwrap();

    let line = AccessLogLine::new()
        .with(access_log::USER_AGENT, "")
        .with(access_log::REFERER, "-")
        .build();
    parse_access_log_line(&line, &mut stat, &ctx).unwrap();
    assert_eq!(stat.browser, "");
    assert_eq!(stat.browser_version, OrderedFloat(0.0));
    assert_eq!(stat.os, "");
    assert_eq!(stat.referer, "-");
}

#[test]
fn test_access_log_line_uses_user_agent_column() {
    let (_sink, ctx) = capture();
    let mut stat = ClientStatistic::default();
    let line = AccessLogLine::new()
        .with(access_log::USER_AGENT, CHROME_USER_AGENT)
        .with(access_log::REFERER, "http://search/")
        .build();
    parse_access_log_line(&line, &mut stat, &ctx).unwrap();
    assert_eq!(stat.browser, "Chrome");
    assert_eq!(stat.referer, "http://search/");
}
