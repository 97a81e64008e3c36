//! Tests for scalar validation and tolerant parsing.

use chrono::NaiveDate;
use logbeam::diagnostics::MemorySink;
use logbeam::validate::{
    CLICK_STREAM_DATE_FORMAT, is_blank, parse_date, parse_double, parse_float, parse_int,
    validate_postal_code, validate_region_code,
};

#[test]
fn test_region_code_accepts_two_letters_any_case() {
    assert!(validate_region_code("ca"));
    assert!(validate_region_code("CA"));
    assert!(validate_region_code("Ny"));
    assert!(!validate_region_code("California"));
    assert!(!validate_region_code("C"));
    assert!(!validate_region_code("C1"));
    assert!(!validate_region_code(""));
}

#[test]
fn test_postal_code_is_one_to_five_digits() {
    assert!(validate_postal_code("0"));
    assert!(validate_postal_code("00501"));
    assert!(validate_postal_code("10001"));
    assert!(!validate_postal_code("100011"));
    assert!(!validate_postal_code("1000a"));
    assert!(!validate_postal_code("10001-1234"));
    assert!(!validate_postal_code(""));
}

#[test]
fn test_parse_date_click_stream_format() {
    let sink = MemorySink::new();
    let parsed = parse_date(CLICK_STREAM_DATE_FORMAT, "2014-01-01 10:00:00", &sink);
    let expected = NaiveDate::from_ymd_opt(2014, 1, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    assert_eq!(parsed, Some(expected));
    assert!(sink.is_empty());
}

#[test]
fn test_parse_date_mismatch_warns() {
    let sink = MemorySink::new();
    assert_eq!(parse_date(CLICK_STREAM_DATE_FORMAT, "01/01/2014", &sink), None);
    assert_eq!(sink.len(), 1);
    let warning = &sink.warnings()[0];
    assert!(warning.message.contains("01/01/2014"));
    assert!(warning.cause.is_some());
}

#[test]
fn test_parse_date_empty_is_silent() {
    let sink = MemorySink::new();
    assert_eq!(parse_date(CLICK_STREAM_DATE_FORMAT, "", &sink), None);
    assert_eq!(parse_date("", "2014-01-01 10:00:00", &sink), None);
    assert!(sink.is_empty());
}

#[test]
fn test_parse_numbers() {
    let sink = MemorySink::new();
    assert_eq!(parse_int(" 42 ", &sink), Some(42));
    assert_eq!(parse_int("-7", &sink), Some(-7));
    assert_eq!(parse_float("6.1", &sink), Some(6.1));
    assert_eq!(parse_double("2.5", &sink), Some(2.5));
    assert!(sink.is_empty());

    assert_eq!(parse_int("4.2", &sink), None);
    assert_eq!(parse_float("abc", &sink), None);
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_blank_numbers_do_not_warn() {
    let sink = MemorySink::new();
    assert_eq!(parse_int("", &sink), None);
    assert_eq!(parse_int("   ", &sink), None);
    assert_eq!(parse_double("\t", &sink), None);
    assert!(sink.is_empty());
}

#[test]
fn test_is_blank() {
    assert!(is_blank(""));
    assert!(is_blank("  \t"));
    assert!(!is_blank(" x "));
}
