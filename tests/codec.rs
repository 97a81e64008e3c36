//! Tests for the binary record encoding.

use chrono::NaiveDate;
use logbeam::codec::{RecordCodec, RecordReader, write_str};
use logbeam::error::CodecError;
use logbeam::record::{ClientStatistic, Location, PageHit, Visit};
use pretty_assertions::assert_eq;
use std::io::Cursor;

fn sample_hit(session: &str, sequence: i32) -> PageHit {
    PageHit {
        hit_date: NaiveDate::from_ymd_opt(2014, 1, 1)
            .unwrap()
            .and_hms_opt(14, 30, 5)
            .unwrap(),
        page_url: "http://x/?intent=buy".to_string(),
        referer: "http://ref/".to_string(),
        ip_address: "1.2.3.4".to_string(),
        browser: "Chrome 31.0".to_string(),
        page_name: "home".to_string(),
        page_sequence: sequence,
        session_id: session.to_string(),
        traffic_source: "search".to_string(),
        visit_number: 2,
    }
}

fn sample_visit(session: &str, sequence: i32) -> Visit {
    Visit {
        hit: sample_hit(session, sequence),
        intent: "buy".to_string(),
        section: "shop".to_string(),
        location: Location::new("10001", "New York", "NY", "Brooklyn", "ny"),
    }
}

#[test]
fn test_location_round_trip() {
    let loc = Location::new("00501", "Suffolk", "NY", "Holtsville", "NY");
    assert_eq!(Location::from_bytes(&loc.to_bytes().unwrap()).unwrap(), loc);
}

#[test]
fn test_location_with_rejected_values_round_trips_defaults() {
    let loc = Location::new("ABCDE", "Suffolk", "New York", "Holtsville", "N1");
    assert_eq!(loc.postal_code(), "");
    assert_eq!(loc.region(), "");
    assert_eq!(loc.geo_region(), "");
    assert_eq!(Location::from_bytes(&loc.to_bytes().unwrap()).unwrap(), loc);
}

#[test]
fn test_location_layout() {
    let loc = Location::new("1", "", "", "", "");
    let bytes = loc.to_bytes().unwrap();
    // u16 length 1, "1", then four empty strings.
    assert_eq!(bytes, vec![0, 1, b'1', 0, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_page_hit_round_trip() {
    let hit = sample_hit("s-1", 3);
    assert_eq!(PageHit::from_bytes(&hit.to_bytes().unwrap()).unwrap(), hit);
}

#[test]
fn test_page_hit_date_text() {
    let hit = sample_hit("s-1", 3);
    assert_eq!(hit.formatted_hit_date(), "01/01/2014 14:30:05 PM");
    let bytes = hit.to_bytes().unwrap();
    let date = b"01/01/2014 14:30:05 PM";
    assert_eq!(&bytes[..2], &[0, date.len() as u8]);
    assert_eq!(&bytes[2..2 + date.len()], date);
}

#[test]
fn test_visit_round_trip() {
    let visit = sample_visit("s-9", 12);
    assert_eq!(Visit::from_bytes(&visit.to_bytes().unwrap()).unwrap(), visit);
}

#[test]
fn test_client_statistic_round_trip() {
    let stat = ClientStatistic::new("Firefox", 26.0, "Linux", 0.0, "http://ref/");
    assert_eq!(
        ClientStatistic::from_bytes(&stat.to_bytes().unwrap()).unwrap(),
        stat
    );
}

#[test]
fn test_truncated_record() {
    let bytes = sample_visit("s-1", 1).to_bytes().unwrap();
    let err = Visit::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(matches!(err, CodecError::Truncated { .. }));
}

#[test]
fn test_string_too_long() {
    let long = "x".repeat(70_000);
    let mut out = Vec::new();
    let err = write_str(&mut out, "referer", &long).unwrap_err();
    assert!(matches!(
        err,
        CodecError::StringTooLong {
            field: "referer",
            len: 70_000
        }
    ));
}

#[test]
fn test_record_reader_reads_back_to_back_records() {
    let visits = vec![sample_visit("a", 1), sample_visit("b", 2), sample_visit("c", 3)];
    let mut bytes = Vec::new();
    for v in &visits {
        v.encode(&mut bytes).unwrap();
    }
    let decoded: Vec<Visit> = RecordReader::<_, Visit>::new(Cursor::new(bytes))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(decoded, visits);
}

#[test]
fn test_record_reader_reports_trailing_garbage() {
    let mut bytes = sample_visit("a", 1).to_bytes().unwrap();
    bytes.extend_from_slice(&[0, 9, b'x']);
    let results: Vec<Result<Visit, CodecError>> =
        RecordReader::<_, Visit>::new(Cursor::new(bytes)).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(CodecError::Truncated { .. })));
}

#[test]
fn test_display_is_tab_joined() {
    let stat = ClientStatistic::new("Chrome", 31.0, "Windows NT", 6.1, "-");
    assert_eq!(stat.to_string(), "Chrome\t31.0\tWindows NT\t6.1\t-");

    let loc = Location::new("10001", "New York", "NY", "Brooklyn", "NY");
    assert_eq!(loc.to_string(), "10001\tNew York\tNY\tBrooklyn\tNY");

    let visit = sample_visit("s", 1);
    assert_eq!(visit.to_string().split('\t').count(), 10 + 2 + 5);
}
