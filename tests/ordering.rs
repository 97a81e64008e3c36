//! Tests for record equality and ordering.

use logbeam::record::{ClientStatistic, Location, PageHit, Visit};
use std::collections::HashSet;

fn hit(session: &str, sequence: i32) -> PageHit {
    PageHit {
        session_id: session.to_string(),
        page_sequence: sequence,
        ..PageHit::default()
    }
}

#[test]
fn test_page_hits_order_by_sequence_within_session() {
    let first = hit("s", 1);
    let second = hit("s", 2);
    assert!(first < second);

    let mut hits = vec![hit("s", 3), second.clone(), first.clone()];
    hits.sort();
    assert_eq!(hits, vec![first, second, hit("s", 3)]);
}

#[test]
fn test_session_id_dominates_sequence() {
    // An additive comparison would call these equal.
    let a = hit("a", 2);
    let b = hit("b", 1);
    assert!(a < b);
    assert_ne!(a.cmp(&b), std::cmp::Ordering::Equal);
}

#[test]
fn test_ordering_agrees_with_equality() {
    let a = hit("s", 1);
    let mut b = hit("s", 1);
    b.page_url = "http://other/".to_string();
    assert_ne!(a, b);
    assert_ne!(a.cmp(&b), std::cmp::Ordering::Equal);
}

#[test]
fn test_locations_order_by_postal_code() {
    let a = Location::new("00501", "", "", "", "");
    let b = Location::new("10001", "", "", "", "");
    assert!(a < b);
}

#[test]
fn test_rejected_region_keeps_prior_value() {
    let mut loc = Location::default();
    loc.set_region("CA");
    loc.set_region("California");
    assert_eq!(loc.region(), "CA");
    loc.set_region("California");
    assert_eq!(loc.region(), "CA");
    loc.set_postal_code("10001");
    loc.set_postal_code("1000000");
    assert_eq!(loc.postal_code(), "10001");
}

#[test]
fn test_visits_sort_by_hit_first() {
    let mut late = Visit {
        hit: hit("s", 2),
        ..Visit::default()
    };
    late.intent = "aaa".to_string();
    let early = Visit {
        hit: hit("s", 1),
        intent: "zzz".to_string(),
        ..Visit::default()
    };
    assert!(early < late);
}

#[test]
fn test_client_statistics_merge_as_keys() {
    let mut set = HashSet::new();
    set.insert(ClientStatistic::new("Chrome", 31.0, "Windows NT", 6.1, "-"));
    set.insert(ClientStatistic::new("Chrome", 31.0, "Windows NT", 6.1, "-"));
    set.insert(ClientStatistic::new("Chrome", 32.0, "Windows NT", 6.1, "-"));
    assert_eq!(set.len(), 2);

    let older = ClientStatistic::new("Chrome", 31.0, "Windows NT", 6.1, "-");
    let newer = ClientStatistic::new("Chrome", 32.0, "Windows NT", 6.1, "-");
    assert!(older < newer);
}
