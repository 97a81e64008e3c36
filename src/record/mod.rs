//! Typed records produced by the log parsers.
//!
//! Every record implements [`RecordCodec`](crate::codec::RecordCodec) for the
//! binary layout, `Eq`/`Hash`/`Ord` for reduction keys and sorting, and
//! `Display` for the tab-joined text form (fields in encode order).

mod client_statistic;
mod location;
mod page_hit;
mod visit;

pub use client_statistic::ClientStatistic;
pub use location::Location;
pub use page_hit::{HIT_DATE_FORMAT, PageHit};
pub use visit::Visit;

/// Overwrite `dst` in place, keeping its allocation.
pub(crate) fn replace(dst: &mut String, value: &str) {
    dst.clear();
    dst.push_str(value);
}
