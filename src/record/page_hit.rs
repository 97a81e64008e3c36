use crate::codec::{RecordCodec, read_i32, read_str, read_str_into, write_i32, write_str};
use crate::error::CodecError;
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::io::{Read, Write};

/// Layout of the hit date inside encoded records (`MM/dd/yyyy HH:mm:ss a`).
pub const HIT_DATE_FORMAT: &str = "%m/%d/%Y %H:%M:%S %p";

/// A single page view.
///
/// Hit dates are stored as text with second resolution, so a date carrying
/// sub-second precision does not survive an encode/decode round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PageHit {
    pub hit_date: NaiveDateTime,
    pub page_url: String,
    pub referer: String,
    pub ip_address: String,
    pub browser: String,
    pub page_name: String,
    pub page_sequence: i32,
    pub session_id: String,
    pub traffic_source: String,
    pub visit_number: i32,
}

impl PageHit {
    pub fn formatted_hit_date(&self) -> String {
        self.hit_date.format(HIT_DATE_FORMAT).to_string()
    }
}

impl Ord for PageHit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.session_id
            .cmp(&other.session_id)
            .then_with(|| self.page_sequence.cmp(&other.page_sequence))
            .then_with(|| self.hit_date.cmp(&other.hit_date))
            .then_with(|| self.page_url.cmp(&other.page_url))
            .then_with(|| self.referer.cmp(&other.referer))
            .then_with(|| self.ip_address.cmp(&other.ip_address))
            .then_with(|| self.browser.cmp(&other.browser))
            .then_with(|| self.page_name.cmp(&other.page_name))
            .then_with(|| self.traffic_source.cmp(&other.traffic_source))
            .then_with(|| self.visit_number.cmp(&other.visit_number))
    }
}

impl PartialOrd for PageHit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl RecordCodec for PageHit {
    fn encode<W: Write>(&self, out: &mut W) -> Result<(), CodecError> {
        write_str(out, "hit_date", &self.formatted_hit_date())?;
        write_str(out, "page_url", &self.page_url)?;
        write_str(out, "referer", &self.referer)?;
        write_str(out, "ip_address", &self.ip_address)?;
        write_str(out, "browser", &self.browser)?;
        write_str(out, "page_name", &self.page_name)?;
        write_i32(out, self.page_sequence)?;
        write_str(out, "session_id", &self.session_id)?;
        write_str(out, "traffic_source", &self.traffic_source)?;
        write_i32(out, self.visit_number)
    }

    fn decode_into<R: Read>(&mut self, input: &mut R) -> Result<(), CodecError> {
        let hit_date = read_str(input, "hit_date")?;
        self.hit_date = NaiveDateTime::parse_from_str(&hit_date, HIT_DATE_FORMAT)
            .map_err(|_| CodecError::InvalidDate { value: hit_date })?;
        read_str_into(input, "page_url", &mut self.page_url)?;
        read_str_into(input, "referer", &mut self.referer)?;
        read_str_into(input, "ip_address", &mut self.ip_address)?;
        read_str_into(input, "browser", &mut self.browser)?;
        read_str_into(input, "page_name", &mut self.page_name)?;
        self.page_sequence = read_i32(input, "page_sequence")?;
        read_str_into(input, "session_id", &mut self.session_id)?;
        read_str_into(input, "traffic_source", &mut self.traffic_source)?;
        self.visit_number = read_i32(input, "visit_number")?;
        Ok(())
    }
}

impl Display for PageHit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.formatted_hit_date(),
            self.page_url,
            self.referer,
            self.ip_address,
            self.browser,
            self.page_name,
            self.page_sequence,
            self.session_id,
            self.traffic_source,
            self.visit_number
        )
    }
}
