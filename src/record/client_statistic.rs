use crate::codec::{RecordCodec, read_f32, read_str_into, write_f32, write_str};
use crate::error::CodecError;
use ordered_float::OrderedFloat;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::io::{Read, Write};

/// Aggregation key for access-log analysis.
///
/// Identical tuples compare equal and merge under reduction. Versions are
/// totally ordered floats so the key can live in hash maps and sorted output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientStatistic {
    pub browser: String,
    pub browser_version: OrderedFloat<f32>,
    pub os: String,
    pub os_version: OrderedFloat<f32>,
    pub referer: String,
}

impl ClientStatistic {
    #[must_use]
    pub fn new(
        browser: &str,
        browser_version: f32,
        os: &str,
        os_version: f32,
        referer: &str,
    ) -> Self {
        Self {
            browser: browser.to_string(),
            browser_version: OrderedFloat(browser_version),
            os: os.to_string(),
            os_version: OrderedFloat(os_version),
            referer: referer.to_string(),
        }
    }

    pub fn clear(&mut self) {
        self.browser.clear();
        self.browser_version = OrderedFloat(0.0);
        self.os.clear();
        self.os_version = OrderedFloat(0.0);
        self.referer.clear();
    }
}

impl RecordCodec for ClientStatistic {
    fn encode<W: Write>(&self, out: &mut W) -> Result<(), CodecError> {
        write_str(out, "browser", &self.browser)?;
        write_f32(out, self.browser_version.0)?;
        write_str(out, "os", &self.os)?;
        write_f32(out, self.os_version.0)?;
        write_str(out, "referer", &self.referer)
    }

    fn decode_into<R: Read>(&mut self, input: &mut R) -> Result<(), CodecError> {
        read_str_into(input, "browser", &mut self.browser)?;
        self.browser_version = OrderedFloat(read_f32(input, "browser_version")?);
        read_str_into(input, "os", &mut self.os)?;
        self.os_version = OrderedFloat(read_f32(input, "os_version")?);
        read_str_into(input, "referer", &mut self.referer)
    }
}

impl Display for ClientStatistic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        write!(
            f,
            "{}\t{:?}\t{}\t{:?}\t{}",
            self.browser, self.browser_version.0, self.os, self.os_version.0, self.referer
        )
    }
}
