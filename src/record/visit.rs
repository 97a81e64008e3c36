use crate::codec::{RecordCodec, read_str_into, write_str};
use crate::error::CodecError;
use crate::record::{Location, PageHit};
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::io::{Read, Write};

/// A page hit plus what the visitor came for and where they are.
///
/// Encoding, equality and ordering delegate to the embedded [`PageHit`]
/// first, so visits sort by session id and then page sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Visit {
    pub hit: PageHit,
    pub intent: String,
    pub section: String,
    pub location: Location,
}

impl RecordCodec for Visit {
    fn encode<W: Write>(&self, out: &mut W) -> Result<(), CodecError> {
        self.hit.encode(out)?;
        write_str(out, "intent", &self.intent)?;
        write_str(out, "section", &self.section)?;
        self.location.encode(out)
    }

    fn decode_into<R: Read>(&mut self, input: &mut R) -> Result<(), CodecError> {
        self.hit.decode_into(input)?;
        read_str_into(input, "intent", &mut self.intent)?;
        read_str_into(input, "section", &mut self.section)?;
        self.location.decode_into(input)
    }
}

impl Display for Visit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.hit, self.intent, self.section, self.location
        )
    }
}
