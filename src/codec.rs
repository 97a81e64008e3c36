//! Canonical binary encoding for records.
//!
//! The layout is fixed and versionless: each record writes its fields in a
//! declared order with no framing of its own.
//!
//! - strings: `u16` big-endian byte length, then UTF-8 bytes
//! - `i32` / `f32`: 4 bytes, big-endian
//!
//! Records are stored back to back; [`RecordReader`] walks such a stream and
//! stops at a clean end of input.
//!
//! # Example
//!
//! ```
//! use logbeam::codec::RecordCodec;
//! use logbeam::record::Location;
//!
//! let loc = Location::new("10001", "New York", "NY", "New York", "NY");
//! let bytes = loc.to_bytes()?;
//! assert_eq!(Location::from_bytes(&bytes)?, loc);
//! # Ok::<(), logbeam::CodecError>(())
//! ```

use crate::error::CodecError;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, BufRead, ErrorKind, Read, Write};
use std::marker::PhantomData;

/// Binary encode/decode contract implemented by every record type.
pub trait RecordCodec: Default {
    /// Write all fields in declared order.
    fn encode<W: Write>(&self, out: &mut W) -> Result<(), CodecError>;

    /// Overwrite `self` with the next record read from `input`.
    fn decode_into<R: Read>(&mut self, input: &mut R) -> Result<(), CodecError>;

    fn decode<R: Read>(input: &mut R) -> Result<Self, CodecError> {
        let mut record = Self::default();
        record.decode_into(input)?;
        Ok(record)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }

    fn from_bytes(mut bytes: &[u8]) -> Result<Self, CodecError> {
        Self::decode(&mut bytes)
    }
}

fn truncated(field: &'static str) -> impl FnOnce(io::Error) -> CodecError {
    move |err| {
        if err.kind() == ErrorKind::UnexpectedEof {
            CodecError::Truncated { field }
        } else {
            CodecError::Io(err)
        }
    }
}

pub fn write_str<W: Write>(
    out: &mut W,
    field: &'static str,
    value: &str,
) -> Result<(), CodecError> {
    let len = u16::try_from(value.len()).map_err(|_| CodecError::StringTooLong {
        field,
        len: value.len(),
    })?;
    out.write_u16::<BigEndian>(len)?;
    out.write_all(value.as_bytes())?;
    Ok(())
}

pub fn read_str<R: Read>(input: &mut R, field: &'static str) -> Result<String, CodecError> {
    let len = input.read_u16::<BigEndian>().map_err(truncated(field))?;
    let mut buf = vec![0u8; usize::from(len)];
    input.read_exact(&mut buf).map_err(truncated(field))?;
    String::from_utf8(buf).map_err(|_| CodecError::InvalidUtf8 { field })
}

/// Like [`read_str`] but reuses `dst`'s allocation.
pub fn read_str_into<R: Read>(
    input: &mut R,
    field: &'static str,
    dst: &mut String,
) -> Result<(), CodecError> {
    let value = read_str(input, field)?;
    dst.clear();
    dst.push_str(&value);
    Ok(())
}

pub fn write_i32<W: Write>(out: &mut W, value: i32) -> Result<(), CodecError> {
    out.write_i32::<BigEndian>(value)?;
    Ok(())
}

pub fn read_i32<R: Read>(input: &mut R, field: &'static str) -> Result<i32, CodecError> {
    input.read_i32::<BigEndian>().map_err(truncated(field))
}

pub fn write_f32<W: Write>(out: &mut W, value: f32) -> Result<(), CodecError> {
    out.write_f32::<BigEndian>(value)?;
    Ok(())
}

pub fn read_f32<R: Read>(input: &mut R, field: &'static str) -> Result<f32, CodecError> {
    input.read_f32::<BigEndian>().map_err(truncated(field))
}

/// Iterates records stored back to back in a buffered stream.
///
/// End of input at a record boundary ends the iteration; end of input inside
/// a record yields [`CodecError::Truncated`].
pub struct RecordReader<R, T> {
    input: R,
    done: bool,
    _marker: PhantomData<T>,
}

impl<R: BufRead, T: RecordCodec> RecordReader<R, T> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            done: false,
            _marker: PhantomData,
        }
    }

    fn at_eof(&mut self) -> Result<bool, CodecError> {
        Ok(self.input.fill_buf()?.is_empty())
    }
}

impl<R: BufRead, T: RecordCodec> Iterator for RecordReader<R, T> {
    type Item = Result<T, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.at_eof() {
            Ok(true) => {
                self.done = true;
                None
            }
            Ok(false) => {
                let item = T::decode(&mut self.input);
                if item.is_err() {
                    self.done = true;
                }
                Some(item)
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
