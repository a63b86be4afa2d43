//! The stream parser: configuration, the top-level driver, and the guarded
//! length-prefixed reads every entity parser builds on.

mod class_desc;
mod content;
pub(crate) mod errors;
mod object;
mod reader_utils;

use std::io::Read;

use chrono::{FixedOffset, Offset, Utc};

pub use crate::serial::descriptor::UnknownFieldType;
pub use errors::Error;
use errors::ErrorContext;
use reader_utils::StreamReader;

use super::handles::HandleTable;
use crate::value::Value;

const MAGIC_NUMBER: u16 = 0xACED;
const PROTOCOL_VERSION: u16 = 5;
const DEFAULT_BUFFER_SIZE: usize = 1024;
const CYCLE_VALUE: &str = "[CYCLE]";

/// Decodes one top-level value from a serialized object stream.
///
/// Equivalent to [`Parser::new`] followed by [`Parser::parse`] with the
/// default configuration.
///
/// # Errors
/// See [`Error`] for the failure modes.
pub fn parse(bytes: &[u8]) -> Result<Value, Error> {
    Parser::new(bytes).parse()
}

/// A parser for serialized Java object streams.
///
/// A parser owns its buffered reader and handle table and must not be shared
/// across threads; decoding is strictly synchronous.
#[derive(Debug)]
pub struct Parser<R> {
    reader: StreamReader<R>,
    handles: HandleTable,
    max_data_block_size: usize,
    cycle_value: Value,
    time_zone: FixedOffset,
}

impl<R: Read> Parser<R> {
    /// Wraps `reader` with the default configuration: a 1 KiB buffer, the
    /// same limit on length-prefixed blocks, the `"[CYCLE]"` sentinel, and
    /// UTC timestamps.
    pub fn new(reader: R) -> Self {
        Self {
            reader: StreamReader::with_capacity(DEFAULT_BUFFER_SIZE, reader),
            handles: HandleTable::new(),
            max_data_block_size: DEFAULT_BUFFER_SIZE,
            cycle_value: Value::Str(CYCLE_VALUE.to_owned()),
            time_zone: Utc.fix(),
        }
    }

    /// Sets the maximum size of a length-prefixed data block. Lengths read
    /// from the stream are checked against this limit before anything is
    /// allocated. Takes effect immediately.
    pub fn set_max_data_block_size(&mut self, max_data_block_size: usize) {
        self.max_data_block_size = max_data_block_size;
    }

    /// Sets the value substituted when a back-reference targets an entity
    /// that is still being constructed.
    pub fn set_cycle_reference_value(&mut self, value: Value) {
        self.cycle_value = value;
    }

    /// Sets the offset timestamps are rendered in. The wire format carries
    /// plain epoch milliseconds; the original encoder's locale is not
    /// recoverable from the stream.
    pub fn set_time_zone(&mut self, time_zone: FixedOffset) {
        self.time_zone = time_zone;
    }

    /// Decodes one top-level value.
    ///
    /// The stream must be fully consumed by that value; trailing bytes are
    /// an error and the decoded value is discarded.
    ///
    /// # Errors
    /// See [`Error`] for the failure modes.
    pub fn parse(&mut self) -> Result<Value, Error> {
        self.magic()?;
        self.version()?;
        let content = match self.content(None) {
            Err(err) if err.is_eof() => return Err(Error::PrematureEof),
            content => content?,
        };
        let value = content.into_value();
        if !self.reader.at_end() {
            return Err(Error::TrailingData);
        }
        Ok(value)
    }

    fn magic(&mut self) -> Result<(), Error> {
        let magic = self.reader.read_u16()?;
        if magic == MAGIC_NUMBER {
            Ok(())
        } else {
            Err(Error::MagicMismatch)
        }
    }

    fn version(&mut self) -> Result<(), Error> {
        let version = self.reader.read_u16()?;
        if version == PROTOCOL_VERSION {
            Ok(())
        } else {
            Err(Error::UnsupportedVersion(version))
        }
    }

    /// Reads `len` raw bytes, rejecting lengths beyond the configured block
    /// limit before allocating.
    fn read_block(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        if len > self.max_data_block_size {
            return Err(Error::BlockDataExceedsMax {
                want: len,
                max: self.max_data_block_size,
            });
        }
        Ok(self.reader.read_chunk(len)?)
    }

    /// Reads `len` bytes as a string, either the raw (lossily decoded)
    /// bytes or their lowercase hex form.
    fn read_string(&mut self, len: usize, as_hex: bool) -> Result<String, Error> {
        let bytes = self.read_block(len)?;
        Ok(if as_hex {
            hex::encode(bytes)
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        })
    }

    /// Reads a 16-bit length-prefixed string.
    fn utf(&mut self) -> Result<String, Error> {
        let len = self
            .reader
            .read_u16()
            .context("error reading utf: unable to read segment length")?;
        self.read_string(len.into(), false)
            .context("error reading utf: unable to read segment")
    }

    /// Reads a 64-bit length-prefixed string. The upper half of the length
    /// must be zero; larger strings are rejected outright.
    fn utf_long(&mut self) -> Result<String, Error> {
        let high = self
            .reader
            .read_u32()
            .context("error reading utf long: unable to read first segment length")?;
        if high != 0 {
            return Err(Error::StringTooLong);
        }
        let len = self
            .reader
            .read_u32()
            .context("error reading utf long: unable to read second segment length")?;
        self.read_string(len as usize, false)
            .context("error reading utf long: unable to read segment")
    }
}
