//! Big-endian reads over a buffered byte source.
//!
//! The wire format is big-endian throughout and uses a fixed set of
//! primitive widths, so the reader exposes one named method per width
//! instead of a generic read abstraction.

use std::io::{BufRead, BufReader, Read, Result};

/// Generates one reader method per big-endian primitive the wire format
/// uses.
macro_rules! read_be {
    ($($name:ident -> $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Reads a big-endian `", stringify!($ty), "`.")]
            pub fn $name(&mut self) -> Result<$ty> {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                self.read_exact(&mut buf)?;
                Ok(<$ty>::from_be_bytes(buf))
            }
        )*
    };
}

/// A buffered reader with single-byte pushback and end-of-stream detection.
///
/// The pushback slot exists for the type dispatcher: when it reads a byte
/// that is not a known type tag it puts the byte back, so a caller that
/// continues consuming the underlying source after the failed decode still
/// sees the foreign byte.
#[derive(Debug)]
pub(crate) struct StreamReader<R> {
    inner: BufReader<R>,
    pushback: Option<u8>,
}

impl<R: Read> StreamReader<R> {
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, inner),
            pushback: None,
        }
    }

    read_be! {
        read_u8 -> u8,
        read_i8 -> i8,
        read_u16 -> u16,
        read_i16 -> i16,
        read_u32 -> u32,
        read_i32 -> i32,
        read_i64 -> i64,
        read_f32 -> f32,
        read_f64 -> f64,
    }

    /// Reads exactly `len` bytes and advances the reader past them.
    pub fn read_chunk(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(buf.as_mut_slice())?;
        Ok(buf)
    }

    /// Makes `byte` the next byte returned by `read`.
    pub fn unread_byte(&mut self, byte: u8) {
        self.pushback = Some(byte);
    }

    /// Whether no bytes remain. An I/O failure while probing counts as the
    /// end of the stream.
    pub fn at_end(&mut self) -> bool {
        if self.pushback.is_some() {
            return false;
        }
        self.inner.fill_buf().map_or(true, <[u8]>::is_empty)
    }
}

impl<R: Read> Read for StreamReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.pushback.take() {
            buf[0] = byte;
            return Ok(1);
        }
        self.inner.read(buf)
    }
}
