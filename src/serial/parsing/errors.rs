//! Errors produced while decoding a serialization stream.

use std::io;

use crate::serial::descriptor::UnknownFieldType;

/// An error that occurs while decoding a serialized object stream.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Reading from the underlying byte source failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The stream does not start with the `0xACED` magic number.
    #[error("magic number not found")]
    MagicMismatch,
    /// The stream uses a protocol version other than 5.
    #[error("protocol version not recognized: wanted 5 got {0}")]
    UnsupportedVersion(u16),
    /// The type tag byte does not map to a known type.
    #[error("unknown type {0:#04x}")]
    UnknownType(u8),
    /// A known type appeared in a position where it is not allowed.
    #[error("{0} not allowed here")]
    TypeNotAllowedHere(&'static str),
    /// A recognized but unimplemented type was encountered.
    #[error("parsing {0} is currently not supported")]
    Unsupported(&'static str),
    /// The stream ended before a complete top-level value was decoded.
    #[error("premature end of input")]
    PrematureEof,
    /// A class name shorter than two bytes.
    #[error("invalid class name: '{0}'")]
    InvalidClassName(String),
    /// A field-type character outside `B C D F I J S Z L [`.
    #[error(transparent)]
    UnknownFieldType(#[from] UnknownFieldType),
    /// The declared class name of an object or array field decoded to
    /// something other than a string.
    #[error("unexpected field class name type")]
    UnexpectedFieldClassNameType,
    /// A class-descriptor position resolved to a non-descriptor entity.
    #[error("unexpected type returned while reading class description")]
    UnexpectedClassDesc,
    /// A length field announced more data than the configured limit allows.
    /// Raised before the block is allocated; raise the limit with
    /// [`Parser::set_max_data_block_size`](super::Parser::set_max_data_block_size).
    #[error("block data exceeds size of reader buffer: want {want} bytes, max is {max}")]
    BlockDataExceedsMax {
        /// The announced block length.
        want: usize,
        /// The configured limit.
        max: usize,
    },
    /// A long string whose length does not fit in 32 bits.
    #[error("unable to read string larger than 2^32 bytes")]
    StringTooLong,
    /// The class uses the legacy externalizable form without block data.
    #[error("unable to parse version 1 external content")]
    ExternalContent,
    /// The low nibble of the class flags selects no known data layout.
    #[error("unable to deserialize class with flags {0:#04x}")]
    UnsupportedClassFlags(u8),
    /// A container's announced element count disagrees with its payload.
    #[error("incorrect number of elements: want {want} got {got}")]
    MalformedContainerPayload {
        /// The count announced in the size block.
        want: i64,
        /// The number of elements actually present.
        got: i64,
    },
    /// A container normalizer ran against an empty annotation list.
    #[error("invalid data: at least one element required")]
    MissingContainerData,
    /// The first annotation of a container was not a byte block.
    #[error("unexpected data at position 0")]
    UnexpectedContainerData,
    /// The size block of a container is too short.
    #[error("incorrect data at position 0: wanted at least {want} bytes, got {got}")]
    ShortContainerData {
        /// The minimum byte count the normalizer needs.
        want: usize,
        /// The bytes actually present.
        got: usize,
    },
    /// A decoded epoch offset that no calendar instant can represent.
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
    /// The top-level value decoded but the stream still holds data.
    #[error("object already parsed but there is more data")]
    TrailingData,
    /// A layer's context wrapped around the underlying cause.
    #[error("{context}: {source}")]
    Context {
        /// What the failing layer was doing.
        context: String,
        /// The underlying cause.
        source: Box<Error>,
    },
}

impl Error {
    /// Unwinds the context chain down to the original failure.
    #[must_use]
    pub fn root_cause(&self) -> &Error {
        let mut error = self;
        while let Error::Context { source, .. } = error {
            error = source;
        }
        error
    }

    /// Whether the chain bottoms out in an end-of-stream condition.
    pub(crate) fn is_eof(&self) -> bool {
        matches!(self.root_cause(), Error::Io(cause) if cause.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Wraps an error with a short phrase naming the failing layer, forming the
/// diagnostic chain surfaced to callers.
pub(crate) trait ErrorContext<T> {
    fn context(self, message: impl Into<String>) -> Result<T, Error>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T, Error> {
        self.map_err(|err| Error::Context {
            context: message.into(),
            source: Box::new(err.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_chains_render_outermost_first() {
        let inner: Result<(), Error> = Err(Error::MagicMismatch);
        let err = inner
            .context("reading header")
            .context("parsing stream")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "parsing stream: reading header: magic number not found"
        );
    }

    #[test]
    fn root_cause_unwinds_the_chain() {
        let err = Err::<(), _>(Error::StringTooLong)
            .context("reading utf")
            .unwrap_err();
        assert!(matches!(err.root_cause(), Error::StringTooLong));
    }

    #[test]
    fn eof_detection_sees_through_context() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err = Err::<(), _>(Error::from(io_err))
            .context("reading value")
            .unwrap_err();
        assert!(err.is_eof());
        assert!(!Error::MagicMismatch.is_eof());
    }
}
