//! Errors raised while decoding chunked transfer encoding.

use std::io;

use thiserror::Error;

/// Where a chunked stream ended prematurely.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ChunkEof {
    /// The stream ended before or inside a chunk-size line, including a
    /// stream that carried no bytes at all.
    #[error("stream ended before a complete chunk-size line")]
    SizeLine,
    /// The stream ended inside chunk data.
    #[error("stream ended with {remaining} chunk bytes outstanding")]
    Data {
        /// Declared bytes not yet received.
        remaining: usize,
    },
    /// The stream ended between chunk data and its line terminator.
    #[error("stream ended before the chunk data terminator")]
    Terminator,
}

/// Malformed or truncated chunked input.
///
/// Converts into [`io::Error`]: [`ChunkedError::Eof`] maps to
/// [`io::ErrorKind::UnexpectedEof`], every other variant to
/// [`io::ErrorKind::InvalidData`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChunkedError {
    /// Premature end of stream.
    #[error("premature end of chunked stream: {0}")]
    Eof(#[from] ChunkEof),
    /// Chunk data was not followed by `CR? LF`.
    #[error("chunk data not followed by a line terminator (found byte {found:#04x})")]
    MissingDataTerminator {
        /// First unexpected byte.
        found: u8,
    },
    /// A carriage return in a chunk-size line was not followed by a line feed.
    #[error("carriage return in chunk-size line followed by byte {found:#04x}")]
    BareCarriageReturn {
        /// Byte found after the carriage return.
        found: u8,
    },
    /// The hexadecimal chunk size does not fit in `usize`.
    #[error("chunk size {digits:?} overflows usize")]
    SizeOverflow {
        /// The hexadecimal digits read.
        digits: String,
    },
    /// A chunk-size line exceeded the accepted length.
    #[error("chunk-size line longer than {limit} bytes")]
    SizeLineTooLong {
        /// Longest accepted line.
        limit: usize,
    },
}

impl ChunkedError {
    /// Recover the chunked error carried by an [`io::Error`], if any.
    ///
    /// ```
    /// use std::io;
    ///
    /// use as2relay::chunked::{ChunkEof, ChunkedError};
    ///
    /// let err: io::Error = ChunkedError::Eof(ChunkEof::SizeLine).into();
    /// assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    /// assert_eq!(
    ///     ChunkedError::from_io(&err),
    ///     Some(&ChunkedError::Eof(ChunkEof::SizeLine))
    /// );
    /// ```
    #[must_use]
    pub fn from_io(err: &io::Error) -> Option<&Self> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<Self>())
    }

    /// The [`io::ErrorKind`] this error converts to.
    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Eof(_) => io::ErrorKind::UnexpectedEof,
            _ => io::ErrorKind::InvalidData,
        }
    }
}

impl From<ChunkedError> for io::Error {
    fn from(err: ChunkedError) -> Self { io::Error::new(err.kind(), err) }
}
