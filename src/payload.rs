//! Reading AS2 HTTP request bodies.
//!
//! The body framing is taken from the request headers:
//!
//! - `Transfer-Encoding` present: it must be exactly `chunked` (compared
//!   case-sensitively) and the body is decoded with
//!   [`crate::chunked::ChunkedReader`].
//! - otherwise `Content-Length` is required and the body is exactly that
//!   many bytes.
//!
//! [`ReadStrategy`] chooses between collecting the body up front and
//! handing back a reader; both yield identical bytes and both fail with
//! [`io::ErrorKind::UnexpectedEof`] when the body is cut short.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, ReadBuf};

use crate::{chunked::ChunkedReader, message::{Headers, Message}};

mod error;
mod fixed;

pub use error::{PayloadError, ProtocolError};
use fixed::FixedLengthReader;

/// Header carrying the transfer coding.
pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
/// Header carrying the body length.
pub const CONTENT_LENGTH: &str = "Content-Length";

const CHUNKED: &str = "chunked";
const PREALLOCATE_LIMIT: u64 = 64 * 1024;

/// How [`PayloadReader`] hands over the body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStrategy {
    /// Read the whole body before returning.
    #[default]
    Buffered,
    /// Return a reader over the body.
    Streaming,
}

/// Body framing derived from request headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// Chunked transfer coding.
    Chunked,
    /// Fixed `Content-Length`.
    Length(u64),
}

impl Framing {
    /// Determine the framing announced by `headers`.
    ///
    /// ```
    /// use as2relay::{
    ///     message::Headers,
    ///     payload::{Framing, ProtocolError},
    /// };
    ///
    /// let headers: Headers = [("Content-Length", "12")].into_iter().collect();
    /// assert_eq!(Framing::from_headers(&headers), Ok(Framing::Length(12)));
    ///
    /// let headers: Headers = [("Transfer-Encoding", "gzip")].into_iter().collect();
    /// assert_eq!(Framing::from_headers(&headers).unwrap_err().status_code(), 501);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the [`ProtocolError`] a receiver must answer with.
    pub fn from_headers(headers: &Headers) -> Result<Self, ProtocolError> {
        if let Some(coding) = headers.get(TRANSFER_ENCODING) {
            if coding == CHUNKED {
                return Ok(Self::Chunked);
            }
            return Err(ProtocolError::UnsupportedTransferEncoding {
                value: coding.to_owned(),
            });
        }
        let value = headers
            .get(CONTENT_LENGTH)
            .ok_or(ProtocolError::LengthRequired)?;
        value
            .trim()
            .parse::<u64>()
            .map(Self::Length)
            .map_err(|_| ProtocolError::InvalidContentLength {
                value: value.to_owned(),
            })
    }
}

#[derive(Debug)]
enum BodyInner<R> {
    Chunked(ChunkedReader<R>),
    Fixed(FixedLengthReader<R>),
}

/// Streaming request body.
#[derive(Debug)]
pub struct Body<R> {
    inner: BodyInner<R>,
}

impl<R: AsyncBufRead + Unpin> Body<R> {
    /// Read a body with the given framing from `reader`.
    pub fn new(framing: Framing, reader: R) -> Self {
        let inner = match framing {
            Framing::Chunked => BodyInner::Chunked(ChunkedReader::new(reader)),
            Framing::Length(len) => BodyInner::Fixed(FixedLengthReader::new(reader, len)),
        };
        Self { inner }
    }
}

impl<R: AsyncRead> Body<R> {
    /// Recover the underlying reader.
    pub fn into_inner(self) -> R {
        match self.inner {
            BodyInner::Chunked(reader) => reader.into_inner(),
            BodyInner::Fixed(reader) => reader.into_inner(),
        }
    }
}

impl<R: AsyncBufRead + Unpin> AsyncRead for Body<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            BodyInner::Chunked(reader) => Pin::new(reader).poll_read(cx, buf),
            BodyInner::Fixed(reader) => Pin::new(reader).poll_read(cx, buf),
        }
    }
}

/// A request body, collected or still to be read.
#[derive(Debug)]
pub enum Payload<R> {
    /// Body read in full.
    Buffered(Bytes),
    /// Body still to be read.
    Streaming(Body<R>),
}

impl<R: AsyncBufRead + Unpin> Payload<R> {
    /// The complete body, reading any remainder of a streaming payload.
    ///
    /// # Errors
    ///
    /// Returns any error raised while reading the rest of the body.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Self::Buffered(bytes) => Ok(bytes),
            Self::Streaming(mut body) => {
                let mut out = Vec::new();
                body.read_to_end(&mut out).await?;
                Ok(Bytes::from(out))
            }
        }
    }
}

/// Reads request bodies according to their headers.
///
/// ```
/// use as2relay::{
///     message::Headers,
///     payload::{PayloadReader, ReadStrategy},
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let headers: Headers = [("Transfer-Encoding", "chunked")].into_iter().collect();
/// let reader = PayloadReader::new(ReadStrategy::Streaming);
/// let payload = reader.read(&headers, &b"5\r\nhello\r\n0\r\n"[..]).await?;
/// assert_eq!(&payload.into_bytes().await?[..], b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PayloadReader {
    strategy: ReadStrategy,
}

impl PayloadReader {
    /// Create a reader with the given strategy.
    #[must_use]
    pub fn new(strategy: ReadStrategy) -> Self { Self { strategy } }

    /// Strategy in use.
    #[must_use]
    pub fn strategy(&self) -> ReadStrategy { self.strategy }

    /// Read the body announced by `headers` from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Protocol`] for unacceptable framing headers
    /// and, with [`ReadStrategy::Buffered`], [`PayloadError::Io`] if the body
    /// cannot be read in full.
    pub async fn read<R>(&self, headers: &Headers, reader: R) -> Result<Payload<R>, PayloadError>
    where
        R: AsyncBufRead + Unpin,
    {
        let framing = Framing::from_headers(headers)?;
        tracing::debug!(?framing, strategy = ?self.strategy, "reading payload");
        let mut body = Body::new(framing, reader);
        match self.strategy {
            ReadStrategy::Streaming => Ok(Payload::Streaming(body)),
            ReadStrategy::Buffered => {
                let capacity = match framing {
                    Framing::Length(len) => len.min(PREALLOCATE_LIMIT),
                    Framing::Chunked => 0,
                };
                let mut out = Vec::with_capacity(usize::try_from(capacity).unwrap_or_default());
                body.read_to_end(&mut out).await?;
                Ok(Payload::Buffered(Bytes::from(out)))
            }
        }
    }

    /// Read the body announced by `message`'s headers into its payload.
    ///
    /// # Errors
    ///
    /// As for [`Self::read`]; the message payload is left untouched on error.
    pub async fn read_message<R>(&self, message: &mut Message, reader: R) -> Result<(), PayloadError>
    where
        R: AsyncBufRead + Unpin,
    {
        let payload = self.read(&message.headers, reader).await?;
        message.payload = payload.into_bytes().await?.to_vec();
        tracing::debug!(
            message_id = message.id(),
            len = message.payload.len(),
            "payload read"
        );
        Ok(())
    }
}
