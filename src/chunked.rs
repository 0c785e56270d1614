//! HTTP/1.1 chunked transfer decoding.
//!
//! The accepted grammar is
//! `<hex>[;ext]* CR? LF <data> CR? LF ... "0" CR? LF`. Chunk extensions are
//! ignored and trailers after the terminal chunk are left unread.
//!
//! Two front ends share one decoding state machine:
//!
//! - [`ChunkDecoder`] is a [`tokio_util::codec::Decoder`] for use with
//!   `FramedRead`.
//! - [`ChunkedReader`] adapts any [`tokio::io::AsyncBufRead`] into an
//!   [`tokio::io::AsyncRead`] of the decoded body.
//!
//! Both report malformed or truncated input as [`io::Error`]s wrapping a
//! [`ChunkedError`].

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;

mod error;
mod reader;
mod state;
#[cfg(test)]
mod tests;

pub use error::{ChunkEof, ChunkedError};
pub use reader::ChunkedReader;
use state::{Feed, Machine};

/// Longest chunk-size line accepted, extensions included.
pub const MAX_SIZE_LINE: usize = 4096;

/// Parse the chunk size from a size line without its terminator.
///
/// Everything from the first `;` is an extension and ignored. The size is
/// the leading run of hexadecimal digits; a line without digits yields 0.
///
/// ```
/// use as2relay::chunked::parse_chunk_len;
///
/// assert_eq!(parse_chunk_len(b"1A;name=value"), Ok(26));
/// assert_eq!(parse_chunk_len(b"1f"), Ok(31));
/// assert_eq!(parse_chunk_len(b""), Ok(0));
/// ```
///
/// # Errors
///
/// Returns [`ChunkedError::SizeOverflow`] if the digits exceed `usize`.
pub fn parse_chunk_len(line: &[u8]) -> Result<usize, ChunkedError> {
    let size = line.split(|&b| b == b';').next().unwrap_or_default();
    let digits: Vec<u8> = size
        .iter()
        .copied()
        .take_while(u8::is_ascii_hexdigit)
        .collect();
    digits.iter().try_fold(0_usize, |acc, &digit| {
        let value = usize::from(hex_value(digit));
        acc.checked_mul(16)
            .and_then(|acc| acc.checked_add(value))
            .ok_or_else(|| ChunkedError::SizeOverflow {
                digits: String::from_utf8_lossy(&digits).into_owned(),
            })
    })
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Read one chunk-size line from `reader` and parse it.
///
/// The line ends at the first line feed; a carriage return must be
/// immediately followed by one.
///
/// # Errors
///
/// Returns an [`io::ErrorKind::UnexpectedEof`] error if the stream ends
/// before the line terminator, an [`io::ErrorKind::InvalidData`] error for a
/// malformed line, or any error from `reader`.
pub async fn read_chunk_len<R>(reader: &mut R) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut line = Vec::new();
    loop {
        match next_byte(reader).await? {
            b'\n' => break,
            b'\r' => match next_byte(reader).await? {
                b'\n' => break,
                found => return Err(ChunkedError::BareCarriageReturn { found }.into()),
            },
            byte => {
                if line.len() == MAX_SIZE_LINE {
                    return Err(ChunkedError::SizeLineTooLong {
                        limit: MAX_SIZE_LINE,
                    }
                    .into());
                }
                line.push(byte);
            }
        }
    }
    Ok(parse_chunk_len(&line)?)
}

async fn next_byte<R>(reader: &mut R) -> io::Result<u8>
where
    R: AsyncRead + Unpin + ?Sized,
{
    reader.read_u8().await.map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ChunkedError::Eof(ChunkEof::SizeLine).into()
        } else {
            err
        }
    })
}

/// Decoder yielding the payload of a chunked body as it arrives.
///
/// Items are slices of chunk data, not necessarily whole chunks. Once the
/// terminal chunk is consumed the decoder yields nothing more and leaves
/// any remaining bytes (trailers) in the buffer. Reaching end of input
/// before that point is an [`io::ErrorKind::UnexpectedEof`] error.
///
/// ```
/// use as2relay::chunked::ChunkDecoder;
/// use bytes::BytesMut;
/// use tokio_util::codec::Decoder;
///
/// let mut decoder = ChunkDecoder::new();
/// let mut buf = BytesMut::from(&b"3\r\nabc\r\n0\r\n"[..]);
/// assert_eq!(decoder.decode(&mut buf).unwrap().as_deref(), Some(&b"abc"[..]));
/// assert_eq!(decoder.decode_eof(&mut buf).unwrap(), None);
/// assert!(decoder.is_done());
/// ```
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    machine: Machine,
    failed: Option<ChunkedError>,
}

impl ChunkDecoder {
    /// Create a decoder positioned before the first size line.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// True once the terminal zero-size chunk has been consumed.
    #[must_use]
    pub fn is_done(&self) -> bool { self.machine.is_done() }

    fn fail(&mut self, err: ChunkedError) -> io::Error {
        self.failed = Some(err.clone());
        err.into()
    }
}

impl Decoder for ChunkDecoder {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(err) = &self.failed {
            return Err(err.clone().into());
        }
        while !self.machine.is_done() && !src.is_empty() {
            match self.machine.feed(src, usize::MAX) {
                Ok(Feed::Framing(n)) => src.advance(n),
                Ok(Feed::Data(n)) => return Ok(Some(src.split_to(n).freeze())),
                Err(err) => return Err(self.fail(err)),
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(data) = self.decode(src)? {
            return Ok(Some(data));
        }
        if self.machine.is_done() {
            return Ok(None);
        }
        let eof = self.machine.eof();
        Err(self.fail(ChunkedError::Eof(eof)))
    }
}
