//! [`AsyncRead`] adapter over a chunked body.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll, ready},
};

use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};

use super::{ChunkedError, Feed, Machine};

#[derive(Debug)]
enum Failure {
    Chunked(ChunkedError),
    Io(io::ErrorKind, String),
}

impl Failure {
    fn to_io(&self) -> io::Error {
        match self {
            Self::Chunked(err) => err.clone().into(),
            Self::Io(kind, message) => io::Error::new(*kind, message.clone()),
        }
    }
}

/// Reads the decoded body of a chunked stream.
///
/// Data is returned across chunk boundaries. After the terminal zero-size
/// chunk every read returns `Ok(0)`, and the bytes following it (trailers)
/// remain unread in the inner reader. If the inner reader ends first, the
/// read fails with [`io::ErrorKind::UnexpectedEof`]; an empty stream is no
/// exception. Once a read has failed, every later read fails with the same
/// error kind.
///
/// ```
/// use as2relay::chunked::ChunkedReader;
/// use tokio::io::AsyncReadExt;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> std::io::Result<()> {
/// let mut reader = ChunkedReader::new(&b"3\n123\r\n0\r\n"[..]);
/// let mut body = String::new();
/// reader.read_to_string(&mut body).await?;
/// assert_eq!(body, "123");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChunkedReader<R> {
    inner: R,
    machine: Machine,
    failure: Option<Failure>,
}

impl<R> ChunkedReader<R> {
    /// Decode the chunked stream read from `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            machine: Machine::default(),
            failure: None,
        }
    }

    /// True once the terminal zero-size chunk has been consumed.
    pub fn is_done(&self) -> bool { self.machine.is_done() }

    /// Borrow the inner reader.
    pub fn get_ref(&self) -> &R { &self.inner }

    /// Recover the inner reader, positioned after the last consumed byte.
    pub fn into_inner(self) -> R { self.inner }

    fn fail(&mut self, failure: Failure) -> io::Error {
        let err = failure.to_io();
        self.failure = Some(failure);
        err
    }
}

impl<R: AsyncBufRead + Unpin> AsyncRead for ChunkedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(failure) = &this.failure {
            return Poll::Ready(Err(failure.to_io()));
        }
        if out.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        while !this.machine.is_done() {
            let input = match ready!(Pin::new(&mut this.inner).poll_fill_buf(cx)) {
                Ok(input) => input,
                Err(err) => {
                    let failure = Failure::Io(err.kind(), err.to_string());
                    return Poll::Ready(Err(this.fail(failure)));
                }
            };
            if input.is_empty() {
                let eof = ChunkedError::Eof(this.machine.eof());
                return Poll::Ready(Err(this.fail(Failure::Chunked(eof))));
            }
            match this.machine.feed(input, out.remaining()) {
                Ok(Feed::Framing(n)) => Pin::new(&mut this.inner).consume(n),
                Ok(Feed::Data(n)) => {
                    out.put_slice(&input[..n]);
                    Pin::new(&mut this.inner).consume(n);
                    return Poll::Ready(Ok(()));
                }
                Err(err) => return Poll::Ready(Err(this.fail(Failure::Chunked(err)))),
            }
        }
        Poll::Ready(Ok(()))
    }
}
