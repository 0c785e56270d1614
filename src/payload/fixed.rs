//! Reader for a body of known length.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll, ready},
};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf, Take};

/// Reads exactly the declared length, failing with
/// [`io::ErrorKind::UnexpectedEof`] if the inner reader ends sooner.
#[derive(Debug)]
pub(super) struct FixedLengthReader<R> {
    inner: Take<R>,
}

impl<R: AsyncRead + Unpin> FixedLengthReader<R> {
    pub(super) fn new(inner: R, len: u64) -> Self { Self { inner: inner.take(len) } }
}

impl<R: AsyncRead> FixedLengthReader<R> {
    pub(super) fn into_inner(self) -> R { self.inner.into_inner() }
}

impl<R: AsyncRead + Unpin> AsyncRead for FixedLengthReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let outstanding = this.inner.limit();
        if outstanding == 0 || out.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        let before = out.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, out))?;
        if out.filled().len() == before {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("body ended with {outstanding} bytes outstanding"),
            )));
        }
        Poll::Ready(Ok(()))
    }
}
