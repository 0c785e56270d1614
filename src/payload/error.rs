//! Errors raised while reading an HTTP payload.

use std::io;

use thiserror::Error;

/// Request framing the receiver refuses, with the HTTP status to answer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// `Transfer-Encoding` names something other than `chunked`.
    #[error("unsupported Transfer-Encoding {value:?}")]
    UnsupportedTransferEncoding {
        /// Header value received.
        value: String,
    },
    /// Neither `Transfer-Encoding` nor `Content-Length` was sent.
    #[error("Content-Length required")]
    LengthRequired,
    /// `Content-Length` is not a non-negative integer.
    #[error("invalid Content-Length {value:?}")]
    InvalidContentLength {
        /// Header value received.
        value: String,
    },
}

impl ProtocolError {
    /// HTTP status code a receiver answers this error with.
    ///
    /// ```
    /// use as2relay::payload::ProtocolError;
    ///
    /// assert_eq!(ProtocolError::LengthRequired.status_code(), 411);
    /// ```
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnsupportedTransferEncoding { .. } => 501,
            Self::LengthRequired => 411,
            Self::InvalidContentLength { .. } => 400,
        }
    }
}

/// Failure to obtain a payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The request framing is unacceptable.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Reading the body failed, including premature end of stream.
    #[error("failed to read payload: {0}")]
    Io(#[from] io::Error),
}

impl PayloadError {
    /// HTTP status code for a protocol error; `None` for I/O failures.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Protocol(err) => Some(err.status_code()),
            Self::Io(_) => None,
        }
    }
}
