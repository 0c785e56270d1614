//! Versioned on-disk encoding of a durable resend.
//!
//! A record file is the four-byte magic [`RECORD_MAGIC`], a network-order
//! `u16` format version, then the bincode (standard configuration) encoding
//! of a [`ResendRecord`].

use bincode::{
    Decode,
    Encode,
    config,
    decode_from_slice,
    encode_to_vec,
    error::{DecodeError, EncodeError},
};
use thiserror::Error;

use crate::{
    byte_order::{read_network_u16, write_network_u16},
    message::Message,
};

/// Leading bytes identifying a resend record file.
pub const RECORD_MAGIC: [u8; 4] = *b"AS2R";
/// Format version written by this crate.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = RECORD_MAGIC.len() + 2;

/// Errors raised while reading or writing a resend record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The file does not start with [`RECORD_MAGIC`].
    #[error("not a resend record")]
    BadMagic,
    /// The header names a format this crate cannot read.
    #[error("unsupported resend record version {0}")]
    UnsupportedVersion(u16),
    /// The file ends inside the header.
    #[error("resend record truncated: {0} bytes")]
    Truncated(usize),
    /// Bytes remain after the encoded record.
    #[error("{0} trailing bytes after resend record")]
    TrailingBytes(usize),
    /// The record body could not be encoded.
    #[error("failed to encode resend record: {0}")]
    Encode(#[from] EncodeError),
    /// The record body could not be decoded.
    #[error("failed to decode resend record: {0}")]
    Decode(#[from] DecodeError),
}

/// The three logical fields persisted for each durable resend.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct ResendRecord {
    /// Action to re-dispatch.
    pub resend_action: String,
    /// Retries remaining before this record's attempt is taken.
    pub retries: u32,
    /// Message to resubmit.
    pub message: Message,
}

impl ResendRecord {
    /// Serialize the record with its header.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Encode`] if the body cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        let body = encode_to_vec(self, config::standard())?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&RECORD_MAGIC);
        bytes.extend_from_slice(&write_network_u16(FORMAT_VERSION));
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Parse a record previously written by [`Self::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] describing the first problem found.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let (Some(magic), Some(version), Some(body)) = (
            bytes.get(..RECORD_MAGIC.len()),
            bytes.get(RECORD_MAGIC.len()..HEADER_LEN),
            bytes.get(HEADER_LEN..),
        ) else {
            return Err(RecordError::Truncated(bytes.len()));
        };
        if magic != RECORD_MAGIC {
            return Err(RecordError::BadMagic);
        }
        let version = read_network_u16([version[0], version[1]]);
        if version != FORMAT_VERSION {
            return Err(RecordError::UnsupportedVersion(version));
        }
        let (record, consumed) = decode_from_slice::<Self, _>(body, config::standard())?;
        match body.len() - consumed {
            0 => Ok(record),
            trailing => Err(RecordError::TrailingBytes(trailing)),
        }
    }
}
