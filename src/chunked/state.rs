//! Byte-at-a-time chunked decoding state shared by the codec and the reader.
//!
//! The machine never needs lookahead: partial size lines are buffered
//! internally and a pending carriage return is remembered across calls, so
//! input may be split at any byte.

use super::{ChunkEof, ChunkedError, MAX_SIZE_LINE, parse_chunk_len};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Size { cr: bool },
    Data { remaining: usize },
    Terminator { cr: bool },
    Done,
}

/// Result of feeding input to the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Feed {
    /// `n` framing bytes were consumed; no payload was produced.
    Framing(usize),
    /// The first `n` input bytes are payload and were consumed.
    Data(usize),
}

#[derive(Debug)]
pub(super) struct Machine {
    state: State,
    line: Vec<u8>,
}

impl Default for Machine {
    fn default() -> Self {
        Self {
            state: State::Size { cr: false },
            line: Vec::new(),
        }
    }
}

impl Machine {
    /// True once the terminal zero-size chunk has been consumed.
    pub(super) fn is_done(&self) -> bool { self.state == State::Done }

    /// Error to report if the input ends now.
    pub(super) fn eof(&self) -> ChunkEof {
        match self.state {
            State::Size { .. } | State::Done => ChunkEof::SizeLine,
            State::Data { remaining } => ChunkEof::Data { remaining },
            State::Terminator { .. } => ChunkEof::Terminator,
        }
    }

    /// Consume a prefix of `input`, producing at most `max_data` payload
    /// bytes.
    pub(super) fn feed(&mut self, input: &[u8], max_data: usize) -> Result<Feed, ChunkedError> {
        match self.state {
            State::Size { cr } => self.feed_size_line(input, cr),
            State::Data { remaining } => {
                let n = remaining.min(input.len()).min(max_data);
                let remaining = remaining - n;
                self.state = if remaining == 0 {
                    State::Terminator { cr: false }
                } else {
                    State::Data { remaining }
                };
                Ok(Feed::Data(n))
            }
            State::Terminator { cr } => {
                let Some(&byte) = input.first() else {
                    return Ok(Feed::Framing(0));
                };
                match (cr, byte) {
                    (_, LF) => self.state = State::Size { cr: false },
                    (false, CR) => self.state = State::Terminator { cr: true },
                    (_, found) => return Err(ChunkedError::MissingDataTerminator { found }),
                }
                Ok(Feed::Framing(1))
            }
            State::Done => Ok(Feed::Framing(0)),
        }
    }

    fn feed_size_line(&mut self, input: &[u8], mut cr: bool) -> Result<Feed, ChunkedError> {
        for (i, &byte) in input.iter().enumerate() {
            match (cr, byte) {
                (_, LF) => {
                    self.finish_size_line()?;
                    return Ok(Feed::Framing(i + 1));
                }
                (true, found) => return Err(ChunkedError::BareCarriageReturn { found }),
                (false, CR) => cr = true,
                (false, other) => {
                    if self.line.len() == MAX_SIZE_LINE {
                        return Err(ChunkedError::SizeLineTooLong {
                            limit: MAX_SIZE_LINE,
                        });
                    }
                    self.line.push(other);
                }
            }
        }
        self.state = State::Size { cr };
        Ok(Feed::Framing(input.len()))
    }

    fn finish_size_line(&mut self) -> Result<(), ChunkedError> {
        let len = parse_chunk_len(&self.line)?;
        self.line.clear();
        self.state = match len {
            0 => State::Done,
            remaining => State::Data { remaining },
        };
        Ok(())
    }
}
