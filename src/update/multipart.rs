// Streaming extraction of the first part of a multipart/form-data body.
//
// The body is matched against "\r\n--<boundary>" with a hold-back buffer no longer than the
// delimiter, so image bytes stream straight through and never need the whole body in RAM.

use super::http::{HttpError, MAX_BOUNDARY};
use heapless::Vec;

const MAX_DELIMITER: usize = MAX_BOUNDARY + 4;
const BLANK_LINE: u32 = 0x0D0A_0D0A;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Preamble,
    PartHeaders,
    Body,
    Done,
}

pub struct PartReader {
    delimiter: Vec<u8, MAX_DELIMITER>,
    held: Vec<u8, MAX_DELIMITER>,
    tail: u32,
    state: State,
}

impl PartReader {
    pub fn new(boundary: &str) -> Result<Self, HttpError> {
        if boundary.is_empty() {
            return Err(HttpError::MissingBoundary);
        }
        if boundary.len() > MAX_BOUNDARY {
            return Err(HttpError::BoundaryTooLong);
        }

        let mut delimiter = Vec::new();
        // capacity checked above
        let _ = delimiter.extend_from_slice(b"\r\n--");
        let _ = delimiter.extend_from_slice(boundary.as_bytes());

        // the opening delimiter has no CRLF in front of it; pretend it does
        let mut held = Vec::new();
        let _ = held.extend_from_slice(b"\r\n");

        Ok(Self { delimiter, held, tail: 0, state: State::Preamble })
    }

    /// Feed one body byte; content bytes of the first part are handed to `emit`.
    /// Returns true once the part's closing delimiter has been seen.
    pub fn push<F: FnMut(u8)>(&mut self, byte: u8, mut emit: F) -> bool {
        match self.state {
            State::Preamble => {
                if self.scan(byte, |_| {}) {
                    self.state = State::PartHeaders;
                    self.tail = 0;
                }
            }
            State::PartHeaders => {
                self.tail = (self.tail << 8) | byte as u32;
                if self.tail == BLANK_LINE {
                    self.state = State::Body;
                }
            }
            State::Body => {
                if self.scan(byte, &mut emit) {
                    self.state = State::Done;
                }
            }
            State::Done => {}
        }
        self.state == State::Done
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Done
    }

    #[cfg(test)]
    fn in_body(&self) -> bool {
        self.state == State::Body
    }

    // `held` is always a proper prefix of the delimiter between calls.
    fn scan<F: FnMut(u8)>(&mut self, byte: u8, mut emit: F) -> bool {
        let _ = self.held.push(byte);
        loop {
            if self.delimiter.starts_with(&self.held) {
                if self.held.len() == self.delimiter.len() {
                    self.held.clear();
                    return true;
                }
                return false;
            }
            emit(self.held[0]);
            let len = self.held.len();
            self.held.copy_within(1.., 0);
            self.held.truncate(len - 1);
        }
    }
}
