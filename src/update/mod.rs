//! Firmware upload service.
//!
//! `GET /` serves a one-form page, `POST /update` streams the first multipart part into an
//! [`ImageWriter`]. The transport is any byte stream polled from the main loop; nothing here
//! blocks, so pads keep playing while an upload trickles in.
//!
//! A good image answers "OK" and asks the caller to restart. Anything else answers "FAIL" and
//! the service goes back to waiting for the next request.

pub mod flash;
pub mod http;
pub mod multipart;
pub mod stage;

use self::http::{write_head, write_response, HeadParser, HttpError, RequestHead, Route, Status, INDEX_PAGE};
use self::multipart::PartReader;
use heapless::Vec;
use thiserror::Error;
use ufmt::{uDisplay, uWrite, uwrite};

const PAGE: usize = 64;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    #[error("{}: {received} bytes received", self.reason())]
    Truncated { received: u32 },
    #[error("{}: {size} bytes, room for {capacity}", self.reason())]
    TooLarge { size: u32, capacity: u32 },
    #[error("{}", self.reason())]
    Empty,
    #[error("{}", self.reason())]
    Storage,
    #[error("{}", self.reason())]
    NotStarted,
}

impl UpdateError {
    pub const fn reason(&self) -> &'static str {
        match self {
            UpdateError::Truncated { .. } => "image incomplete",
            UpdateError::TooLarge { .. } => "image too large",
            UpdateError::Empty => "empty image",
            UpdateError::Storage => "image storage failed",
            UpdateError::NotStarted => "no update in progress",
        }
    }
}

impl uDisplay for UpdateError {
    fn fmt<W: uWrite + ?Sized>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error> {
        f.write_str(self.reason())?;
        match self {
            UpdateError::Truncated { received } => uwrite!(f, ": {} bytes received", received),
            UpdateError::TooLarge { size, capacity } => uwrite!(f, ": {} bytes, room for {}", size, capacity),
            _ => Ok(()),
        }
    }
}

/// Platform side of an update: wherever the image ends up and whatever makes it bootable.
pub trait ImageWriter {
    /// Prepare for a new image, discarding any half-written one.
    fn begin(&mut self) -> Result<(), UpdateError>;

    /// Store `chunk` at byte `offset` of the image.
    fn write(&mut self, offset: u32, chunk: &[u8]) -> Result<(), UpdateError>;

    /// The whole image (`len` bytes) is in; make it the one that boots next.
    fn commit(&mut self, len: u32) -> Result<(), UpdateError>;

    fn abort(&mut self) {}

    /// Size of a committed image the bootloader has not picked up yet.
    fn staged(&mut self) -> Option<u32> {
        None
    }
}

/// Buffers image bytes into pages for the writer and decides whether the result is usable.
pub struct UpdateSession<W: ImageWriter> {
    writer: W,
    page: Vec<u8, PAGE>,
    written: u32,
    expected: Option<u32>,
    error: Option<UpdateError>,
    active: bool,
}

impl<W: ImageWriter> UpdateSession<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, page: Vec::new(), written: 0, expected: None, error: None, active: false }
    }

    /// `expected` is the exact image size when the transport knows it.
    pub fn begin(&mut self, expected: Option<u32>) -> Result<(), UpdateError> {
        self.page.clear();
        self.written = 0;
        self.expected = expected;
        self.error = None;
        self.active = false;

        self.writer.begin()?;
        self.active = true;
        Ok(())
    }

    /// Queue one byte. The first failure sticks and is reported by `finish`.
    pub fn push_byte(&mut self, byte: u8) {
        if !self.active || self.error.is_some() {
            return;
        }
        if self.page.is_full() {
            if let Err(e) = self.flush_page() {
                self.error = Some(e);
                return;
            }
        }
        let _ = self.page.push(byte);
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), UpdateError> {
        if !self.active {
            return Err(UpdateError::NotStarted);
        }
        for &b in bytes {
            self.push_byte(b);
        }
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn received(&self) -> u32 {
        self.written + self.page.len() as u32
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Close the session. `complete` says whether the transport saw the end of the image.
    pub fn finish(&mut self, complete: bool) -> Result<u32, UpdateError> {
        if !self.active {
            return Err(UpdateError::NotStarted);
        }
        self.active = false;

        let result = self.settle(complete);
        if result.is_err() {
            self.writer.abort();
        }
        result
    }

    pub fn abort(&mut self) {
        if self.active {
            self.active = false;
            self.writer.abort();
        }
    }

    fn settle(&mut self, complete: bool) -> Result<u32, UpdateError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.flush_page()?;

        let received = self.written;
        if !complete {
            return Err(UpdateError::Truncated { received });
        }
        match self.expected {
            Some(n) if received < n => return Err(UpdateError::Truncated { received }),
            Some(n) if received > n => return Err(UpdateError::TooLarge { size: received, capacity: n }),
            _ => {}
        }
        if received == 0 {
            return Err(UpdateError::Empty);
        }

        self.writer.commit(received)?;
        Ok(received)
    }

    fn flush_page(&mut self) -> Result<(), UpdateError> {
        if self.page.is_empty() {
            return Ok(());
        }
        self.writer.write(self.written, &self.page)?;
        self.written += self.page.len() as u32;
        self.page.clear();
        Ok(())
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

/// What to send back for a finished request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Page,
    Uploaded { bytes: u32 },
    Failed(UpdateError),
    NotFound,
    BadRequest(HttpError),
}

impl Reply {
    /// Only a committed image restarts the device.
    pub fn restart(&self) -> bool {
        matches!(self, Reply::Uploaded { .. })
    }

    pub fn write_to<T: uWrite + ?Sized>(&self, w: &mut T) -> Result<(), T::Error> {
        match self {
            Reply::Page => write_response(w, Status::Ok, "text/html", INDEX_PAGE),
            Reply::Uploaded { .. } => write_response(w, Status::Ok, "text/plain", "OK"),
            Reply::Failed(e) => {
                write_head(w, Status::Ok, "text/plain", 4)?;
                uwrite!(w, "X-Update-Error: {}\r\n\r\nFAIL", e)
            }
            Reply::NotFound => write_response(w, Status::NotFound, "text/plain", "Not Found"),
            Reply::BadRequest(e) => write_response(w, Status::BadRequest, "text/plain", e.reason()),
        }
    }
}

enum Phase {
    Head(HeadParser),
    Upload { remaining: u32, parts: PartReader },
    // body of a request we already answered (or are about to)
    Drain { remaining: u32, reply: Reply },
}

pub struct UpdateServer<W: ImageWriter> {
    session: UpdateSession<W>,
    phase: Phase,
    last_byte_at: u32,
    idle_timeout_ms: u32,
}

impl<W: ImageWriter> UpdateServer<W> {
    pub fn new(writer: W, idle_timeout_ms: u32) -> Self {
        Self {
            session: UpdateSession::new(writer),
            phase: Phase::Head(HeadParser::new()),
            last_byte_at: 0,
            idle_timeout_ms,
        }
    }

    /// Feed one transport byte received at `now`.
    pub fn feed(&mut self, byte: u8, now: u32) -> Option<Reply> {
        self.last_byte_at = now;

        match &mut self.phase {
            Phase::Head(parser) => match parser.push(byte) {
                Ok(None) => None,
                Ok(Some(head)) => self.start(head),
                Err(e) => {
                    self.phase = Phase::Head(HeadParser::new());
                    Some(Reply::BadRequest(e))
                }
            },
            Phase::Upload { remaining, parts } => {
                *remaining -= 1;
                let session = &mut self.session;
                parts.push(byte, |b| session.push_byte(b));

                if *remaining > 0 {
                    return None;
                }
                let complete = parts.is_finished();
                self.phase = Phase::Head(HeadParser::new());
                Some(self.conclude(complete))
            }
            Phase::Drain { remaining, reply } => {
                *remaining -= 1;
                if *remaining > 0 {
                    return None;
                }
                let reply = *reply;
                self.phase = Phase::Head(HeadParser::new());
                Some(reply)
            }
        }
    }

    /// Give up on a request whose bytes stopped arriving. An interrupted upload fails.
    pub fn expire(&mut self, now: u32) -> Option<Reply> {
        if now.wrapping_sub(self.last_byte_at) < self.idle_timeout_ms {
            return None;
        }

        if matches!(&self.phase, Phase::Head(parser) if parser.is_idle()) {
            return None;
        }

        match core::mem::replace(&mut self.phase, Phase::Head(HeadParser::new())) {
            Phase::Head(_) => None,
            Phase::Upload { .. } => Some(self.conclude(false)),
            Phase::Drain { reply, .. } => Some(reply),
        }
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.phase, Phase::Upload { .. })
    }

    pub fn session(&self) -> &UpdateSession<W> {
        &self.session
    }

    pub fn staged_image(&mut self) -> Option<u32> {
        self.session.writer_mut().staged()
    }

    fn start(&mut self, head: RequestHead) -> Option<Reply> {
        let body = head.content_length.unwrap_or(0);

        let reply = match head.route() {
            Route::Index => Reply::Page,
            Route::NotFound => Reply::NotFound,
            Route::Upload => match self.open_upload(&head) {
                Ok(parts) => {
                    self.phase = Phase::Upload { remaining: body, parts };
                    return None;
                }
                Err(reply) => reply,
            },
        };

        if body > 0 {
            self.phase = Phase::Drain { remaining: body, reply };
            return None;
        }
        self.phase = Phase::Head(HeadParser::new());
        Some(reply)
    }

    fn open_upload(&mut self, head: &RequestHead) -> Result<PartReader, Reply> {
        match head.content_length {
            Some(n) if n > 0 => {}
            _ => return Err(Reply::BadRequest(HttpError::MissingLength)),
        }
        if head.boundary_too_long {
            return Err(Reply::BadRequest(HttpError::BoundaryTooLong));
        }
        let boundary = head.boundary.as_deref().unwrap_or("");
        let parts = PartReader::new(boundary).map_err(Reply::BadRequest)?;

        self.session.begin(None).map_err(Reply::Failed)?;
        Ok(parts)
    }

    fn conclude(&mut self, complete: bool) -> Reply {
        match self.session.finish(complete) {
            Ok(bytes) => Reply::Uploaded { bytes },
            Err(e) => Reply::Failed(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use alloc::format;
    use alloc::vec::Vec as AllocVec;

    /// A browser-style upload of `content`, with the last `cut` body bytes missing.
    pub fn upload_request(boundary: &str, content: &[u8], cut: usize) -> AllocVec<u8> {
        let mut body = AllocVec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"update\"; filename=\"fw.bin\"\r\n");
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body.truncate(body.len() - cut);

        let mut req = AllocVec::new();
        req.extend_from_slice(b"POST /update HTTP/1.1\r\nHost: drum\r\n");
        req.extend_from_slice(format!("Content-Type: multipart/form-data; boundary={boundary}\r\n").as_bytes());
        req.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
        req.extend_from_slice(&body);
        req
    }

    /// In-memory image store with an optional size limit.
    #[derive(Default)]
    pub struct MemImage {
        pub data: AllocVec<u8>,
        pub committed: Option<u32>,
        pub aborted: bool,
        pub begun: u32,
        pub capacity: Option<u32>,
        pub refuse_begin: bool,
    }

    impl ImageWriter for MemImage {
        fn begin(&mut self) -> Result<(), UpdateError> {
            if self.refuse_begin {
                return Err(UpdateError::Storage);
            }
            self.begun += 1;
            self.data.clear();
            self.committed = None;
            self.aborted = false;
            Ok(())
        }

        fn write(&mut self, offset: u32, chunk: &[u8]) -> Result<(), UpdateError> {
            let end = offset + chunk.len() as u32;
            if let Some(cap) = self.capacity {
                if end > cap {
                    return Err(UpdateError::TooLarge { size: end, capacity: cap });
                }
            }
            assert_eq!(offset as usize, self.data.len());
            self.data.extend_from_slice(chunk);
            Ok(())
        }

        fn commit(&mut self, len: u32) -> Result<(), UpdateError> {
            self.committed = Some(len);
            Ok(())
        }

        fn abort(&mut self) {
            self.aborted = true;
        }

        fn staged(&mut self) -> Option<u32> {
            self.committed
        }
    }
}
