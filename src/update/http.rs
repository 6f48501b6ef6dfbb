// Just enough HTTP/1.x for the upload page: request head parsing and canned responses.

use heapless::{String, Vec};
use thiserror::Error;
use ufmt::{uWrite, uwrite};

pub const MAX_LINE: usize = 128;
pub const MAX_PATH: usize = 32;
pub const MAX_BOUNDARY: usize = 70; // ← RFC 2046 limit

pub const INDEX_PAGE: &str = "<!DOCTYPE html><html><head><title>touchdrum update</title></head><body>\
<h1>Firmware update</h1>\
<form method='POST' action='/update' enctype='multipart/form-data'>\
<input type='file' name='update'><input type='submit' value='Update'>\
</form></body></html>";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    #[error("{}", self.reason())]
    RequestLineTooLong,
    #[error("{}", self.reason())]
    MalformedRequestLine,
    #[error("{}", self.reason())]
    BadContentLength,
    #[error("{}", self.reason())]
    MissingLength,
    #[error("{}", self.reason())]
    MissingBoundary,
    #[error("{}", self.reason())]
    BoundaryTooLong,
}

impl HttpError {
    pub const fn reason(&self) -> &'static str {
        match self {
            HttpError::RequestLineTooLong => "request line too long",
            HttpError::MalformedRequestLine => "malformed request line",
            HttpError::BadContentLength => "bad content length",
            HttpError::MissingLength => "missing content length",
            HttpError::MissingBoundary => "missing multipart boundary",
            HttpError::BoundaryTooLong => "multipart boundary too long",
        }
    }
}

impl ufmt::uDisplay for HttpError {
    fn fmt<W: uWrite + ?Sized>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error> {
        f.write_str(self.reason())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Index,
    Upload,
    NotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub path: String<MAX_PATH>,
    pub content_length: Option<u32>,
    pub boundary: Option<String<MAX_BOUNDARY>>,
    pub boundary_too_long: bool,
}

impl RequestHead {
    pub fn route(&self) -> Route {
        match (self.method, self.path.as_str()) {
            (Method::Get, "/") => Route::Index,
            (Method::Post, "/update") => Route::Upload,
            _ => Route::NotFound,
        }
    }
}

/// Byte-at-a-time request head parser. Header lines longer than `MAX_LINE` are skipped.
#[derive(Default)]
pub struct HeadParser {
    line: Vec<u8, MAX_LINE>,
    overflow: bool,
    head: Option<RequestHead>,
}

impl HeadParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Yields the head once the blank line after the headers arrives.
    pub fn push(&mut self, byte: u8) -> Result<Option<RequestHead>, HttpError> {
        if byte != b'\n' {
            if self.line.push(byte).is_err() {
                self.overflow = true;
            }
            return Ok(None);
        }

        let mut line = core::mem::take(&mut self.line);
        let overflow = core::mem::replace(&mut self.overflow, false);
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        match self.head.as_mut() {
            None => {
                if line.is_empty() && !overflow {
                    return Ok(None); // ← stray CRLF between requests
                }
                if overflow {
                    return Err(HttpError::RequestLineTooLong);
                }
                self.head = Some(parse_request_line(&line)?);
                Ok(None)
            }
            Some(head) => {
                if overflow {
                    return Ok(None);
                }
                if line.is_empty() {
                    return Ok(self.head.take());
                }
                apply_header(head, &line)?;
                Ok(None)
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.head.is_none() && self.line.is_empty()
    }
}

fn parse_request_line(line: &[u8]) -> Result<RequestHead, HttpError> {
    let text = core::str::from_utf8(line).map_err(|_| HttpError::MalformedRequestLine)?;
    let mut parts = text.split(' ').filter(|p| !p.is_empty());

    let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v)) => (m, t, v),
        _ => return Err(HttpError::MalformedRequestLine),
    };
    if !version.starts_with("HTTP/") || parts.next().is_some() {
        return Err(HttpError::MalformedRequestLine);
    }

    let method = match method {
        "GET" => Method::Get,
        "POST" => Method::Post,
        _ => Method::Other,
    };

    // drop the query string; an oversized path just won't route anywhere
    let path_only = target.split('?').next().unwrap_or("");
    let mut path = String::new();
    let _ = path.push_str(path_only);

    Ok(RequestHead { method, path, content_length: None, boundary: None, boundary_too_long: false })
}

fn apply_header(head: &mut RequestHead, line: &[u8]) -> Result<(), HttpError> {
    let Ok(text) = core::str::from_utf8(line) else {
        return Ok(());
    };
    let Some((name, value)) = text.split_once(':') else {
        return Ok(());
    };
    let (name, value) = (name.trim(), value.trim());

    if name.eq_ignore_ascii_case("content-length") {
        let n = value.parse::<u32>().map_err(|_| HttpError::BadContentLength)?;
        head.content_length = Some(n);
    } else if name.eq_ignore_ascii_case("content-type") {
        if let Some(raw) = boundary_param(value) {
            let mut b = String::new();
            if b.push_str(raw).is_err() {
                head.boundary_too_long = true;
            } else if !raw.is_empty() {
                head.boundary = Some(b);
            }
        }
    }
    Ok(())
}

fn boundary_param(content_type: &str) -> Option<&str> {
    let at = content_type.find("boundary=")?;
    let rest = &content_type[at + "boundary=".len()..];
    let raw = rest.split(';').next().unwrap_or("").trim();
    Some(raw.trim_matches('"'))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
}

impl Status {
    pub const fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
        }
    }
}

/// Status line and headers up to (not including) the blank line.
pub fn write_head<W: uWrite + ?Sized>(w: &mut W, status: Status, content_type: &str, len: usize) -> Result<(), W::Error> {
    uwrite!(w, "HTTP/1.1 {} {}\r\n", status.code(), status.reason())?;
    uwrite!(w, "Content-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n", content_type, len)
}

pub fn write_response<W: uWrite + ?Sized>(w: &mut W, status: Status, content_type: &str, body: &str) -> Result<(), W::Error> {
    write_head(w, status, content_type, body.len())?;
    w.write_str("\r\n")?;
    w.write_str(body)
}
