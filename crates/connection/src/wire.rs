//! Minimal HTTP/1.1 exchange with exact-case header names.
//!
//! Proclaim matches the `ProclaimAuthToken` header name case-sensitively.
//! `reqwest` (through the `http` crate) lowercases every header name, so
//! command requests are written straight onto a `TcpStream` from an ordered
//! list of name/value pairs. The response is read until its body is framed
//! or the server closes.
//!
//! # Wire format
//!
//! ```text
//! REQUEST:  GET {target} HTTP/1.1\r\n
//!           {Name}: {value}\r\n        (in order, casing untouched)
//!           Connection: close\r\n
//!           \r\n
//!
//! RESPONSE: HTTP/1.1 {status} {reason}\r\n
//!           headers\r\n
//!           \r\n
//!           body (Content-Length, chunked, or until EOF)
//! ```

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::ControlError;

/// Upper bound on a response we are willing to buffer.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// An outgoing request.
#[derive(Debug, Clone)]
pub(crate) struct Request<'a> {
    pub method: &'static str,
    /// Path plus query string.
    pub target: String,
    /// Header pairs, written in order with their casing preserved.
    pub headers: Vec<(&'a str, String)>,
}

/// A fully read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Serializes the request head.
pub(crate) fn encode_request(host: &str, port: u16, req: &Request<'_>) -> Vec<u8> {
    let mut head = format!("{} {} HTTP/1.1\r\n", req.method, req.target);
    head.push_str(&format!("Host: {host}:{port}\r\n"));
    for (name, value) in &req.headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("Connection: close\r\n\r\n");
    head.into_bytes()
}

/// Sends `req` to `host:port` and reads the whole response.
///
/// The entire exchange (connect, write, read) is bounded by `timeout`.
pub(crate) async fn send(
    host: &str,
    port: u16,
    req: &Request<'_>,
    timeout: Duration,
) -> Result<Response, ControlError> {
    match tokio::time::timeout(timeout, exchange(host, port, req)).await {
        Ok(result) => result,
        Err(_) => Err(ControlError::Unreachable("request timed out".into())),
    }
}

async fn exchange(host: &str, port: u16, req: &Request<'_>) -> Result<Response, ControlError> {
    let mut stream = TcpStream::connect((host, port)).await?;
    stream.write_all(&encode_request(host, port, req)).await?;
    stream.flush().await?;

    // Stop as soon as the body is framed; servers may keep the socket open.
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);
        if is_complete(&raw)? {
            break;
        }
        if raw.len() > MAX_RESPONSE_BYTES {
            return Err(ControlError::Protocol(format!(
                "response exceeds {MAX_RESPONSE_BYTES} bytes"
            )));
        }
    }
    parse_response(&raw)
}

/// How the response body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Length(usize),
    Chunked,
    UntilClose,
}

/// Status line and framing headers.
#[derive(Debug)]
struct Head {
    status: u16,
    framing: Framing,
    /// Offset of the first body byte.
    body_start: usize,
}

/// Parses the response head, or returns `None` while it is still incomplete.
fn parse_head(raw: &[u8]) -> Result<Option<Head>, ControlError> {
    let Some(head_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
        return Ok(None);
    };
    let head = std::str::from_utf8(&raw[..head_end])
        .map_err(|e| ControlError::Protocol(format!("invalid response head: {e}")))?;
    let mut lines = head.split("\r\n");

    let status_line = lines.next().unwrap_or_default();
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(ControlError::Protocol(format!(
            "unexpected status line: {status_line}"
        )));
    }
    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| ControlError::Protocol(format!("bad status code: {status_line}")))?;

    let mut framing = Framing::UntilClose;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("transfer-encoding")
            && value.to_ascii_lowercase().contains("chunked")
        {
            framing = Framing::Chunked;
        } else if name.eq_ignore_ascii_case("content-length")
            && framing != Framing::Chunked
            && let Ok(len) = value.parse::<usize>()
        {
            framing = Framing::Length(len);
        }
    }
    // No body for these, whatever the headers say.
    if status == 204 || status == 304 || (100..200).contains(&status) {
        framing = Framing::Length(0);
    }

    Ok(Some(Head {
        status,
        framing,
        body_start: head_end + 4,
    }))
}

/// Returns true once `raw` holds a whole response.
fn is_complete(raw: &[u8]) -> Result<bool, ControlError> {
    let Some(head) = parse_head(raw)? else {
        return Ok(false);
    };
    let rest = &raw[head.body_start..];
    Ok(match head.framing {
        Framing::Length(len) => rest.len() >= len,
        Framing::Chunked => decode_chunked(rest).is_ok(),
        Framing::UntilClose => false,
    })
}

/// Parses a complete response buffer.
pub(crate) fn parse_response(raw: &[u8]) -> Result<Response, ControlError> {
    let head = parse_head(raw)?
        .ok_or_else(|| ControlError::Protocol("response head not terminated".into()))?;
    let rest = &raw[head.body_start..];
    let body = match head.framing {
        Framing::Chunked => decode_chunked(rest)?,
        Framing::Length(len) => rest[..len.min(rest.len())].to_vec(),
        Framing::UntilClose => rest.to_vec(),
    };

    Ok(Response {
        status: head.status,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>, ControlError> {
    let mut out = Vec::new();
    loop {
        let line_end = data
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| ControlError::Protocol("truncated chunk size".into()))?;
        let size_str = std::str::from_utf8(&data[..line_end])
            .map_err(|_| ControlError::Protocol("invalid chunk size".into()))?;
        let size_hex = size_str.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| ControlError::Protocol(format!("invalid chunk size: {size_hex}")))?;
        data = &data[line_end + 2..];
        if size == 0 {
            return Ok(out);
        }
        if data.len() < size {
            return Err(ControlError::Protocol("truncated chunk".into()));
        }
        out.extend_from_slice(&data[..size]);
        data = data.get(size + 2..).unwrap_or_default();
    }
}
