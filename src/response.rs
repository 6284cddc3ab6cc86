//! The outbound write surface: the [`ResponseWriter`] contract and a
//! buffered implementation.
//!
//! Handlers produce their response by writing into a `ResponseWriter`. The
//! contract mirrors what the wire allows: the status line is decided by the
//! first status write (or implied `200` by the first body write), headers
//! land before the body, and body bytes may arrive across any number of
//! calls. Instrumentation wraps this trait; hosts implement it over their
//! connection, or use [`ResponseBuffer`] when they assemble whole responses
//! in memory first.

use std::io;

use bytes::BytesMut;
use http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// Where a handler writes its response.
///
/// Implementations must tolerate handlers that never write a status (the
/// first body write implies `200`), that write the status more than once
/// (only the first call may take effect), and that write the body in many
/// small pieces.
pub trait ResponseWriter: Send {
    /// Records the response status. Only the first call takes effect.
    fn write_status(&mut self, status: u16);

    /// Appends a response header.
    fn insert_header(&mut self, name: &str, value: &str);

    /// Writes a chunk of body bytes, returning how many were accepted.
    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize>;
}

// ── ResponseBuffer ────────────────────────────────────────────────────────────

/// A `ResponseWriter` that buffers the whole response in memory.
///
/// Suitable for hosts that serialize a complete response per request, and
/// for tests. [`write_to`](ResponseBuffer::write_to) flushes the buffered
/// response as HTTP/1.1 over any async writer.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: u16,
    headers: Vec<(String, String)>,
    body: BytesMut,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded status, or `0` if no status was written yet.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Serializes the buffered response as HTTP/1.1.
    ///
    /// A response nothing was written to goes out as an empty `200 OK`,
    /// which is what a handler that returns without writing means on the
    /// wire.
    pub async fn write_to<W: AsyncWrite + Unpin>(self, writer: &mut W) -> io::Result<()> {
        let status = if self.status == 0 { 200 } else { self.status };
        writer
            .write_all(format!("HTTP/1.1 {} {}\r\n", status, reason(status)).as_bytes())
            .await?;
        writer
            .write_all(format!("content-length: {}\r\n", self.body.len()).as_bytes())
            .await?;
        for (name, value) in &self.headers {
            writer.write_all(format!("{name}: {value}\r\n").as_bytes()).await?;
        }
        writer.write_all(b"\r\n").await?;
        writer.write_all(&self.body).await?;
        writer.flush().await
    }
}

impl ResponseWriter for ResponseBuffer {
    fn write_status(&mut self, status: u16) {
        // First write wins, as on the wire.
        if self.status == 0 {
            self.status = status;
        }
    }

    fn insert_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

fn reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_status_write_wins() {
        let mut res = ResponseBuffer::new();
        res.write_status(201);
        res.write_status(500);
        assert_eq!(res.status(), 201);
    }

    #[test]
    fn body_accumulates_across_writes() {
        let mut res = ResponseBuffer::new();
        res.write_body(b"hello ").unwrap();
        res.write_body(b"world").unwrap();
        assert_eq!(res.body(), b"hello world");
    }

    #[tokio::test]
    async fn serializes_http1_with_default_status() {
        let mut res = ResponseBuffer::new();
        res.insert_header("content-type", "text/plain; charset=utf-8");
        res.write_body(b"ok").unwrap();

        let mut wire = Vec::new();
        res.write_to(&mut wire).await.unwrap();

        let text = String::from_utf8(wire).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("content-length: 2\r\n"));
        assert!(text.ends_with("\r\n\r\nok"));
    }
}
