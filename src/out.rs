//! The output writer shared by the answer emitter (C9) and the outbound
//! request writer (`http_client`).
//!
//! Mirrors the teacher's `Out`/`Writer` split: a borrowed buffer plus a
//! write position, with helpers that fail closed (`Error::OutputOverflow`)
//! rather than panicking when a write would run past the end.

use crate::error::{Error, Result};
use crate::header::{Method, StatusCode, Version};
use crate::value::WriteValue;

/// A bump-allocated view into a caller-owned output buffer.
pub struct Out<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Out<'a> {
    pub fn wrap(buf: &'a mut [u8]) -> Self {
        Out { buf, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The unused tail of the buffer, e.g. for a body read.
    pub fn remaining_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.pos..]
    }

    fn output(&mut self, bytes: &[u8]) -> Result<()> {
        if self.pos + bytes.len() > self.buf.len() {
            return Err(Error::OutputOverflow);
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Commits `n` bytes already written directly into `remaining_mut()`.
    pub fn commit(&mut self, n: usize) {
        self.pos += n;
    }

    /// The bytes written so far, without consuming `self` the way
    /// `finish` does. Used by the answer emitter (C9), which flushes a
    /// status/header block or a body chunk to the socket and then keeps
    /// writing into the same buffer for the next piece.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Rewinds the write position to the start, for reuse as scratch
    /// space once `written()` has been flushed elsewhere.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> bool {
        self.output(bytes).is_ok()
    }

    /// `HTTP/1.1 200 Ok\r\n` (spec.md §4.9 — status line).
    pub fn write_status_line(&mut self, version: Version, status: StatusCode) -> bool {
        if !self.write_bytes(version.as_str().as_bytes()) {
            return false;
        }
        if !self.write_bytes(b" ") {
            return false;
        }
        let mut code = [0u8; 3];
        let c = status.code();
        code[0] = b'0' + (c / 100) as u8;
        code[1] = b'0' + (c / 10 % 10) as u8;
        code[2] = b'0' + (c % 10) as u8;
        if !self.write_bytes(&code) {
            return false;
        }
        if !self.write_bytes(b" ") {
            return false;
        }
        if !self.write_bytes(status.reason().as_bytes()) {
            return false;
        }
        self.write_bytes(b"\r\n")
    }

    /// `METHOD path HTTP/1.1\r\n` (outbound request line, `http_client`).
    pub fn write_request_line(&mut self, method: Method, path: &[u8], version: Version) -> bool {
        self.write_bytes(method.as_str().as_bytes())
            && self.write_bytes(b" ")
            && self.write_bytes(path)
            && self.write_bytes(b" ")
            && self.write_bytes(version.as_str().as_bytes())
            && self.write_bytes(b"\r\n")
    }

    /// `Name: <value>\r\n`, used by the generated header-set `send_headers`.
    pub fn write_header(&mut self, name: &str, value: &dyn WriteValue) -> bool {
        if !self.write_bytes(name.as_bytes()) {
            return false;
        }
        if !self.write_bytes(b": ") {
            return false;
        }
        let mut size = 0usize;
        let ok = value.write(self.remaining_mut(), &mut size);
        if !ok {
            return false;
        }
        self.commit(size);
        self.write_bytes(b"\r\n")
    }

    /// A raw `Name: literal\r\n` header, for values not backed by a
    /// `WriteValue` slot (`Content-Length`, `Transfer-Encoding`).
    pub fn write_raw_header(&mut self, name: &str, value: &[u8]) -> bool {
        self.write_bytes(name.as_bytes()) && self.write_bytes(b": ") && self.write_bytes(value) && self.write_bytes(b"\r\n")
    }

    pub fn write_crlf(&mut self) -> bool {
        self.write_bytes(b"\r\n")
    }

    pub fn finish(self) -> &'a [u8] {
        &self.buf[..self.pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_status_line() {
        let mut buf = [0u8; 64];
        let mut out = Out::wrap(&mut buf);
        assert!(out.write_status_line(Version::Http11, StatusCode::Ok));
        assert_eq!(out.finish(), b"HTTP/1.1 200 Ok\r\n");
    }

    #[test]
    fn overflow_fails_without_partial_commit() {
        let mut buf = [0u8; 4];
        let mut out = Out::wrap(&mut buf);
        assert!(!out.write_bytes(b"too long"));
        assert_eq!(out.pos(), 0);
    }

    #[test]
    fn raw_header_round_trip() {
        let mut buf = [0u8; 64];
        let mut out = Out::wrap(&mut buf);
        assert!(out.write_raw_header("Content-Length", b"42"));
        assert_eq!(out.finish(), b"Content-Length: 42\r\n");
    }
}
