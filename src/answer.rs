//! The answer emitter (spec.md C9).
//!
//! A route callback hands back one `Answer` shape and this module turns it
//! into wire bytes: status line, header block (the route's own
//! `ResponseHeaderSet` plus whichever content header applies), and body.
//! Everything is written through the caller's `Out` buffer and flushed to
//! the caller's `Socket` a piece at a time — there is no body-sized
//! allocation anywhere in this path, matching spec.md §4.9's fixed-memory
//! requirement.
//!
//! `chunk` is split out as its own sub-module because `http_client`'s
//! response body reader (spec.md §3 supplement) decodes the same
//! `HEX-LEN CRLF payload CRLF` framing this emitter writes.

use crate::error::{Error, Result};
use crate::header::{Method, Mime, StatusCode, Version};
use crate::headerset::ResponseHeaderSet;
use crate::out::Out;
use crate::socket::Socket;
use crate::view::ByteView;

/// Chunk-transfer-coding framing, shared between C9's emitter and
/// `http_client`'s response body reader.
pub mod chunk {
    use crate::out::Out;

    /// Writes one chunk as `HEX-LEN CRLF payload CRLF`. An empty `payload`
    /// writes the `0 CRLF CRLF` terminator (spec.md §4.9).
    pub fn write_chunk(out: &mut Out<'_>, payload: &[u8]) -> bool {
        let mut hexbuf = [0u8; 16];
        let hex = to_hex(payload.len(), &mut hexbuf);
        out.write_bytes(hex) && out.write_crlf() && out.write_bytes(payload) && out.write_crlf()
    }

    fn to_hex(n: usize, buf: &mut [u8; 16]) -> &[u8] {
        if n == 0 {
            buf[0] = b'0';
            return &buf[..1];
        }
        let mut tmp = [0u8; 16];
        let mut i = 16;
        let mut rest = n;
        while rest > 0 {
            i -= 1;
            let d = (rest % 16) as u8;
            tmp[i] = if d < 10 { b'0' + d } else { b'a' + (d - 10) };
            rest /= 16;
        }
        let len = 16 - i;
        buf[..len].copy_from_slice(&tmp[i..]);
        &buf[..len]
    }

    /// Parses a chunk-size line's hex digits, matching the emitter's own
    /// `to_hex` (no chunk extensions — spec.md §4.6 does not mention them).
    pub fn parse_hex_len(digits: &[u8]) -> Option<usize> {
        if digits.is_empty() {
            return None;
        }
        let mut n: usize = 0;
        for &b in digits {
            let d = match b {
                b'0'..=b'9' => b - b'0',
                b'a'..=b'f' => b - b'a' + 10,
                b'A'..=b'F' => b - b'A' + 10,
                _ => return None,
            };
            n = n.checked_mul(16)?.checked_add(d as usize)?;
        }
        Some(n)
    }

}

/// Scratch size for one producer-supplied chunk payload (`Answer::Captured`)
/// or one body-stream read (`Answer::Stream`), independent of `Out`'s own
/// backing buffer.
const BODY_SCRATCH: usize = 512;

/// One of spec.md's four answer shapes (`CodeAnswer`/`SimpleAnswer`/
/// `StreamAnswer`/`CapturedAnswer`), generalized over the route's declared
/// response header set `H`.
pub enum Answer<'a, H: ResponseHeaderSet> {
    /// Status line and `Content-Length: 0` only.
    Code(StatusCode),
    /// A body known in full up front.
    Simple { code: StatusCode, mime: Mime, body: ByteView<'a> },
    /// A body of known total length, read incrementally. `source` fills
    /// `buf` and returns the count written; `0` before `len` bytes have
    /// been produced is a length mismatch.
    Stream {
        code: StatusCode,
        headers: H,
        len: usize,
        source: &'a mut dyn FnMut(&mut [u8]) -> usize,
    },
    /// A body of unknown total length, chunk-encoded as it's produced.
    /// `producer` fills `buf` and returns the count written; `0` marks the
    /// final chunk.
    Captured {
        code: StatusCode,
        headers: H,
        producer: &'a mut dyn FnMut(&mut [u8]) -> usize,
    },
}

/// `HEAD` requests get a full header block but no body (spec.md §4.9).
pub fn skip_body_for(method: Method) -> bool {
    matches!(method, Method::Head)
}

/// Writes `answer` to `socket`, via `out` as the scratch/flush buffer.
/// `skip_body` should be `skip_body_for(request_method)`.
pub fn emit<S: Socket, H: ResponseHeaderSet>(answer: Answer<'_, H>, skip_body: bool, out: &mut Out<'_>, socket: &mut S) -> Result<()> {
    match answer {
        Answer::Code(code) => {
            write_head(out, code, &H::default(), None)?;
            flush(out, socket)
        }
        Answer::Simple { code, mime, body } => {
            write_head_with_mime(out, code, mime, Some(body.len()))?;
            flush(out, socket)?;
            if skip_body {
                return Ok(());
            }
            send_all(socket, body.as_bytes())
        }
        Answer::Stream { code, headers, len, source } => {
            write_head(out, code, &headers, Some(len))?;
            flush(out, socket)?;
            if skip_body {
                return Ok(());
            }
            stream_fixed_body(out, socket, len, source)
        }
        Answer::Captured { code, headers, producer } => {
            write_chunked_head(out, code, &headers)?;
            flush(out, socket)?;
            if skip_body {
                return Ok(());
            }
            stream_chunked_body(out, socket, producer)
        }
    }
}

/// A bare status line plus the empty-header-block terminator — no headers,
/// no `Content-Length`. Spec.md's oversized-header scenario (S4) is the one
/// reply that can't declare a body length: the vault that overran has
/// nothing left to frame, unlike the 400/404 paths, which still reply
/// `Content-Length: 0` via `Answer::Code`.
pub fn emit_status_line_only<S: Socket>(code: StatusCode, out: &mut Out<'_>, socket: &mut S) -> Result<()> {
    if !out.write_status_line(Version::Http11, code) {
        return Err(Error::OutputOverflow);
    }
    if !out.write_crlf() {
        return Err(Error::OutputOverflow);
    }
    flush(out, socket)
}

fn write_head<H: ResponseHeaderSet>(out: &mut Out<'_>, code: StatusCode, headers: &H, content_length: Option<usize>) -> Result<()> {
    if !out.write_status_line(Version::Http11, code) {
        return Err(Error::OutputOverflow);
    }
    if !headers.send_headers(out) {
        return Err(Error::OutputOverflow);
    }
    write_content_length(out, content_length.unwrap_or(0))
}

fn write_head_with_mime(out: &mut Out<'_>, code: StatusCode, mime: Mime, content_length: Option<usize>) -> Result<()> {
    if !out.write_status_line(Version::Http11, code) {
        return Err(Error::OutputOverflow);
    }
    if !out.write_raw_header("Content-Type", mime.token().as_bytes()) {
        return Err(Error::OutputOverflow);
    }
    write_content_length(out, content_length.unwrap_or(0))
}

fn write_content_length(out: &mut Out<'_>, n: usize) -> Result<()> {
    let mut digits = [0u8; 20];
    let s = decimal(n, &mut digits);
    if !out.write_raw_header("Content-Length", s) {
        return Err(Error::OutputOverflow);
    }
    if !out.write_crlf() {
        return Err(Error::OutputOverflow);
    }
    Ok(())
}

fn write_chunked_head<H: ResponseHeaderSet>(out: &mut Out<'_>, code: StatusCode, headers: &H) -> Result<()> {
    if !out.write_status_line(Version::Http11, code) {
        return Err(Error::OutputOverflow);
    }
    if !headers.send_headers(out) {
        return Err(Error::OutputOverflow);
    }
    if !out.write_raw_header("Transfer-Encoding", b"chunked") {
        return Err(Error::OutputOverflow);
    }
    if !out.write_crlf() {
        return Err(Error::OutputOverflow);
    }
    Ok(())
}

/// Shared with `http_client`'s request-line writer, which needs the same
/// decimal `Content-Length` formatting in the outbound direction.
pub(crate) fn decimal(n: usize, buf: &mut [u8; 20]) -> &[u8] {
    if n == 0 {
        buf[0] = b'0';
        return &buf[..1];
    }
    let mut tmp = [0u8; 20];
    let mut i = 20;
    let mut rest = n;
    while rest > 0 {
        i -= 1;
        tmp[i] = b'0' + (rest % 10) as u8;
        rest /= 10;
    }
    let len = 20 - i;
    buf[..len].copy_from_slice(&tmp[i..]);
    &buf[..len]
}

/// Flushes whatever `out` holds to `socket` and rewinds it for reuse.
/// Spec.md §4.9: any short write aborts emission rather than retrying.
/// Shared with `http_client`, which flushes an outbound request head the
/// same way before streaming a request body.
pub(crate) fn flush<S: Socket>(out: &mut Out<'_>, socket: &mut S) -> Result<()> {
    let bytes = out.written();
    let sent = send_all(socket, bytes);
    out.reset();
    sent
}

pub(crate) fn send_all<S: Socket>(socket: &mut S, bytes: &[u8]) -> Result<()> {
    match socket.send(bytes) {
        Ok(n) if n == bytes.len() => Ok(()),
        Ok(_) => Err(Error::SocketError),
        Err(e) => Err(e),
    }
}

/// Plays the role of spec.md §4.9's "read into the vault's idle region and
/// send" loop, using `out`'s own backing buffer as the scratch space
/// instead of the vault's — `answer.rs` has no `Client<N>` of its own to
/// draw an idle region from. `http_client` reuses this directly for a
/// content-length-framed request body, the one shape it supports.
pub(crate) fn stream_fixed_body<S: Socket>(out: &mut Out<'_>, socket: &mut S, mut remaining: usize, source: &mut dyn FnMut(&mut [u8]) -> usize) -> Result<()> {
    while remaining > 0 {
        let cap = out.remaining_mut().len().min(remaining).min(BODY_SCRATCH);
        let n = source(&mut out.remaining_mut()[..cap]);
        if n == 0 {
            return Err(Error::BodyLengthMismatch);
        }
        out.commit(n);
        flush(out, socket)?;
        remaining -= n;
    }
    Ok(())
}

fn stream_chunked_body<S: Socket>(out: &mut Out<'_>, socket: &mut S, producer: &mut dyn FnMut(&mut [u8]) -> usize) -> Result<()> {
    let mut scratch = [0u8; BODY_SCRATCH];
    loop {
        let n = producer(&mut scratch);
        if !chunk::write_chunk(out, &scratch[..n]) {
            return Err(Error::OutputOverflow);
        }
        flush(out, socket)?;
        if n == 0 {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headerset::NoHeaders;

    /// A fixed-capacity in-memory `Socket` double, matching this crate's
    /// no-heap-allocation rule even in its own test code.
    struct BufSocket {
        sent: [u8; 512],
        len: usize,
        short_write: bool,
    }

    impl BufSocket {
        fn new() -> Self {
            BufSocket { sent: [0; 512], len: 0, short_write: false }
        }

        fn sent(&self) -> &[u8] {
            &self.sent[..self.len]
        }
    }

    impl Socket for BufSocket {
        fn recv(&mut self, _buf: &mut [u8], _min: usize, _max: usize) -> Result<usize> {
            Ok(0)
        }

        fn send(&mut self, buf: &[u8]) -> Result<usize> {
            self.sent[self.len..self.len + buf.len()].copy_from_slice(buf);
            self.len += buf.len();
            if self.short_write {
                Ok(buf.len().saturating_sub(1))
            } else {
                Ok(buf.len())
            }
        }

        fn is_valid(&self) -> bool {
            true
        }

        fn reset(&mut self) {
            self.len = 0;
        }
    }

    #[test]
    fn code_answer_emits_status_and_zero_length() {
        let mut buf = [0u8; 128];
        let mut out = Out::wrap(&mut buf);
        let mut socket = BufSocket::new();
        let answer: Answer<'_, NoHeaders> = Answer::Code(StatusCode::NotFound);
        emit(answer, false, &mut out, &mut socket).unwrap();
        assert_eq!(socket.sent(), b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn simple_answer_emits_body() {
        let mut buf = [0u8; 128];
        let mut out = Out::wrap(&mut buf);
        let mut socket = BufSocket::new();
        let answer: Answer<'_, NoHeaders> = Answer::Simple {
            code: StatusCode::Ok,
            mime: Mime::TextPlain,
            body: ByteView::new(b"GET Color"),
        };
        emit(answer, false, &mut out, &mut socket).unwrap();
        assert_eq!(socket.sent(), b"HTTP/1.1 200 Ok\r\nContent-Type: text/plain\r\nContent-Length: 9\r\n\r\nGET Color");
    }

    #[test]
    fn simple_answer_skips_body_for_head() {
        let mut buf = [0u8; 128];
        let mut out = Out::wrap(&mut buf);
        let mut socket = BufSocket::new();
        let answer: Answer<'_, NoHeaders> = Answer::Simple {
            code: StatusCode::Ok,
            mime: Mime::TextPlain,
            body: ByteView::new(b"GET Color"),
        };
        emit(answer, true, &mut out, &mut socket).unwrap();
        assert_eq!(socket.sent(), b"HTTP/1.1 200 Ok\r\nContent-Type: text/plain\r\nContent-Length: 9\r\n\r\n");
    }

    #[test]
    fn captured_answer_emits_chunked_body() {
        let mut buf = [0u8; 128];
        let mut out = Out::wrap(&mut buf);
        let mut socket = BufSocket::new();
        let chunks: [&[u8]; 3] = [b"Lorem ", b"ipsum ", b""];
        let mut i = 0;
        let mut producer = move |dst: &mut [u8]| -> usize {
            let c = chunks[i];
            dst[..c.len()].copy_from_slice(c);
            if !c.is_empty() {
                i += 1;
            }
            c.len()
        };
        let answer: Answer<'_, NoHeaders> = Answer::Captured {
            code: StatusCode::Ok,
            headers: NoHeaders,
            producer: &mut producer,
        };
        emit(answer, false, &mut out, &mut socket).unwrap();
        assert_eq!(socket.sent(), b"HTTP/1.1 200 Ok\r\nTransfer-Encoding: chunked\r\n\r\n6\r\nLorem \r\n6\r\nipsum \r\n0\r\n\r\n");
    }

    #[test]
    fn stream_answer_reports_mismatch_on_early_exhaustion() {
        let mut buf = [0u8; 128];
        let mut out = Out::wrap(&mut buf);
        let mut socket = BufSocket::new();
        let mut source = |_: &mut [u8]| -> usize { 0 };
        let answer: Answer<'_, NoHeaders> = Answer::Stream {
            code: StatusCode::Ok,
            headers: NoHeaders,
            len: 10,
            source: &mut source,
        };
        assert_eq!(emit(answer, false, &mut out, &mut socket), Err(Error::BodyLengthMismatch));
    }

    #[test]
    fn short_write_aborts_emission() {
        let mut buf = [0u8; 128];
        let mut out = Out::wrap(&mut buf);
        let mut socket = BufSocket::new();
        socket.short_write = true;
        let answer: Answer<'_, NoHeaders> = Answer::Code(StatusCode::Ok);
        assert_eq!(emit(answer, false, &mut out, &mut socket), Err(Error::SocketError));
    }

    #[test]
    fn skip_body_for_head_matches_spec() {
        assert!(skip_body_for(Method::Head));
        assert!(!skip_body_for(Method::Get));
    }
}
