//! End-to-end scenarios against the `Server`/route/answer pipeline, driven
//! through an in-memory `Socket`/`SocketPool` pair the same way `server.rs`'s
//! own unit tests do, but exercised from outside the crate.

use ember::answer::{self, Answer};
use ember::client::Client;
use ember::error::Result;
use ember::header::{Encoding, Method, StatusCode};
use ember::headerset::NoHeaders;
use ember::out::Out;
use ember::route::{finish_done, reject_header_loop, resolve_need_more_data, run_header_loop, HeaderLoopOutcome, Route, RouteOutcome};
use ember::server::Server;
use ember::socket::{Socket, SocketPool};
use ember::value::{EnumWithAttribute, ListValue, StringValue};

const CAP: usize = 256;

/// A one-connection `Socket`, fed from a fixed byte buffer and optionally
/// split across two `recv` calls to model a request arriving in two reads
/// (S7).
struct ScriptedSocket {
    reads: [&'static [u8]; 2],
    next_read: usize,
    outbox: [u8; 512],
    outbox_len: usize,
}

impl ScriptedSocket {
    fn one_shot(request: &'static [u8]) -> Self {
        ScriptedSocket { reads: [request, b""], next_read: 0, outbox: [0; 512], outbox_len: 0 }
    }

    fn two_reads(first: &'static [u8], second: &'static [u8]) -> Self {
        ScriptedSocket { reads: [first, second], next_read: 0, outbox: [0; 512], outbox_len: 0 }
    }

    fn written(&self) -> &[u8] {
        &self.outbox[..self.outbox_len]
    }
}

impl Socket for ScriptedSocket {
    fn recv(&mut self, buf: &mut [u8], _min: usize, max: usize) -> Result<usize> {
        if self.next_read >= self.reads.len() {
            return Ok(0);
        }
        let chunk = self.reads[self.next_read];
        self.next_read += 1;
        let n = chunk.len().min(max).min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }

    fn send(&mut self, buf: &[u8]) -> Result<usize> {
        self.outbox[self.outbox_len..self.outbox_len + buf.len()].copy_from_slice(buf);
        self.outbox_len += buf.len();
        Ok(buf.len())
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn reset(&mut self) {}
}

struct SinglePool {
    socket: Option<ScriptedSocket>,
    readable: bool,
    closed: bool,
}

impl SinglePool {
    fn new() -> Self {
        SinglePool { socket: None, readable: false, closed: false }
    }
}

impl SocketPool<ScriptedSocket> for SinglePool {
    fn append(&mut self, socket: ScriptedSocket) -> bool {
        if self.socket.is_some() {
            return false;
        }
        self.socket = Some(socket);
        self.readable = true;
        true
    }

    // Leaves the socket in place (merely stops offering it as readable) so
    // a test can still inspect what was written to it after the server
    // closes the connection; a real pool would drop it here instead.
    fn remove(&mut self, _index: usize) {
        self.readable = false;
        self.closed = true;
    }

    fn socket_mut(&mut self, _index: usize) -> &mut ScriptedSocket {
        self.socket.as_mut().expect("socket_mut called on empty slot")
    }

    fn select_active(&mut self, _timeout_ms: u64) -> Result<()> {
        self.readable = self.socket.is_some();
        Ok(())
    }

    fn is_readable(&self, index: usize) -> bool {
        index == 0 && self.readable
    }

    fn get_readable_socket(&mut self, start_index: usize) -> Option<usize> {
        if start_index == 0 && self.readable {
            self.readable = false;
            Some(0)
        } else {
            None
        }
    }
}

ember::request_header_set! {
    struct ColorHeaders<'a> {
        host: Host => StringValue<'a>,
    }
}

fn reply_get_color(_headers: &ColorHeaders<'_>, client: &mut Client<CAP>, out: &mut Out<'_>) -> bool {
    let _ = client.vault_mut().tail_free();
    out.write_bytes(b"HTTP/1.1 200 Ok\r\nContent-Length: 9\r\n\r\nGET Color")
}

fn color_dispatch(client: &mut Client<CAP>, out: &mut Out<'_>) -> RouteOutcome {
    let mut headers = ColorHeaders::default();
    match run_header_loop(client.vault(), &mut headers) {
        outcome @ (HeaderLoopOutcome::Invalid | HeaderLoopOutcome::Unacceptable) => reject_header_loop(outcome),
        HeaderLoopOutcome::NeedMoreData => resolve_need_more_data(client, &mut headers),
        HeaderLoopOutcome::Done(consumed) => finish_done(&headers, client, out, consumed, reply_get_color),
    }
}

/// S1 — simple GET, route match.
#[test]
fn s1_simple_get_route_match() {
    let routes: [Route<CAP>; 1] = [Route::new(Method::Get.mask_bit() | Method::Post.mask_bit(), b"/Color", color_dispatch)];
    let mut server: Server<'_, CAP, 2> = Server::new(&routes);
    let mut pool = SinglePool::new();

    assert!(server.accept_into(&mut pool, ScriptedSocket::one_shot(b"GET /Color HTTP/1.1\r\nHost: h\r\n\r\n")));
    server.run_iteration(&mut pool, 0).unwrap();

    assert_eq!(pool.socket.as_ref().unwrap().written(), b"HTTP/1.1 200 Ok\r\nContent-Length: 9\r\n\r\nGET Color");
}

/// S2 — 404 when no route matches.
#[test]
fn s2_no_route_match_is_404() {
    let routes: [Route<CAP>; 1] = [Route::new(Method::Get.mask_bit(), b"/Color", color_dispatch)];
    let mut server: Server<'_, CAP, 2> = Server::new(&routes);
    let mut pool = SinglePool::new();

    assert!(server.accept_into(&mut pool, ScriptedSocket::one_shot(b"GET /nope HTTP/1.1\r\nHost: h\r\n\r\n")));
    server.run_iteration(&mut pool, 0).unwrap();

    assert_eq!(pool.socket.as_ref().unwrap().written(), b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
}

/// S3 — malformed request line.
#[test]
fn s3_malformed_request_line_is_400() {
    let routes: [Route<CAP>; 1] = [Route::new(Method::Get.mask_bit(), b"/", color_dispatch)];
    let mut server: Server<'_, CAP, 2> = Server::new(&routes);
    let mut pool = SinglePool::new();

    assert!(server.accept_into(&mut pool, ScriptedSocket::one_shot(b"GETT / HTTP/1.1\r\n\r\n")));
    server.run_iteration(&mut pool, 0).unwrap();

    assert_eq!(pool.socket.as_ref().unwrap().written(), b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
    assert!(pool.closed, "connection must be closed after a bad request");
}

/// S4 — entity too large: a header block that never fits and never
/// terminates within one vault's worth of bytes.
#[test]
fn s4_oversized_headers_is_413() {
    const SMALL: usize = 32;
    let routes: [Route<SMALL>; 1] = [Route::new(Method::Get.mask_bit(), b"/", |client, out| {
        let mut headers = ColorHeaders::default();
        match run_header_loop(client.vault(), &mut headers) {
            outcome @ (HeaderLoopOutcome::Invalid | HeaderLoopOutcome::Unacceptable) => reject_header_loop(outcome),
            HeaderLoopOutcome::NeedMoreData => resolve_need_more_data(client, &mut headers),
            HeaderLoopOutcome::Done(consumed) => finish_done(&headers, client, out, consumed, reply_get_color),
        }
    })];
    let mut server: Server<'_, SMALL, 1> = Server::new(&routes);
    let mut pool = SinglePool::new();

    let oversized: &'static [u8] = b"GET / HTTP/1.1\r\nX-Long: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    assert!(server.accept_into(&mut pool, ScriptedSocket::one_shot(oversized)));
    // First iteration fills the vault and finds no blank line yet
    // (`NeedRefillHeaders`, no reply sent); the second iteration's
    // pre-recv capacity check is what actually triggers the 413.
    server.run_iteration(&mut pool, 0).unwrap();
    server.run_iteration(&mut pool, 0).unwrap();

    assert_eq!(pool.socket.as_ref().unwrap().written(), b"HTTP/1.1 413 Entity Too Large\r\n\r\n");
    assert!(pool.closed);
}

ember::request_header_set! {
    struct EncodingHeaders<'a> {
        accept_encoding: AcceptEncoding => ListValue<EnumWithAttribute<'a, Encoding>, 8, false>,
    }
}

/// S5 — multi-value list header: three comma-separated values, one
/// (`*`) outside the enum's known tokens, no `InvalidRequest`.
#[test]
fn s5_list_header_accumulates_every_element() {
    let mut c: Client<CAP> = Client::new();
    let dst = c.vault_mut().recv_tail_slice_mut();
    let bytes = b"GET / HTTP/1.1\r\nAccept-Encoding: deflate, gzip;q=1.0, unknown-token;q=0.5\r\n\r\n";
    dst[..bytes.len()].copy_from_slice(bytes);
    c.vault_mut().stored(bytes.len()).unwrap();
    c.parse();

    let mut headers = EncodingHeaders::default();
    let outcome = run_header_loop(c.vault(), &mut headers);
    assert!(matches!(outcome, HeaderLoopOutcome::Done(_)));

    let list = headers.accept_encoding();
    assert_eq!(list.count, 3);
    assert_eq!(list.values[0].value, Some(Encoding::Deflate));
    assert_eq!(list.values[1].value, Some(Encoding::Gzip));
    assert_eq!(list.values[2].value, None);
}

/// S6 — chunked response: concatenated chunk payloads match the producer's
/// output, terminated by a zero-length chunk.
#[test]
fn s6_chunked_response_frames_each_payload() {
    struct ChunkSource {
        pieces: [&'static [u8]; 3],
        next: usize,
    }
    impl ChunkSource {
        fn fill(&mut self, buf: &mut [u8]) -> usize {
            if self.next >= self.pieces.len() {
                return 0;
            }
            let piece = self.pieces[self.next];
            self.next += 1;
            buf[..piece.len()].copy_from_slice(piece);
            piece.len()
        }
    }

    let mut source = ChunkSource { pieces: [b"Lorem ", b"ipsum ", b""], next: 0 };
    let mut producer = |buf: &mut [u8]| source.fill(buf);
    let answer: Answer<'_, NoHeaders> = Answer::Captured { code: StatusCode::Ok, headers: NoHeaders, producer: &mut producer };

    let mut buf = [0u8; 256];
    let mut out = Out::wrap(&mut buf);
    let mut socket = ScriptedSocket::one_shot(b"");
    answer::emit(answer, false, &mut out, &mut socket).unwrap();

    assert_eq!(socket.written(), b"HTTP/1.1 200 Ok\r\nTransfer-Encoding: chunked\r\n\r\n6\r\nLorem \r\n6\r\nipsum \r\n0\r\n\r\n");
}

/// S7 — URI persistence across refill: the request line parses out of the
/// first read, and resolving the persisted path after a second, separate
/// read still sees the original bytes.
#[test]
fn s7_uri_persists_across_a_two_read_refill() {
    let mut c: Client<CAP> = Client::new();

    let first = b"GET /Color HTTP/1.1\r\n";
    let dst = c.vault_mut().recv_tail_slice_mut();
    dst[..first.len()].copy_from_slice(first);
    c.vault_mut().stored(first.len()).unwrap();
    assert_eq!(c.parse(), ember::client::ParsingStatus::RecvHeaders);
    let path_ref = c.path();
    assert_eq!(c.vault().resolve(path_ref).as_bytes(), b"/Color");

    let second = b"Host: h\r\n\r\n";
    let dst = c.vault_mut().recv_tail_slice_mut();
    dst[..second.len()].copy_from_slice(second);
    c.vault_mut().stored(second.len()).unwrap();

    assert_eq!(c.vault().resolve(c.path()).as_bytes(), b"/Color");
}
