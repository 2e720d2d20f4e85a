//! The route table and generic header loop (spec.md C8).
//!
//! A route matches a request by method mask and path prefix (declaration
//! order, first match wins). Each route owns its own header-set type, so
//! the table itself is monomorphization-erased: `Route<N>` stores a plain
//! `fn` pointer whose body is free to declare whatever `RequestHeaderSet`
//! it needs and drive [`run_header_loop`] itself. `dispatch_request` only
//! ever sees `RouteOutcome`, never the concrete header type.
//!
//! A route's `dispatch` function follows one fixed shape: declare its own
//! `H::default()` locally, run [`run_header_loop`], then match the outcome
//! to [`resolve_need_more_data`] or [`finish_done`]. This is boilerplate
//! rather than a single shared helper on purpose — see [`finish_done`]'s
//! doc comment for why a generic wrapper spanning "construct the header set
//! and invoke the route's callback" can't be written without tying the
//! header set's lifetime to the same borrow of `Client<N>` the callback
//! itself needs exclusively.

use log::{debug, trace, warn};

use crate::client::Client;
use crate::header::Method;
use crate::headerset::RequestHeaderSet;
use crate::out::Out;
use crate::value::ParsingError;
use crate::vault::Vault;
use crate::view::ByteView;

/// One line of a header block: `Name: value`, the blank-line terminator,
/// or a parse failure. Splitting this out of [`run_header_loop`] keeps the
/// line grammar (spec.md §4.6's CRLF conventions) independently testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLine<'a> {
    Header(ByteView<'a>, ByteView<'a>),
    End,
    NeedMoreData,
    Invalid,
}

/// Parses one `Name: value\r\n` line (or the blank `\r\n` that ends a
/// header block) from the front of `input`, advancing `input` past what it
/// consumed. Matches the source's `parseHeader`/line-folding-free grammar:
/// no continuation lines, the value runs to (not including) the line's
/// trailing CRLF.
pub fn parse_header<'a>(input: &mut ByteView<'a>) -> HeaderLine<'a> {
    if input.as_bytes().starts_with(b"\r\n") {
        input.split_at(2);
        return HeaderLine::End;
    }
    let idx = input.find(b"\r\n");
    if idx == input.len() {
        return HeaderLine::NeedMoreData;
    }
    let mut line = input.split_at(idx);
    input.split_at(2);

    if line.find(b":") == line.len() {
        return HeaderLine::Invalid;
    }
    let mut name = line.split_up_to(b":");
    name.trim_right(b' ');
    line.trim_left(b' ');
    HeaderLine::Header(name, line)
}

/// What [`run_header_loop`] found by the time it ran out of buffered bytes
/// or reached the end of the header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLoopOutcome {
    /// The blank-line terminator was seen. `usize` is the number of bytes
    /// consumed from the vault's receive view, including the terminator.
    Done(usize),
    /// Buffered bytes ran out mid-header-block; caller must wait for more
    /// data, or — if the vault has no headroom left — treat this as
    /// spec.md §4.7's `NeedRefillHeaders`.
    NeedMoreData,
    /// A header line didn't match `Name: value` grammar.
    Invalid,
    /// A slot's `accept_and_parse` returned `InvalidRequest` (spec.md §4.8
    /// step 3): reply `406` rather than `400`, since the line itself
    /// parsed fine and only the value's grammar was rejected.
    Unacceptable,
}

/// Drives spec.md §4.8's generic header loop against `vault`'s currently
/// buffered bytes, dispatching each recognized header to `headers`.
///
/// Takes `vault: &'a Vault<N>` — a shared borrow — for exactly as long as
/// `H`'s slots need to borrow into it while parsing. Before returning on
/// every path, it calls `headers.cache_recv_ranges(vault)` so that, once
/// this shared borrow has ended, a caller holding `&mut Vault<N>` can still
/// call `headers.persist(vault)` (see `Persistable` in `value.rs`) without
/// needing the original borrow to still be alive.
pub fn run_header_loop<'a, const N: usize, H: RequestHeaderSet<'a>>(
    vault: &'a Vault<N>,
    headers: &mut H,
) -> HeaderLoopOutcome {
    let start_view = vault.view();
    let mut input = start_view;

    let outcome = loop {
        match parse_header(&mut input) {
            HeaderLine::End => {
                break HeaderLoopOutcome::Done(start_view.len() - input.len());
            }
            HeaderLine::NeedMoreData => {
                break HeaderLoopOutcome::NeedMoreData;
            }
            HeaderLine::Invalid => {
                break HeaderLoopOutcome::Invalid;
            }
            HeaderLine::Header(name, mut value) => match H::accept_header(name.as_bytes()) {
                Some(id) => {
                    let status = headers.accept_and_parse(id, &mut value);
                    if status == ParsingError::InvalidRequest {
                        break HeaderLoopOutcome::Unacceptable;
                    }
                }
                None => {
                    trace!("skipping unrecognized header");
                }
            },
        }
    };

    headers.cache_recv_ranges(vault);
    outcome
}

/// Outcome of dispatching one request to a matched route, mirroring
/// spec.md §4.7/§4.8's terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The callback replied and returned `true`.
    Done,
    /// No route's mask/prefix matched.
    NoMatch,
    /// A parse failure, an unacceptable header value, or a callback that
    /// returned `false`.
    Error,
    /// The vault still has room; wait for more bytes on the socket.
    NeedMoreData,
    /// The vault has no headroom left to buffer more header bytes. Callers
    /// that support spec.md §4.7's `NeedRefillHeaders` state have already
    /// had the matched headers persisted into the vault's session region
    /// and the consumed prefix dropped by the time this is returned, so
    /// the vault is ready to accept a refill.
    NeedRefillHeaders,
}

/// Logs why the generic header loop gave up on `Invalid`/`Unacceptable`
/// and maps either to `RouteOutcome::Error`. Plain, non-generic, and
/// concrete in every type — every route's `dispatch` fn can call this the
/// same way regardless of which header set it declared.
pub fn reject_header_loop(outcome: HeaderLoopOutcome) -> RouteOutcome {
    match outcome {
        HeaderLoopOutcome::Invalid => debug!("malformed header line"),
        HeaderLoopOutcome::Unacceptable => debug!("header value rejected by its slot's grammar"),
        _ => {}
    }
    RouteOutcome::Error
}

/// Handles spec.md §4.7's refill branch of the generic header loop's
/// `NeedMoreData` outcome: if the vault has no headroom left, persists
/// whatever slots were matched so far and reports `NeedRefillHeaders`;
/// otherwise the caller just waits for more bytes on the socket.
///
/// Generic over a header-set type `H` whose lifetime `'h` is this
/// function's own fresh generic parameter, unconnected to `client`'s own
/// borrow — unlike a single wrapper that drove the whole loop-then-dispatch
/// sequence under one `H: RequestHeaderSet<'c>` bound tied to `client`'s
/// own exclusive borrow `'c`, which would force every slot's borrow to
/// last as long as the mutable borrow of `client` itself and can't
/// borrow-check. Each concrete route function (see the tests below for the
/// pattern) calls this with a `headers` value it declared locally, letting
/// the compiler infer as short a borrow as that function's own body needs.
pub fn resolve_need_more_data<'h, const N: usize, H: RequestHeaderSet<'h>>(client: &mut Client<N>, headers: &mut H) -> RouteOutcome {
    if client.vault().tail_free() == 0 {
        headers.persist(client.vault_mut());
        RouteOutcome::NeedRefillHeaders
    } else {
        RouteOutcome::NeedMoreData
    }
}

/// Handles the generic header loop's `Done` outcome: invokes `callback`
/// with the fully populated header set, then drops the consumed header
/// bytes.
///
/// `callback` runs before the drop, not after. It must read whatever header
/// values it needs before calling `client.vault_mut()` itself (to stream a
/// body, say) — the same "read under the shared borrow before taking an
/// exclusive one" discipline `Persistable` follows one level down. Calling
/// `client.vault_mut()` here first and invoking `callback` after would tie
/// `headers`' fields' borrow past that point, which doesn't borrow-check
/// for the same reason a `persist`-that-falls-back-to-the-original-view
/// doesn't.
pub fn finish_done<'h, const N: usize, H: RequestHeaderSet<'h>, F>(
    headers: &H,
    client: &mut Client<N>,
    out: &mut Out<'_>,
    consumed: usize,
    callback: F,
) -> RouteOutcome
where
    F: FnOnce(&H, &mut Client<N>, &mut Out<'_>) -> bool,
{
    let ok = callback(headers, client, out);
    if client.vault_mut().drop(consumed).is_err() {
        warn!("failed to drop consumed header bytes");
        return RouteOutcome::Error;
    }
    if ok {
        RouteOutcome::Done
    } else {
        RouteOutcome::Error
    }
}

/// One declared route: a method mask, a path prefix to match, and the
/// `fn` pointer that runs its own header loop and callback (spec.md
/// §4.8). A plain `fn` pointer rather than a boxed closure, matching this
/// crate's no dynamic-allocation rule — each route's concrete header-set
/// type lives entirely inside its own `dispatch` function body.
#[derive(Clone, Copy)]
pub struct Route<const N: usize> {
    /// Bitmask of `1 << Method as u32` values this route accepts.
    pub method_mask: u32,
    /// Byte-exact path prefix; empty matches every path (the catch-all).
    pub prefix: &'static [u8],
    pub dispatch: fn(&mut Client<N>, &mut Out<'_>) -> RouteOutcome,
}

impl<const N: usize> Route<N> {
    pub const fn new(method_mask: u32, prefix: &'static [u8], dispatch: fn(&mut Client<N>, &mut Out<'_>) -> RouteOutcome) -> Self {
        Route { method_mask, prefix, dispatch }
    }

    fn matches(&self, method: Method, path: &[u8]) -> bool {
        (method.mask_bit() & self.method_mask) != 0 && (self.prefix.is_empty() || path.starts_with(self.prefix))
    }
}

/// The contract `route.rs`'s users (mainly `server.rs`) need from a
/// declared route without caring how it was built. Implemented by `Route`;
/// kept separate so a table can in principle mix other `RouteHandler<N>`
/// implementors (e.g. ones built by a future declarative macro).
pub trait RouteHandler<const N: usize> {
    fn method_mask(&self) -> u32;
    fn prefix(&self) -> &'static [u8];
    fn call(&self, client: &mut Client<N>, out: &mut Out<'_>) -> RouteOutcome;
}

impl<const N: usize> RouteHandler<N> for Route<N> {
    fn method_mask(&self) -> u32 {
        self.method_mask
    }

    fn prefix(&self) -> &'static [u8] {
        self.prefix
    }

    fn call(&self, client: &mut Client<N>, out: &mut Out<'_>) -> RouteOutcome {
        (self.dispatch)(client, out)
    }
}

/// Finds the first route (declaration order) whose mask and prefix match
/// this client's request and runs it; `NoMatch` if none did (spec.md §4.8
/// — caller replies `404`).
pub fn dispatch_request<const N: usize>(routes: &[Route<N>], client: &mut Client<N>, out: &mut Out<'_>) -> RouteOutcome {
    let method = match client.method() {
        Some(m) => m,
        None => return RouteOutcome::Error,
    };

    let mut matched_index = None;
    for (i, route) in routes.iter().enumerate() {
        let path = client.vault().resolve(client.path());
        if route.matches(method, path.as_bytes()) {
            matched_index = Some(i);
            break;
        }
    }

    match matched_index {
        Some(i) => routes[i].call(client, out),
        None => RouteOutcome::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Mime;
    use crate::out::Out;
    use crate::request_header_set;
    use crate::value::{EnumWithAttribute, StringValue, UnsignedValue};

    #[test]
    fn parse_header_splits_name_and_value() {
        let mut input = ByteView::new(b"Host: example.com\r\nX: y\r\n\r\n");
        match parse_header(&mut input) {
            HeaderLine::Header(name, value) => {
                assert_eq!(name.as_bytes(), b"Host");
                assert_eq!(value.as_bytes(), b"example.com");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(input.as_bytes(), b"X: y\r\n\r\n");
    }

    #[test]
    fn parse_header_recognizes_end_marker() {
        let mut input = ByteView::new(b"\r\nbody");
        assert_eq!(parse_header(&mut input), HeaderLine::End);
        assert_eq!(input.as_bytes(), b"body");
    }

    #[test]
    fn parse_header_needs_more_without_crlf() {
        let mut input = ByteView::new(b"Host: exam");
        assert_eq!(parse_header(&mut input), HeaderLine::NeedMoreData);
    }

    #[test]
    fn parse_header_rejects_missing_colon() {
        let mut input = ByteView::new(b"not-a-header\r\n");
        assert_eq!(parse_header(&mut input), HeaderLine::Invalid);
    }

    request_header_set! {
        struct TestHeaders<'a> {
            content_type: ContentType => EnumWithAttribute<'a, Mime>,
            content_length: ContentLength => UnsignedValue,
            host: Host => StringValue<'a>,
        }
    }

    fn feed<const N: usize>(client: &mut Client<N>, bytes: &[u8]) {
        let dst = client.vault_mut().recv_tail_slice_mut();
        dst[..bytes.len()].copy_from_slice(bytes);
        client.vault_mut().stored(bytes.len()).unwrap();
    }

    #[test]
    fn header_loop_reaches_done_and_populates_slots() {
        let mut c: Client<512> = Client::new();
        feed(&mut c, b"GET / HTTP/1.1\r\nHost: x\r\nContent-Length: 4\r\n\r\nbody");
        assert_eq!(c.parse(), crate::client::ParsingStatus::RecvHeaders);

        let mut headers = TestHeaders::default();
        let outcome = run_header_loop(c.vault(), &mut headers);
        match outcome {
            HeaderLoopOutcome::Done(consumed) => {
                assert_eq!(&c.vault().view().as_bytes()[consumed..], b"body");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(headers.content_length().value, 4);
        assert_eq!(headers.host().value.as_bytes(), b"x");
    }

    #[test]
    fn header_loop_rejects_invalid_line() {
        let mut c: Client<512> = Client::new();
        feed(&mut c, b"GET / HTTP/1.1\r\nbogus-line\r\n\r\n");
        c.parse();
        let mut headers = TestHeaders::default();
        assert_eq!(run_header_loop(c.vault(), &mut headers), HeaderLoopOutcome::Invalid);
    }

    #[test]
    fn header_loop_reports_unacceptable_value() {
        let mut c: Client<512> = Client::new();
        feed(&mut c, b"GET / HTTP/1.1\r\nContent-Length: not-a-number\r\n\r\n");
        c.parse();
        let mut headers = TestHeaders::default();
        assert_eq!(run_header_loop(c.vault(), &mut headers), HeaderLoopOutcome::Unacceptable);
    }

    fn echo_host(headers: &TestHeaders<'_>, client: &mut Client<256>, out: &mut Out<'_>) -> bool {
        // Reads the header value first, then touches the vault mutably —
        // the order `finish_done` requires.
        let host = headers.host().value;
        out.write_bytes(host.as_bytes());
        let _ = client.vault_mut().tail_free();
        true
    }

    fn root_handler(client: &mut Client<256>, out: &mut Out<'_>) -> RouteOutcome {
        let mut headers = TestHeaders::default();
        match run_header_loop(client.vault(), &mut headers) {
            outcome @ (HeaderLoopOutcome::Invalid | HeaderLoopOutcome::Unacceptable) => reject_header_loop(outcome),
            HeaderLoopOutcome::NeedMoreData => resolve_need_more_data(client, &mut headers),
            HeaderLoopOutcome::Done(consumed) => finish_done(&headers, client, out, consumed, echo_host),
        }
    }

    #[test]
    fn handle_route_invokes_callback_on_done() {
        let mut c: Client<256> = Client::new();
        feed(&mut c, b"GET / HTTP/1.1\r\nHost: example\r\n\r\n");
        c.parse();
        let mut buf = [0u8; 64];
        let mut out = Out::wrap(&mut buf);
        assert_eq!(root_handler(&mut c, &mut out), RouteOutcome::Done);
        assert_eq!(out.finish(), b"example");
    }

    #[test]
    fn dispatch_request_finds_declaration_order_match() {
        let routes: [Route<256>; 2] = [
            Route::new(Method::Post.mask_bit(), b"/", root_handler),
            Route::new(Method::Get.mask_bit(), b"/", root_handler),
        ];
        let mut c: Client<256> = Client::new();
        feed(&mut c, b"GET / HTTP/1.1\r\nHost: example\r\n\r\n");
        c.parse();
        let mut buf = [0u8; 64];
        let mut out = Out::wrap(&mut buf);
        assert_eq!(dispatch_request(&routes, &mut c, &mut out), RouteOutcome::Done);
        assert_eq!(out.finish(), b"example");
    }

    #[test]
    fn dispatch_request_reports_no_match() {
        let routes: [Route<256>; 1] = [Route::new(Method::Post.mask_bit(), b"/", root_handler)];
        let mut c: Client<256> = Client::new();
        feed(&mut c, b"GET / HTTP/1.1\r\nHost: example\r\n\r\n");
        c.parse();
        let mut buf = [0u8; 64];
        let mut out = Out::wrap(&mut buf);
        assert_eq!(dispatch_request(&routes, &mut c, &mut out), RouteOutcome::NoMatch);
    }
}
