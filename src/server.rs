//! The server loop (spec.md C10).
//!
//! Single-threaded and cooperative, matching spec.md §5: one iteration
//! waits for readiness on the socket pool, services every readable client
//! by one parse step each, then gives the caller a chance to accept a new
//! connection. The only suspension points are `SocketPool::select_active`
//! and the `Socket::recv`/`send` calls made here and in `answer::emit`.
//!
//! `Server` owns a fixed `[Client<N>; MAX_CLIENTS]` table, one slot per
//! pool index; it never allocates. A `std`-gated `std::net::TcpStream`
//! `Socket` impl lives below, for the bundled `demos/demo_server.rs`
//! example; tests exercise the loop against an in-memory pool double.

use log::{trace, warn};

use crate::answer::{self, Answer};
use crate::client::{Client, ParsingStatus};
use crate::error::Result;
use crate::header::StatusCode;
use crate::headerset::NoHeaders;
use crate::out::Out;
use crate::route::{dispatch_request, Route, RouteOutcome};
use crate::socket::{Socket, SocketPool};

/// Owns one `Client<N>` slot per pool index and a borrowed route table.
/// `N` is the per-connection vault capacity; `MAX_CLIENTS` bounds how many
/// connections this server instance services at once (spec.md §2's
/// const-generic knobs).
pub struct Server<'r, const N: usize, const MAX_CLIENTS: usize> {
    clients: [Client<N>; MAX_CLIENTS],
    occupied: [bool; MAX_CLIENTS],
    routes: &'r [Route<N>],
}

impl<'r, const N: usize, const MAX_CLIENTS: usize> Server<'r, N, MAX_CLIENTS> {
    pub fn new(routes: &'r [Route<N>]) -> Self {
        Server {
            clients: core::array::from_fn(|_| Client::new()),
            occupied: [false; MAX_CLIENTS],
            routes,
        }
    }

    fn first_free_slot(&self) -> Option<usize> {
        self.occupied.iter().position(|taken| !taken)
    }

    /// Step 3 of spec.md §4.10: reserves a `Client<N>` slot for a freshly
    /// accepted `socket` and adds it to `pool`. `false` if either the pool
    /// or this server's own slot table has no room; the caller is expected
    /// to drop `socket` in that case.
    pub fn accept_into<S: Socket, P: SocketPool<S>>(&mut self, pool: &mut P, socket: S) -> bool {
        let Some(slot) = self.first_free_slot() else {
            return false;
        };
        if !pool.append(socket) {
            return false;
        }
        self.occupied[slot] = true;
        self.clients[slot].reset(false);
        true
    }

    /// Runs steps 1-2 of spec.md §4.10: wait up to `timeout_ms` for
    /// readiness, then service every client the pool reports readable.
    /// Step 3 (accepting a new connection) is the caller's job via
    /// `accept_into`, since the listening socket's own readiness check is
    /// transport-specific (spec.md §6 gives it no `Socket`-trait shape of
    /// its own).
    pub fn run_iteration<S: Socket, P: SocketPool<S>>(&mut self, pool: &mut P, timeout_ms: u64) -> Result<()> {
        pool.select_active(timeout_ms)?;

        let mut start = 0;
        while let Some(index) = pool.get_readable_socket(start) {
            start = index + 1;
            self.service_client(pool, index);
        }
        Ok(())
    }

    fn service_client<S: Socket, P: SocketPool<S>>(&mut self, pool: &mut P, index: usize) {
        if index >= MAX_CLIENTS || !self.occupied[index] {
            warn!("readable index outside the client-slot table");
            return;
        }

        if self.clients[index].vault().tail_free() == 0 {
            self.reject_too_large_and_close(pool, index);
            return;
        }

        if !self.recv_into_vault(pool, index) {
            return;
        }

        // `Client::parse` only ever drives `Invalid`/`ReqLine`/`RecvHeaders`
        // itself (see its own doc comment) — the header phase's further
        // progress (`Done`/`NeedMoreData`/`NeedRefillHeaders`) is reported
        // back as a `RouteOutcome` by the route's own header loop, not as a
        // `ParsingStatus`. So the router runs on every readable byte once
        // the request line has parsed, and `RouteOutcome` alone decides
        // whether this client is done, waiting, or being torn down.
        match self.clients[index].parse() {
            ParsingStatus::Invalid => self.reject_and_close(pool, index, StatusCode::BadRequest),
            ParsingStatus::ReqLine => {}
            ParsingStatus::RecvHeaders | ParsingStatus::NeedRefillHeaders | ParsingStatus::HeadersDone | ParsingStatus::ReqDone => {
                self.dispatch_and_reply(pool, index);
            }
        }
    }

    /// Reads one batch of bytes for the client at `index` into its vault.
    /// `false` means the connection is already being torn down (peer
    /// closed, recv failed, or the vault rejected the append) and the
    /// caller must not touch this slot further this iteration.
    fn recv_into_vault<S: Socket, P: SocketPool<S>>(&mut self, pool: &mut P, index: usize) -> bool {
        let client = &mut self.clients[index];
        let dst = client.vault_mut().recv_tail_slice_mut();
        if dst.is_empty() {
            return true;
        }
        let socket = pool.socket_mut(index);
        let n = match socket.recv(dst, 1, dst.len()) {
            Ok(n) => n,
            Err(e) => {
                warn!("client {} recv failed: {}", index, e);
                self.close_client(pool, index);
                return false;
            }
        };
        if n == 0 {
            trace!("client {} closed its socket", index);
            self.close_client(pool, index);
            return false;
        }
        if self.clients[index].vault_mut().stored(n).is_err() {
            warn!("client {} overran its vault on append", index);
            self.close_client(pool, index);
            return false;
        }
        true
    }

    fn dispatch_and_reply<S: Socket, P: SocketPool<S>>(&mut self, pool: &mut P, index: usize) {
        let mut buf = [0u8; N];
        let mut out = Out::wrap(&mut buf);
        let outcome = dispatch_request(self.routes, &mut self.clients[index], &mut out);
        match outcome {
            RouteOutcome::Done => {
                let socket = pool.socket_mut(index);
                if socket.send(out.written()).is_err() {
                    warn!("client {} reply send failed", index);
                }
                self.close_client(pool, index);
            }
            RouteOutcome::NoMatch => self.reject_and_close(pool, index, StatusCode::NotFound),
            RouteOutcome::Error => self.reject_and_close(pool, index, StatusCode::BadRequest),
            // A route's own header loop asked for more header bytes; the
            // vault is ready for another recv on a later iteration.
            RouteOutcome::NeedMoreData | RouteOutcome::NeedRefillHeaders => {}
        }
    }

    fn reject_and_close<S: Socket, P: SocketPool<S>>(&mut self, pool: &mut P, index: usize, code: StatusCode) {
        let mut buf = [0u8; 128];
        let mut out = Out::wrap(&mut buf);
        let socket = pool.socket_mut(index);
        let answer: Answer<'_, NoHeaders> = Answer::Code(code);
        if answer::emit(answer, false, &mut out, socket).is_err() {
            warn!("client {} reject reply failed to send", index);
        }
        self.close_client(pool, index);
    }

    /// Spec.md's oversized-header scenario (S4) replies with a bare status
    /// line and no `Content-Length` — unlike every other rejection, there is
    /// no body length to declare once the vault itself has overrun.
    fn reject_too_large_and_close<S: Socket, P: SocketPool<S>>(&mut self, pool: &mut P, index: usize) {
        let mut buf = [0u8; 64];
        let mut out = Out::wrap(&mut buf);
        let socket = pool.socket_mut(index);
        if answer::emit_status_line_only(StatusCode::EntityTooLarge, &mut out, socket).is_err() {
            warn!("client {} reject reply failed to send", index);
        }
        self.close_client(pool, index);
    }

    fn close_client<S: Socket, P: SocketPool<S>>(&mut self, pool: &mut P, index: usize) {
        pool.remove(index);
        self.occupied[index] = false;
        self.clients[index].reset(false);
    }
}

/// `std`-only `Socket` over a connected TCP stream, for `demos/demo_server.rs`.
#[cfg(feature = "std")]
mod tcp {
    use std::io::{Read, Write};
    use std::net::TcpStream;

    use crate::error::{Error, Result};
    use crate::socket::Socket;

    pub struct TcpSocket {
        stream: TcpStream,
        valid: bool,
    }

    impl TcpSocket {
        pub fn new(stream: TcpStream) -> Result<Self> {
            stream.set_nonblocking(true).map_err(|_| Error::SocketError)?;
            Ok(TcpSocket { stream, valid: true })
        }
    }

    impl Socket for TcpSocket {
        fn recv(&mut self, buf: &mut [u8], _min: usize, max: usize) -> Result<usize> {
            match self.stream.read(&mut buf[..max]) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
                Err(_) => {
                    self.valid = false;
                    Err(Error::SocketError)
                }
            }
        }

        fn send(&mut self, buf: &[u8]) -> Result<usize> {
            self.stream.write_all(buf).map(|_| buf.len()).map_err(|_| {
                self.valid = false;
                Error::SocketError
            })
        }

        fn is_valid(&self) -> bool {
            self.valid
        }

        fn reset(&mut self) {
            self.valid = true;
        }
    }
}

#[cfg(feature = "std")]
pub use tcp::TcpSocket;
