//! The socket contract the core consumes (spec.md §6 "Socket contract").
//!
//! The parser, vault, header set, and route table are all sans-IO — they
//! read and write plain byte buffers and never touch a socket themselves.
//! Only the answer emitter's body-streaming path (C9) and the server loop
//! (C10) need an actual transport, so that's the only place this trait is
//! used. A `std`-gated `std::net::TcpStream` implementation lives in
//! `server.rs`; tests use an in-memory double.

use crate::error::Result;

/// One accepted (or listening) connection's transport.
pub trait Socket {
    /// Reads at least `min` and at most `max` bytes into `buf`, returning
    /// the count actually read. `0` means the peer closed the connection.
    fn recv(&mut self, buf: &mut [u8], min: usize, max: usize) -> Result<usize>;

    /// Writes `buf` in full or fails; spec.md §4.9 treats any short write
    /// as a hard abort rather than something the caller retries.
    fn send(&mut self, buf: &[u8]) -> Result<usize>;

    fn is_valid(&self) -> bool;

    fn reset(&mut self);
}

/// The fixed-size collection of accepted connections the server loop polls
/// (spec.md §4.10 step 1-3).
pub trait SocketPool<S: Socket> {
    /// Adds `socket` to the first free slot; `false` if the pool is full.
    fn append(&mut self, socket: S) -> bool;

    fn remove(&mut self, index: usize);

    /// Borrows the socket at `index` for an actual `recv`/`send` call.
    /// Panics if `index` names a slot `append`/`get_readable_socket` never
    /// populated — `server.rs` only ever calls this with indices it just
    /// got back from one of those.
    fn socket_mut(&mut self, index: usize) -> &mut S;

    /// Blocks up to `timeout_ms` for at least one socket (including the
    /// listening socket, if polled alongside) to become readable.
    fn select_active(&mut self, timeout_ms: u64) -> Result<()>;

    fn is_readable(&self, index: usize) -> bool;

    /// The index of the next readable client socket at or after
    /// `start_index`, or `None` once the scan reaches the end.
    fn get_readable_socket(&mut self, start_index: usize) -> Option<usize>;
}
