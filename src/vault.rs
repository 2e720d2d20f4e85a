//! The transient vault (spec.md C2).
//!
//! Mirrors the split the original embedded implementation makes between a
//! compacting receive scratch region and a stable, append-only session
//! region: bytes that only matter for the current parse step live in
//! `recv` and can be reclaimed by `drop`; bytes a route wants to keep past
//! a refill or past the callback returning are copied into `session` via
//! `persist`, which never moves once written. That split is what lets
//! `persist`ed views stay valid through later `drop` calls without any
//! unsafe pointer bookkeeping: a `VaultRef` is a plain offset into
//! `session`, not a borrow, so it can be stored on the stack (or in a
//! header slot) independently of the vault's lifetime.

use crate::error::{Error, Result};
use crate::view::ByteView;

/// A stable reference to bytes persisted into a vault's session region.
///
/// Unlike a `ByteView`, a `VaultRef` does not borrow the vault — it is a
/// plain `(offset, len)` pair, `Copy`, safe to store in a request line or a
/// header slot for the lifetime of the request. Resolve it back to bytes
/// with `Vault::resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VaultRef {
    offset: usize,
    len: usize,
}

impl VaultRef {
    pub const EMPTY: VaultRef = VaultRef { offset: 0, len: 0 };

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A fixed-capacity per-connection byte region, split into a compacting
/// receive scratch area and a stable session arena.
pub struct Vault<const N: usize> {
    recv: [u8; N],
    recv_head: usize,
    recv_tail: usize,
    session: [u8; N],
    session_tail: usize,
}

impl<const N: usize> Default for Vault<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Vault<N> {
    pub fn new() -> Self {
        assert!(N.is_power_of_two(), "vault capacity must be a power of two");
        Vault {
            recv: [0; N],
            recv_head: 0,
            recv_tail: 0,
            session: [0; N],
            session_tail: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes of receive-region headroom remaining before this vault must
    /// report failure rather than grow (spec.md §4.2).
    pub const fn tail_free(&self) -> usize {
        N - (self.recv_tail - self.recv_head)
    }

    /// The currently-buffered, not-yet-consumed receive bytes.
    pub fn view(&self) -> ByteView<'_> {
        ByteView::new(&self.recv[self.recv_head..self.recv_tail])
    }

    /// The writable tail of the receive region. Compacts in place first if
    /// the physical tail has run off the end of the array but dropped
    /// bytes at the head have freed logical room — this is the mechanism
    /// that makes `NeedRefillHeaders` (spec.md §4.7) workable without ever
    /// growing the backing array. Compaction only ever runs between
    /// `&mut self` calls, so it is rejected by the borrow checker (not just
    /// by convention) while any `ByteView` from `view()` is still live.
    pub fn recv_tail_slice_mut(&mut self) -> &mut [u8] {
        if self.recv_tail == N && self.recv_head > 0 {
            self.compact();
        }
        &mut self.recv[self.recv_tail..N]
    }

    fn compact(&mut self) {
        self.recv.copy_within(self.recv_head..self.recv_tail, 0);
        self.recv_tail -= self.recv_head;
        self.recv_head = 0;
    }

    /// Commits `k` newly written bytes at the receive tail.
    pub fn stored(&mut self, k: usize) -> Result<()> {
        if k > self.tail_free() || self.recv_tail + k > N {
            return Err(Error::VaultOverflow);
        }
        self.recv_tail += k;
        Ok(())
    }

    /// Advances the receive head by `k`, discarding the consumed prefix.
    /// Does not zero the bytes; only their offsets become unreachable via
    /// `view()`.
    pub fn drop(&mut self, k: usize) -> Result<()> {
        if self.recv_head + k > self.recv_tail {
            return Err(Error::VaultOverflow);
        }
        self.recv_head += k;
        Ok(())
    }

    /// Copies `v`'s bytes into the session region and returns a stable
    /// reference to them. `v` must NOT borrow from this same vault's
    /// `recv` region — holding that borrow live through a call that also
    /// needs `&mut self` doesn't borrow-check. Callers persisting a view
    /// obtained from this vault's own `view()` must use
    /// `offset_in_recv`/`persist_recv_range` instead (see `Persistable`
    /// impls in `value.rs`); this method is for copying in bytes from
    /// elsewhere (a caller-owned stack buffer, e.g. the normalized path in
    /// `client::Client::parse`).
    pub fn persist(&mut self, v: ByteView<'_>) -> Result<VaultRef> {
        let len = v.len();
        if len == 0 {
            return Ok(VaultRef { offset: self.session_tail, len: 0 });
        }
        if self.session_tail + len > N {
            return Err(Error::VaultOverflow);
        }
        let start = self.session_tail;
        self.session[start..start + len].copy_from_slice(v.as_bytes());
        self.session_tail += len;
        Ok(VaultRef { offset: start, len })
    }

    /// `Some(offset)` if `v` is a sub-view of this vault's own `recv`
    /// buffer, `None` otherwise. Compares raw pointers rather than
    /// borrowing `v`'s backing data, so this can run while `v` is still
    /// alive and a later `&mut self` call (to actually do the copy) is
    /// still needed — that's the whole reason this is split out from
    /// `persist_recv_range` instead of taking `v` directly.
    pub fn offset_in_recv(&self, v: &ByteView<'_>) -> Option<usize> {
        let base = self.recv.as_ptr() as usize;
        let ptr = v.as_ptr() as usize;
        let end = base + N;
        if ptr < base || ptr > end {
            return None;
        }
        Some(ptr - base)
    }

    /// Copies `len` bytes starting at `start` within this vault's own
    /// `recv` buffer into the session region. Companion to
    /// `offset_in_recv`: callers first resolve a `ByteView`'s offset (a
    /// plain `usize`, no borrow) while it's still readable, then call this
    /// once they no longer need that view alive — which is what lets this
    /// take `&mut self` on the very vault the bytes came from.
    pub fn persist_recv_range(&mut self, start: usize, len: usize) -> Result<VaultRef> {
        if len == 0 {
            return Ok(VaultRef { offset: self.session_tail, len: 0 });
        }
        if start + len > N || start + len > self.recv_tail || self.session_tail + len > N {
            return Err(Error::VaultOverflow);
        }
        let dst = self.session_tail;
        self.session[dst..dst + len].copy_from_slice(&self.recv[start..start + len]);
        self.session_tail += len;
        Ok(VaultRef { offset: dst, len })
    }

    /// Resolves a previously persisted reference back to its bytes.
    pub fn resolve(&self, r: VaultRef) -> ByteView<'_> {
        ByteView::new(&self.session[r.offset..r.offset + r.len])
    }

    /// Clears all state. Called on connection close or request completion
    /// (spec.md §3). Zeroing the bytes themselves is optional and only
    /// enabled by the paranoid-mode flag (spec.md §4.7).
    pub fn reset(&mut self, zero: bool) {
        self.recv_head = 0;
        self.recv_tail = 0;
        self.session_tail = 0;
        if zero {
            self.recv = [0; N];
            self.session = [0; N];
        }
    }
}
