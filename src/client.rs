//! The per-connection state machine (spec.md C7).
//!
//! Owns a `Vault<N>` and tracks which phase of one request this connection
//! is in. Request-line parsing happens here; per-header dispatch (which
//! needs a route's declared header set) is driven by `route`'s generic
//! header loop operating on a `&mut Client<N>`.

use log::{debug, trace, warn};

use crate::header::{Method, Version};
use crate::reqline::{normalize_path, parse_request_line};
use crate::vault::{Vault, VaultRef};
use crate::view::ByteView;

/// Mirrors spec.md §4.7's state diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsingStatus {
    Invalid,
    ReqLine,
    RecvHeaders,
    NeedRefillHeaders,
    HeadersDone,
    ReqDone,
}

/// One accepted connection's parsing state plus its transient vault.
pub struct Client<const N: usize> {
    vault: Vault<N>,
    status: ParsingStatus,
    method: Option<Method>,
    version: Option<Version>,
    path: VaultRef,
    query: VaultRef,
}

impl<const N: usize> Default for Client<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Client<N> {
    pub fn new() -> Self {
        Client {
            vault: Vault::new(),
            status: ParsingStatus::ReqLine,
            method: None,
            version: None,
            path: VaultRef::EMPTY,
            query: VaultRef::EMPTY,
        }
    }

    pub fn vault(&self) -> &Vault<N> {
        &self.vault
    }

    pub fn vault_mut(&mut self) -> &mut Vault<N> {
        &mut self.vault
    }

    pub fn status(&self) -> ParsingStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ParsingStatus) {
        self.status = status;
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub fn path(&self) -> VaultRef {
        self.path
    }

    pub fn query(&self) -> VaultRef {
        self.query
    }

    /// Drives the `Invalid`/`ReqLine` part of the state machine: waits for
    /// a full request line, parses it, normalizes and persists the path,
    /// and advances to `RecvHeaders`. A route-driven header loop takes it
    /// from there; this method is a no-op once past `ReqLine`.
    pub fn parse(&mut self) -> ParsingStatus {
        if self.status == ParsingStatus::Invalid {
            self.status = ParsingStatus::ReqLine;
        }
        if self.status != ParsingStatus::ReqLine {
            return self.status;
        }

        let view = self.vault.view();
        let idx = view.find(b"\r\n");
        if idx == view.len() {
            if self.vault.tail_free() == 0 {
                warn!("request line exceeds vault capacity");
                self.status = ParsingStatus::Invalid;
            }
            return self.status;
        }
        let line = view.mid(0, idx);
        let consumed = idx + 2;

        let outcome = parse_request_line(line).and_then(|rl| {
            let mut path_scratch = [0u8; 512];
            let path_len = normalize_path(rl.absolute_path, &mut path_scratch)?;

            let query_bytes = rl.query.as_bytes();
            let mut query_scratch = [0u8; 512];
            if query_bytes.len() > query_scratch.len() {
                return Err(crate::error::Error::InvalidRequest);
            }
            query_scratch[..query_bytes.len()].copy_from_slice(query_bytes);

            Ok((rl.method, rl.version, path_scratch, path_len, query_scratch, query_bytes.len()))
        });

        if self.vault.drop(consumed).is_err() {
            warn!("failed to drop consumed request line bytes");
            self.status = ParsingStatus::Invalid;
            return self.status;
        }

        match outcome {
            Ok((method, version, path_scratch, path_len, query_scratch, query_len)) => {
                match self.vault.persist(ByteView::new(&path_scratch[..path_len])) {
                    Ok(path_ref) => match self.vault.persist(ByteView::new(&query_scratch[..query_len])) {
                        Ok(query_ref) => {
                            trace!("request line parsed: {} bytes path, {} bytes query", path_len, query_len);
                            self.method = Some(method);
                            self.version = Some(version);
                            self.path = path_ref;
                            self.query = query_ref;
                            self.status = ParsingStatus::RecvHeaders;
                        }
                        Err(_) => {
                            warn!("failed to persist query string");
                            self.status = ParsingStatus::Invalid;
                        }
                    },
                    Err(_) => {
                        warn!("failed to persist normalized path");
                        self.status = ParsingStatus::Invalid;
                    }
                }
            }
            Err(_) => {
                debug!("malformed request line");
                self.status = ParsingStatus::Invalid;
            }
        }
        self.status
    }

    /// Clears parsing state and vault contents for the next request on
    /// this connection (spec.md §4.7 reset).
    pub fn reset(&mut self, zero: bool) {
        self.vault.reset(zero);
        self.status = ParsingStatus::ReqLine;
        self.method = None;
        self.version = None;
        self.path = VaultRef::EMPTY;
        self.query = VaultRef::EMPTY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed<const N: usize>(client: &mut Client<N>, bytes: &[u8]) {
        let dst = client.vault_mut().recv_tail_slice_mut();
        dst[..bytes.len()].copy_from_slice(bytes);
        client.vault_mut().stored(bytes.len()).unwrap();
    }

    #[test]
    fn parses_request_line_and_advances() {
        let mut c: Client<256> = Client::new();
        feed(&mut c, b"GET /a/../b HTTP/1.1\r\nHost: x\r\n\r\n");
        assert_eq!(c.parse(), ParsingStatus::RecvHeaders);
        assert_eq!(c.method(), Some(Method::Get));
        assert_eq!(c.version(), Some(Version::Http11));
        assert_eq!(c.vault().resolve(c.path()).as_bytes(), b"/b");
    }

    #[test]
    fn persists_query_string_separately_from_path() {
        let mut c: Client<256> = Client::new();
        feed(&mut c, b"GET /search?q=rust HTTP/1.1\r\nHost: x\r\n\r\n");
        assert_eq!(c.parse(), ParsingStatus::RecvHeaders);
        assert_eq!(c.vault().resolve(c.path()).as_bytes(), b"/search");
        assert_eq!(c.vault().resolve(c.query()).as_bytes(), b"q=rust");
    }

    #[test]
    fn query_is_empty_when_absent() {
        let mut c: Client<256> = Client::new();
        feed(&mut c, b"GET /a/../b HTTP/1.1\r\nHost: x\r\n\r\n");
        assert_eq!(c.parse(), ParsingStatus::RecvHeaders);
        assert!(c.vault().resolve(c.query()).is_empty());
    }

    #[test]
    fn waits_for_more_data_without_crlf() {
        let mut c: Client<256> = Client::new();
        feed(&mut c, b"GET /a");
        assert_eq!(c.parse(), ParsingStatus::ReqLine);
    }

    #[test]
    fn invalid_method_goes_invalid() {
        let mut c: Client<256> = Client::new();
        feed(&mut c, b"PATCH / HTTP/1.1\r\n");
        assert_eq!(c.parse(), ParsingStatus::Invalid);
    }

    #[test]
    fn reset_returns_to_reqline() {
        let mut c: Client<256> = Client::new();
        feed(&mut c, b"GET / HTTP/1.1\r\n");
        c.parse();
        c.reset(false);
        assert_eq!(c.status(), ParsingStatus::ReqLine);
        assert!(c.vault().view().is_empty());
    }
}
