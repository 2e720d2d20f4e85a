//! An embedded-friendly HTTP/1.1 server and client core.
//!
//! Built for resource-constrained deployments: fixed per-connection memory
//! budgets (const-generic vault and client-slot capacities), no dynamic
//! allocation on any request path, and no pluggable async runtime. The
//! hard part — and the bulk of this crate — is the request/response
//! pipeline: a byte-accurate wire parser (`reqline`, `value`, `route`), a
//! per-connection receive buffer with in-place persistence (`vault`), a
//! compile-time-declared header set (`headerset`) and route table
//! (`route`), the connection state machine (`client`), and the answer
//! emission paths (`answer`) — fixed-length, chunked, and streamed.
//!
//! `server` drives all of the above against a pluggable `Socket`/
//! `SocketPool` pair (spec's external socket contract); `http_client`
//! (behind the `build-client` feature) drives the same wire codec in the
//! outbound direction.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::needless_lifetimes)]

#[cfg(feature = "std")]
extern crate std;

pub mod answer;
pub mod client;
pub mod error;
pub mod header;
pub mod headerset;
pub mod out;
pub mod reqline;
pub mod route;
pub mod server;
pub mod socket;
pub mod value;
pub mod vault;
pub mod view;

#[cfg(feature = "build-client")]
pub mod http_client;

pub use error::{Error, Result};
