//! Static header sets (spec.md C5).
//!
//! A header set is a compile-time-declared, heterogeneous collection of
//! value slots, one per header identifier a route cares about, plus an
//! always-present `Authorization` slot (every route accepts it, matching
//! the teacher's `Call` always carrying an auth slot regardless of verb).
//! `request_header_set!`/`response_header_set!` generate the struct; the
//! generated type gives O(1) typed field access (`set.content_type()`) and
//! O(k) runtime lookup (`accept_header`, `get_runtime`) over the same
//! small fixed list.

use crate::header::RequestHeader;
use crate::out::Out;
use crate::vault::Vault;
use crate::value::{ParsingError, WriteValue};
use crate::view::ByteView;

impl<T: WriteValue> WriteValue for (T, bool) {
    fn write(&self, buffer: &mut [u8], size: &mut usize) -> bool {
        self.0.write(buffer, size)
    }
}

/// Object-safe view of a populated slot, used by `get_runtime` and
/// `send_headers` without needing to know the slot's concrete type.
pub trait HeaderSlot: WriteValue {
    fn is_present(&self) -> bool;
}

impl<T: WriteValue> HeaderSlot for (T, bool) {
    fn is_present(&self) -> bool {
        self.1
    }
}

/// The contract route.rs's generic header loop (spec.md §4.8) needs from a
/// request-side header set, without knowing which concrete set a route
/// declared.
pub trait RequestHeaderSet<'a>: Default {
    fn accept_header(name: &[u8]) -> Option<RequestHeader>;
    fn accept_and_parse(&mut self, id: RequestHeader, val: &mut ByteView<'a>) -> ParsingError;
    fn cache_recv_ranges<const N: usize>(&mut self, vault: &Vault<N>);
    fn persist<const N: usize>(&mut self, vault: &mut Vault<N>);
    fn send_headers(&self, out: &mut Out<'_>) -> bool;
}

/// The contract the answer emitter (C9, `answer.rs`) needs from a
/// route's declared response-side header set: just enough to serialize
/// whatever extra headers (`Location`, `ETag`, ...) the route populated,
/// ahead of the `Content-Length`/`Transfer-Encoding` line C9 adds itself.
pub trait ResponseHeaderSet: Default {
    fn send_headers(&self, out: &mut Out<'_>) -> bool;
}

/// A response header set with nothing to add, for `CodeAnswer`/`SimpleAnswer`
/// routes that only ever need the status line and a content header.
#[derive(Default)]
pub struct NoHeaders;

impl ResponseHeaderSet for NoHeaders {
    fn send_headers(&self, _out: &mut Out<'_>) -> bool {
        true
    }
}

/// Declares a request-side header set. `$cap` names the vault capacity
/// const generic carried through to `persist`.
#[macro_export]
macro_rules! request_header_set {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident<$lt:lifetime> {
            $( $field:ident : $header:ident => $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        $vis struct $name<$lt> {
            authorization: ($crate::value::StringValue<$lt>, bool),
            $( $field: ($ty, bool) ),*
        }

        impl<$lt> $name<$lt> {
            /// O(k) runtime lookup, used by the generic header loop's
            /// refill variant and by diagnostics.
            pub fn get_runtime(&self, id: $crate::header::RequestHeader) -> Option<&dyn $crate::headerset::HeaderSlot> {
                use $crate::header::RequestHeader;
                use $crate::headerset::HeaderSlot;
                let slot: &dyn HeaderSlot = match id {
                    RequestHeader::Authorization => &self.authorization,
                    $( RequestHeader::$header => &self.$field, )*
                    #[allow(unreachable_patterns)]
                    _ => return None,
                };
                if slot.is_present() { Some(slot) } else { None }
            }

            pub fn authorization(&self) -> &$crate::value::StringValue<$lt> {
                &self.authorization.0
            }

            $(
                pub fn $field(&self) -> &$ty {
                    &self.$field.0
                }
            )*
        }

        impl<$lt> $crate::headerset::RequestHeaderSet<$lt> for $name<$lt> {
            /// O(k) linear scan over this set's declared wire names.
            fn accept_header(name: &[u8]) -> Option<$crate::header::RequestHeader> {
                use $crate::header::RequestHeader;
                if RequestHeader::Authorization.wire_name().as_bytes().eq_ignore_ascii_case(name) {
                    return Some(RequestHeader::Authorization);
                }
                $(
                    if RequestHeader::$header.wire_name().as_bytes().eq_ignore_ascii_case(name) {
                        return Some(RequestHeader::$header);
                    }
                )*
                None
            }

            /// Dispatches to the slot matching `id`, marking it present.
            fn accept_and_parse(
                &mut self,
                id: $crate::header::RequestHeader,
                val: &mut $crate::view::ByteView<$lt>,
            ) -> $crate::value::ParsingError {
                use $crate::header::RequestHeader;
                use $crate::value::HeaderValue;
                match id {
                    RequestHeader::Authorization => {
                        let status = self.authorization.0.parse_from(val);
                        self.authorization.1 = true;
                        status
                    }
                    $(
                        RequestHeader::$header => {
                            let status = self.$field.0.parse_from(val);
                            self.$field.1 = true;
                            status
                        }
                    )*
                    #[allow(unreachable_patterns)]
                    _ => $crate::value::ParsingError::InvalidRequest,
                }
            }

            /// Caches each present slot's recv-region offset while the
            /// caller still only holds a shared borrow of `vault` (the
            /// generic header loop's common path). Must run before the
            /// exclusive borrow `persist` needs becomes available.
            fn cache_recv_ranges<const N: usize>(&mut self, vault: &$crate::vault::Vault<N>) {
                use $crate::value::Persistable;
                if self.authorization.1 {
                    self.authorization.0.cache_recv_range(vault);
                }
                $(
                    if self.$field.1 {
                        self.$field.0.cache_recv_range(vault);
                    }
                )*
            }

            /// Rewrites every present slot's borrowed bytes into the
            /// vault's session region (spec.md §4.7 refill discipline).
            fn persist<const N: usize>(&mut self, vault: &mut $crate::vault::Vault<N>) {
                use $crate::value::Persistable;
                if self.authorization.1 {
                    self.authorization.0.persist(vault);
                }
                $(
                    if self.$field.1 {
                        self.$field.0.persist(vault);
                    }
                )*
            }

            /// Serializes every present slot as `Canonical-Name: value\r\n`
            /// (spec.md §4.5).
            fn send_headers(&self, out: &mut $crate::out::Out<'_>) -> bool {
                use $crate::header::RequestHeader;
                if self.authorization.1 && !out.write_header(RequestHeader::Authorization.wire_name(), &self.authorization.0) {
                    return false;
                }
                $(
                    if self.$field.1 && !out.write_header(RequestHeader::$header.wire_name(), &self.$field.0) {
                        return false;
                    }
                )*
                true
            }
        }
    };
}

/// Declares a response-side header set (used by `http_client`).
#[macro_export]
macro_rules! response_header_set {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident<$lt:lifetime> {
            $( $field:ident : $header:ident => $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        $vis struct $name<$lt> {
            $( $field: ($ty, bool) ),*
        }

        impl<$lt> $name<$lt> {
            pub fn accept_header(name: &[u8]) -> Option<$crate::header::ResponseHeader> {
                use $crate::header::ResponseHeader;
                $(
                    if ResponseHeader::$header.wire_name().as_bytes().eq_ignore_ascii_case(name) {
                        return Some(ResponseHeader::$header);
                    }
                )*
                None
            }

            pub fn accept_and_parse(
                &mut self,
                id: $crate::header::ResponseHeader,
                val: &mut $crate::view::ByteView<$lt>,
            ) -> $crate::value::ParsingError {
                use $crate::header::ResponseHeader;
                use $crate::value::HeaderValue;
                match id {
                    $(
                        ResponseHeader::$header => {
                            let status = self.$field.0.parse_from(val);
                            self.$field.1 = true;
                            status
                        }
                    )*
                    #[allow(unreachable_patterns)]
                    _ => $crate::value::ParsingError::InvalidRequest,
                }
            }

            pub fn get_runtime(&self, id: $crate::header::ResponseHeader) -> Option<&dyn $crate::headerset::HeaderSlot> {
                use $crate::header::ResponseHeader;
                use $crate::headerset::HeaderSlot;
                let slot: &dyn HeaderSlot = match id {
                    $( ResponseHeader::$header => &self.$field, )*
                    #[allow(unreachable_patterns)]
                    _ => return None,
                };
                if slot.is_present() { Some(slot) } else { None }
            }

            $(
                pub fn $field(&self) -> &$ty {
                    &self.$field.0
                }
            )*

            pub fn cache_recv_ranges<const N: usize>(&mut self, vault: &$crate::vault::Vault<N>) {
                use $crate::value::Persistable;
                $(
                    if self.$field.1 {
                        self.$field.0.cache_recv_range(vault);
                    }
                )*
            }

            pub fn persist<const N: usize>(&mut self, vault: &mut $crate::vault::Vault<N>) {
                use $crate::value::Persistable;
                $(
                    if self.$field.1 {
                        self.$field.0.persist(vault);
                    }
                )*
            }

            /// Serializes every present slot as `Canonical-Name: value\r\n`.
            /// Named identically to `RequestHeaderSet::send_headers`: a
            /// response set plays the receiving role when `http_client`
            /// parses a response and the emitting role when the server
            /// (C9) writes one out.
            pub fn send_headers(&self, out: &mut $crate::out::Out<'_>) -> bool {
                use $crate::header::ResponseHeader;
                $(
                    if self.$field.1 && !out.write_header(ResponseHeader::$header.wire_name(), &self.$field.0) {
                        return false;
                    }
                )*
                true
            }
        }

        impl<$lt> $crate::headerset::ResponseHeaderSet for $name<$lt> {
            fn send_headers(&self, out: &mut $crate::out::Out<'_>) -> bool {
                $name::send_headers(self, out)
            }
        }
    };
}
