//! Per-header typed value parsers (spec.md C4).
//!
//! Every parser here implements [`HeaderValue`]: parse in place from a
//! [`ByteView`], report one of `EndOfRequest` / `MoreData` / `InvalidRequest`
//! the way `HeaderMap.hpp`'s `ValueBase::parseFrom` does, and serialize back
//! out through `write`. Parsers that retain a view into the receive buffer
//! also implement [`Persistable`] so the connection state machine can
//! rewrite them to point into the vault's session region before a refill
//! drops the bytes they reference (spec.md §4.7).
//!
//! `HeaderValue` is parameterized over the lifetime of the input view
//! rather than using an elided `&mut ByteView<'_>`: a slot that borrows
//! (`StringValue<'a>`, `EnumWithAttribute<'a, E>`) can only be fed a view of
//! exactly that same `'a`, which is what lets the compiler, not a runtime
//! check, enforce that a slot never outlives the bytes it points at.

use crate::header::TokenEnum;
use crate::vault::{Vault, VaultRef};
use crate::view::ByteView;

/// Outcome of parsing one header value, matching `HeaderMap::ParsingError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsingError {
    InvalidRequest,
    EndOfRequest,
    MoreData,
}

/// Serialization is lifetime-independent (it only ever reads `&self`), so it
/// lives in its own trait rather than on `HeaderValue<'a>` — a bound like
/// `T: for<'a> HeaderValue<'a>` would reject `EnumWithAttribute<'a, E>`, which
/// only implements `HeaderValue` for its own fixed `'a`, not for every `'a`.
pub trait WriteValue {
    /// Serializes the value into `buffer`, returning `false` if `buffer` is
    /// too small. `size` is set to the number of bytes that would be (or
    /// were) written, mirroring the source's `WriteCheck` macro.
    fn write(&self, buffer: &mut [u8], size: &mut usize) -> bool;
}

/// The common contract every header value slot implements, generic over the
/// lifetime `'a` of the bytes being parsed.
pub trait HeaderValue<'a>: WriteValue {
    /// Parses from `val`, consuming as much as the grammar requires.
    fn parse_from(&mut self, val: &mut ByteView<'a>) -> ParsingError;
}

/// A value that retains a borrow into the receive buffer and must be
/// rewritten into the vault's session region to survive a refill.
///
/// Split into two phases on purpose. `cache_recv_range` only ever takes
/// `&Vault<N>` and reads the slot's borrowed `ByteView`; `persist` only
/// ever takes `&mut Vault<N>` and reads the plain `(offset, len)` pair
/// `cache_recv_range` stored, never the `ByteView` itself again. A single
/// `persist(&mut self, vault: &mut Vault<N>)` that read the `ByteView`
/// directly would need the shared loan backing it (from whatever produced
/// the view — the header loop's `&'a Vault<N>`) to still be live at the
/// exact point it also needs `&mut Vault<N>`, which doesn't borrow-check.
/// Running the two phases back to back — cache while the loop still
/// holds its shared borrow, persist once that borrow has ended — avoids
/// ever needing both at once. Implementors must not fall back to reading
/// the original `ByteView` field from inside `persist` "just in case" —
/// that reintroduces the exact conflict this split exists to avoid, since
/// the field keeps the caller's original borrow alive textually even on a
/// branch that happens not to run. If `cache_recv_range` found nothing to
/// cache, `persist` has nothing to do.
///
/// The same reasoning applies one level further: once `persist` has copied
/// a slot's bytes into the session region, it overwrites the original
/// `ByteView` field with `ByteView::empty()` rather than leaving it in
/// place. Any accessor that reads that field (directly, or through a
/// `resolve`-style fallback arm) would otherwise keep the long-dead loan
/// textually alive for the borrow checker even though the accessor only
/// ever takes the persisted branch at runtime once `persist` has run.
pub trait Persistable {
    fn cache_recv_range<const N: usize>(&mut self, vault: &Vault<N>);
    fn persist<const N: usize>(&mut self, vault: &mut Vault<N>);
}

fn write_bytes(buffer: &mut [u8], size: &mut usize, bytes: &[u8]) -> bool {
    *size = bytes.len();
    if buffer.len() < bytes.len() {
        return false;
    }
    buffer[..bytes.len()].copy_from_slice(bytes);
    true
}

/// An opaque, trimmed string value (spec.md §4.4 "String value").
#[derive(Debug, Clone, Copy)]
pub struct StringValue<'a> {
    pub value: ByteView<'a>,
    recv_range: Option<(usize, usize)>,
    persisted: Option<VaultRef>,
}

impl<'a> Default for StringValue<'a> {
    fn default() -> Self {
        StringValue { value: ByteView::empty(), recv_range: None, persisted: None }
    }
}

impl<'a> StringValue<'a> {
    /// Resolves to the persisted copy if this slot was persisted, else the
    /// live (possibly about-to-be-dropped) view.
    pub fn resolve<'v, const N: usize>(&'v self, vault: &'v Vault<N>) -> ByteView<'v>
    where
        'a: 'v,
    {
        match self.persisted {
            Some(r) => vault.resolve(r),
            None => self.value,
        }
    }
}

impl<'a> HeaderValue<'a> for StringValue<'a> {
    fn parse_from(&mut self, val: &mut ByteView<'a>) -> ParsingError {
        let mut v = *val;
        v.trim(b' ');
        self.value = v;
        ParsingError::EndOfRequest
    }
}

impl<'a> WriteValue for StringValue<'a> {
    fn write(&self, buffer: &mut [u8], size: &mut usize) -> bool {
        write_bytes(buffer, size, self.value.as_bytes())
    }
}

impl<'a> Persistable for StringValue<'a> {
    fn cache_recv_range<const N: usize>(&mut self, vault: &Vault<N>) {
        if self.persisted.is_some() {
            return;
        }
        self.recv_range = vault.offset_in_recv(&self.value).map(|start| (start, self.value.len()));
    }

    fn persist<const N: usize>(&mut self, vault: &mut Vault<N>) {
        if let Some((start, len)) = self.recv_range {
            if let Ok(r) = vault.persist_recv_range(start, len) {
                self.persisted = Some(r);
                // Drops the borrow into `recv` now that the bytes live in
                // `session` too, so `resolve`'s never-taken `None` arm below
                // can't be accused of keeping this borrow alive past a later
                // `&mut Vault` call.
                self.value = ByteView::empty();
            }
        }
    }
}

/// `name=value` values (spec.md §4.4 "Key-value"); `Cookie` and `Range` use
/// this.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValue<'a> {
    pub inner: StringValue<'a>,
}

impl<'a> KeyValue<'a> {
    /// Returns the substring after `key=` up to the next `;`, trimmed.
    ///
    /// Resolves through `inner.resolve(vault)` rather than reading
    /// `inner.value` directly, so this stays callable after a refill has
    /// persisted this slot (at which point `inner.value` has been cleared —
    /// see `StringValue::persist`).
    pub fn find_value_for<'v, const N: usize>(&'v self, vault: &'v Vault<N>, key: &[u8]) -> ByteView<'v> {
        let mut v = self.inner.resolve(vault);
        let idx = v.find(key);
        if idx == v.len() {
            return ByteView::empty();
        }
        v.split_at(idx + key.len());
        v.trim_left(b' ');
        if v.as_bytes().first() != Some(&b'=') {
            return ByteView::empty();
        }
        v.split_at(1);
        v.trim_left(b' ');
        let mut up_to_semi = v.split_up_to(b";");
        up_to_semi.trim_right(b' ');
        up_to_semi
    }
}

impl<'a> HeaderValue<'a> for KeyValue<'a> {
    fn parse_from(&mut self, val: &mut ByteView<'a>) -> ParsingError {
        self.inner.parse_from(val)
    }
}

impl<'a> WriteValue for KeyValue<'a> {
    fn write(&self, buffer: &mut [u8], size: &mut usize) -> bool {
        self.inner.write(buffer, size)
    }
}

impl<'a> Persistable for KeyValue<'a> {
    fn cache_recv_range<const N: usize>(&mut self, vault: &Vault<N>) {
        self.inner.cache_recv_range(vault);
    }

    fn persist<const N: usize>(&mut self, vault: &mut Vault<N>) {
        self.inner.persist(vault);
    }
}

/// A decimal unsigned integer, saturating on overflow (spec.md §4.4
/// "Unsigned value"). Holds no borrow, so it implements `HeaderValue<'a>`
/// for every `'a`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsignedValue {
    pub value: u64,
}

impl<'a> HeaderValue<'a> for UnsignedValue {
    fn parse_from(&mut self, val: &mut ByteView<'a>) -> ParsingError {
        let mut v = *val;
        v.trim_left(b' ');
        let (value, consumed) = v.parse_uint_saturating();
        if consumed == 0 {
            return ParsingError::InvalidRequest;
        }
        self.value = value;
        ParsingError::EndOfRequest
    }
}

impl WriteValue for UnsignedValue {
    fn write(&self, buffer: &mut [u8], size: &mut usize) -> bool {
        let mut tmp = [0u8; 20];
        let mut v = self.value;
        let mut i = tmp.len();
        if v == 0 {
            i -= 1;
            tmp[i] = b'0';
        } else {
            while v > 0 {
                i -= 1;
                tmp[i] = b'0' + (v % 10) as u8;
                v /= 10;
            }
        }
        write_bytes(buffer, size, &tmp[i..])
    }
}

/// A single-token enumeration value (spec.md §4.4 "Enum value"). `STRICT`
/// controls whether an unresolved token is `InvalidRequest` (matches the
/// source's `StrictEnumValue`) or a silently-accepted sentinel. Holds no
/// borrow, so it implements `HeaderValue<'a>` for every `'a`.
#[derive(Debug, Clone, Copy)]
pub struct EnumValue<E: TokenEnum, const STRICT: bool> {
    pub value: Option<E>,
}

impl<E: TokenEnum, const STRICT: bool> Default for EnumValue<E, STRICT> {
    fn default() -> Self {
        EnumValue { value: None }
    }
}

impl<'a, E: TokenEnum, const STRICT: bool> HeaderValue<'a> for EnumValue<E, STRICT> {
    fn parse_from(&mut self, val: &mut ByteView<'a>) -> ParsingError {
        let mut v = *val;
        v.trim(b' ');
        self.value = E::from_token_ci(v.as_bytes());
        if self.value.is_none() && STRICT {
            ParsingError::InvalidRequest
        } else {
            ParsingError::EndOfRequest
        }
    }
}

impl<E: TokenEnum, const STRICT: bool> WriteValue for EnumValue<E, STRICT> {
    fn write(&self, buffer: &mut [u8], size: &mut usize) -> bool {
        match self.value {
            Some(v) => write_bytes(buffer, size, v.token().as_bytes()),
            None => {
                *size = 0;
                true
            }
        }
    }
}

/// `StrictEnum<E>` alias used by `Connection` (spec.md §4.4 table).
pub type StrictEnumValue<E> = EnumValue<E, true>;

/// Splits `ENUM[;ATTR][,…]`, returning `(enum_token, attr_token, status)` the
/// way `EnumValueWithToken::parseFrom` does.
fn split_enum_with_token<'a>(val: &mut ByteView<'a>) -> (ByteView<'a>, ByteView<'a>, ParsingError) {
    let idx = val.find_any(b";,");
    if idx != val.len() && val.as_bytes()[idx] == b';' {
        let mut e = val.split_at(idx);
        val.split_at(1); // skip ';'
        e.trim(b' ');
        let p2 = val.find_any(b",");
        let mut attr = val.split_at(p2);
        attr.trim(b' ');
        val.trim_left(b',');
        let status = if val.is_empty() { ParsingError::EndOfRequest } else { ParsingError::MoreData };
        return (e, attr, status);
    }
    let mut e = val.split_at(idx);
    e.trim(b' ');
    val.trim_left(b',');
    let status = if val.is_empty() { ParsingError::EndOfRequest } else { ParsingError::MoreData };
    (e, ByteView::empty(), status)
}

/// `EnumWithAttribute<E>`: `ENUM[;ATTR][,…]` (spec.md §4.4). This merges the
/// source's `EnumValueToken` (attribute discarded) and `EnumKeyValue`
/// (attribute retained) into one type with both behaviors, since Rust
/// callers can simply ignore `attributes` when they don't need it.
#[derive(Debug, Clone, Copy)]
pub struct EnumWithAttribute<'a, E: TokenEnum> {
    pub value: Option<E>,
    pub attributes: ByteView<'a>,
    attrs_recv_range: Option<(usize, usize)>,
    persisted_attrs: Option<VaultRef>,
}

impl<'a, E: TokenEnum> Default for EnumWithAttribute<'a, E> {
    fn default() -> Self {
        EnumWithAttribute {
            value: None,
            attributes: ByteView::empty(),
            attrs_recv_range: None,
            persisted_attrs: None,
        }
    }
}

impl<'a, E: TokenEnum> EnumWithAttribute<'a, E> {
    /// Resolves to the persisted copy if this slot was persisted, else the
    /// live (possibly about-to-be-dropped) view. Mirrors
    /// `StringValue::resolve`.
    pub fn resolved_attributes<'v, const N: usize>(&'v self, vault: &'v Vault<N>) -> ByteView<'v>
    where
        'a: 'v,
    {
        match self.persisted_attrs {
            Some(r) => vault.resolve(r),
            None => self.attributes,
        }
    }

    /// Resolves through `resolved_attributes(vault)` so this stays callable
    /// after a refill has persisted this slot (see
    /// `Persistable::persist`'s note on clearing the borrowed field).
    pub fn find_attribute_value_for<'v, const N: usize>(&'v self, vault: &'v Vault<N>, key: &[u8]) -> ByteView<'v> {
        let mut rest = self.resolved_attributes(vault);
        let idx = rest.find(key);
        if idx == rest.len() {
            return ByteView::empty();
        }
        rest.split_at(idx + key.len());
        rest.trim_left(b' ');
        if rest.as_bytes().first() != Some(&b'=') {
            return ByteView::empty();
        }
        rest.split_at(1);
        rest.trim_left(b' ');
        let mut up_to_semi = rest.split_up_to(b";");
        up_to_semi.trim_right(b' ');
        up_to_semi
    }
}

impl<'a, E: TokenEnum> HeaderValue<'a> for EnumWithAttribute<'a, E> {
    fn parse_from(&mut self, val: &mut ByteView<'a>) -> ParsingError {
        let mut v = *val;
        let (token, attr, status) = split_enum_with_token(&mut v);
        if status == ParsingError::InvalidRequest {
            return status;
        }
        self.value = E::from_token_ci(token.as_bytes());
        self.attributes = attr;
        *val = v;
        status
    }
}

impl<'a, E: TokenEnum> WriteValue for EnumWithAttribute<'a, E> {
    fn write(&self, buffer: &mut [u8], size: &mut usize) -> bool {
        let token = match self.value {
            Some(v) => v.token(),
            None => "",
        };
        if self.attributes.is_empty() {
            write_bytes(buffer, size, token.as_bytes())
        } else {
            let needed = token.len() + 1 + self.attributes.len();
            *size = needed;
            if buffer.len() < needed {
                return false;
            }
            buffer[..token.len()].copy_from_slice(token.as_bytes());
            buffer[token.len()] = b'=';
            buffer[token.len() + 1..needed].copy_from_slice(self.attributes.as_bytes());
            true
        }
    }
}

impl<'a, E: TokenEnum> Persistable for EnumWithAttribute<'a, E> {
    fn cache_recv_range<const N: usize>(&mut self, vault: &Vault<N>) {
        if self.persisted_attrs.is_some() {
            return;
        }
        self.attrs_recv_range = vault.offset_in_recv(&self.attributes).map(|start| (start, self.attributes.len()));
    }

    fn persist<const N: usize>(&mut self, vault: &mut Vault<N>) {
        if let Some((start, len)) = self.attrs_recv_range {
            if let Ok(r) = vault.persist_recv_range(start, len) {
                self.persisted_attrs = Some(r);
                self.attributes = ByteView::empty();
            }
        }
    }
}

/// A fixed-capacity list of up to `N` elements of inner parser `T` (spec.md
/// §4.4 "List of N"). `STRICT` controls overflow policy: `true` fails with
/// `InvalidRequest` once an `(N+1)`th element is seen (per SPEC_FULL.md's
/// Open Question decision, this matches `Accept`'s `ValueList<..., 16,
/// true>`); `false` silently stops accumulating and keeps returning
/// `MoreData`/`EndOfRequest` for the remainder of the list, matching every
/// other list header in `HeaderMap.hpp`.
#[derive(Debug, Clone, Copy)]
pub struct ListValue<T, const N: usize, const STRICT: bool> {
    pub values: [T; N],
    pub count: usize,
}

impl<T: Default + Copy, const N: usize, const STRICT: bool> Default for ListValue<T, N, STRICT> {
    fn default() -> Self {
        ListValue { values: [T::default(); N], count: 0 }
    }
}

impl<T, const N: usize, const STRICT: bool> ListValue<T, N, STRICT>
where
    T: Default + Copy,
{
    pub fn parse_from<'a>(&mut self, val: &mut ByteView<'a>) -> ParsingError
    where
        T: HeaderValue<'a>,
    {
        self.count = 0;
        loop {
            if val.is_empty() {
                return ParsingError::EndOfRequest;
            }
            if self.count == N {
                return if STRICT { ParsingError::InvalidRequest } else { ParsingError::MoreData };
            }
            let mut slot = T::default();
            let status = slot.parse_from(val);
            if status == ParsingError::InvalidRequest {
                return status;
            }
            self.values[self.count] = slot;
            self.count += 1;
            if status == ParsingError::EndOfRequest {
                return ParsingError::EndOfRequest;
            }
        }
    }

    pub fn write(&self, buffer: &mut [u8], size: &mut usize) -> bool
    where
        T: WriteValue,
    {
        if self.count == 0 {
            *size = 0;
            return true;
        }
        let mut total = 0usize;
        for i in 0..self.count {
            let mut s = 0usize;
            self.values[i].write(&mut [], &mut s);
            total += s + 1;
        }
        total -= 1;
        *size = total;
        if buffer.len() < total {
            return false;
        }
        let mut off = 0usize;
        for i in 0..self.count {
            let mut s = buffer.len() - off;
            if !self.values[i].write(&mut buffer[off..], &mut s) {
                return false;
            }
            off += s;
            if i + 1 < self.count {
                buffer[off] = b',';
                off += 1;
            }
        }
        true
    }
}

impl<T, const N: usize, const STRICT: bool> WriteValue for ListValue<T, N, STRICT>
where
    T: Default + Copy + WriteValue,
{
    fn write(&self, buffer: &mut [u8], size: &mut usize) -> bool {
        ListValue::write(self, buffer, size)
    }
}

impl<'a, T, const N: usize, const STRICT: bool> HeaderValue<'a> for ListValue<T, N, STRICT>
where
    T: Default + Copy + HeaderValue<'a>,
{
    fn parse_from(&mut self, val: &mut ByteView<'a>) -> ParsingError {
        ListValue::parse_from(self, val)
    }
}

impl<T, const N: usize, const STRICT: bool> Persistable for ListValue<T, N, STRICT>
where
    T: Persistable,
{
    fn cache_recv_range<const M: usize>(&mut self, vault: &Vault<M>) {
        for i in 0..self.count {
            self.values[i].cache_recv_range(vault);
        }
    }

    fn persist<const M: usize>(&mut self, vault: &mut Vault<M>) {
        for i in 0..self.count {
            self.values[i].persist(vault);
        }
    }
}
