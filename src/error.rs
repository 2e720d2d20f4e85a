use core::fmt;
use core::num::ParseIntError;

/// Everything that can go wrong in the request/response pipeline.
///
/// Variants are grouped roughly in the priority order of spec.md §7: parse
/// failures first, then resource exhaustion, then transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The request line, a header line, or a header value did not match the
    /// expected grammar.
    InvalidRequest,
    /// `HTTP/1.0` or `HTTP/1.1` was not found where the request line or
    /// status line required it.
    UnsupportedVersion,
    /// No route in the table accepted the request.
    NoMatchingRoute,
    /// A header slot's `parse_from` returned `InvalidRequest`.
    InvalidHeaderValue,
    /// The transient vault has no room left for the operation requested
    /// (append, persist, or header-set construction).
    VaultOverflow,
    /// The output buffer did not have enough space to hold what was about
    /// to be written. Call sites should flush and retry.
    OutputOverflow,
    /// A route callback returned `false` without having sent a reply.
    CallbackDidNotReply,
    /// The underlying socket reported a read or write failure.
    SocketError,
    /// A client's receive went idle past the server loop's configured
    /// window with no progress made.
    Timeout,
    /// A response (client core) used a body-length/write byte count that
    /// did not match its own `Content-Length`.
    BodyLengthMismatch,
    /// Parsing the response status line failed, or its code was outside
    /// 100-599.
    InvalidResponse,
    /// A `https://` URL was passed to the client core, which has no TLS
    /// integration (spec.md TLS-client knob defaults to 0).
    TlsNotSupported,
    /// Failed to parse a decimal integer (e.g. a bogus `Content-Length`).
    ParseIntError,
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<ParseIntError> for Error {
    fn from(_: ParseIntError) -> Self {
        Error::ParseIntError
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        let s = match self {
            InvalidRequest => "malformed request",
            UnsupportedVersion => "unsupported HTTP version",
            NoMatchingRoute => "no route matched the request",
            InvalidHeaderValue => "invalid header value",
            VaultOverflow => "transient vault has no free space",
            OutputOverflow => "output buffer overflow",
            CallbackDidNotReply => "route callback returned without replying",
            SocketError => "socket read or write failed",
            Timeout => "client went idle with no progress",
            BodyLengthMismatch => "body length did not match Content-Length",
            InvalidResponse => "malformed or out-of-range response status line",
            TlsNotSupported => "TLS is not built into this core",
            ParseIntError => "failed to parse integer",
        };
        write!(f, "{}", s)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
