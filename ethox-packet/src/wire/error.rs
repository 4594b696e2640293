use core::fmt;

/// The error type for packet decoding and construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// A packet could not be parsed because it was shorter than assumed.
    ///
    /// The buffer may be shorter than the minimum header length of a layer, or a length field of
    /// a variable length header points beyond the received data.
    Truncated,

    /// A view or field offset lies outside the bytes it was derived from.
    ///
    /// Contrary to `Truncated` this is not a property of the received data but of the requested
    /// access, for example sub-slicing a view beyond its end.
    OutOfBounds,

    /// The protocol identifier is known and should be dissected but no dissector is available.
    ///
    /// Most unknown identifiers silently degrade to opaque payload bytes. A small set of
    /// identifiers is required to fail loudly instead, such as a loopback address family or an IP
    /// version nibble that is not one of the supported ones.
    NotImplemented,

    /// A packet could not be recognized.
    ///
    /// E.g. an IP packet with an unknown version. This may be due to an outdated implementation of
    /// the standard or registry which defines identifiers in packets.
    Unrecognized,

    /// A packet was recognized but was self-contradictory.
    ///
    /// Examples: an IPv4 header claiming a header length shorter than 20 bytes, a TCP header whose
    /// data offset is shorter than its fixed fields.
    Malformed,

    /// The requested operation depends on a feature this layer does not offer.
    ///
    /// For example attaching a payload to a layer that has no way to identify the payload's
    /// protocol in its header.
    Unsupported,
}

/// The result type for packet decoding and construction.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated      => write!(f, "truncated packet"),
            Error::OutOfBounds    => write!(f, "access out of bounds"),
            Error::NotImplemented => write!(f, "protocol not implemented"),
            Error::Unrecognized   => write!(f, "unrecognized packet"),
            Error::Malformed      => write!(f, "malformed packet"),
            Error::Unsupported    => write!(f, "unsupported operation"),
        }
    }
}

impl std::error::Error for Error {}
