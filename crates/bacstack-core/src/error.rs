use core::fmt;

/// Errors produced while encoding a frame or value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The output buffer cannot hold the encoding.
    BufferTooSmall,
    /// The value cannot be represented on the wire (e.g. a length that
    /// does not fit in 32 bits, more than 7 unused bit-string bits).
    ValueOutOfRange,
    /// A declared length is inconsistent with the data.
    InvalidLength,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => f.write_str("buffer too small"),
            Self::ValueOutOfRange => f.write_str("value out of range"),
            Self::InvalidLength => f.write_str("invalid length"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Errors produced while decoding a frame or value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended before the encoding was complete.
    UnexpectedEof,
    /// A tag octet is malformed, carries a reserved application tag
    /// number, or a closing tag appears without its opening partner.
    InvalidTag,
    /// A length field is out of bounds for the value it describes.
    InvalidLength,
    /// A field value is outside its defined range.
    InvalidValue,
    /// The link-control type octet is not BACnet/IP (`0x81`).
    WrongLinkType,
    /// The NPDU protocol version is not 1.
    VersionMismatch,
    /// A character string uses a charset this stack does not decode
    /// (DBCS, JIS, UCS-2, UCS-4).
    UnsupportedCharset,
    /// A bit pattern the standard reserves is present (application-class
    /// tag with an open/close length code, reserved NPDU control bits).
    ReservedBits,
    /// The construct is recognised but not supported.
    Unsupported,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => f.write_str("unexpected end of input"),
            Self::InvalidTag => f.write_str("malformed tag"),
            Self::InvalidLength => f.write_str("invalid length"),
            Self::InvalidValue => f.write_str("invalid value"),
            Self::WrongLinkType => f.write_str("not a BACnet/IP frame"),
            Self::VersionMismatch => f.write_str("unsupported NPDU version"),
            Self::UnsupportedCharset => f.write_str("unsupported character set"),
            Self::ReservedBits => f.write_str("reserved bit pattern"),
            Self::Unsupported => f.write_str("construct unsupported"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}
