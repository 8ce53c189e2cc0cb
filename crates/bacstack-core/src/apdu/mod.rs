//! APDU headers.
//!
//! The first octet of every APDU carries the PDU type in bits 7..4 and
//! per-type flags in bits 3..0. Decoders here validate the minimum
//! length of their variant and leave the reader at the service
//! parameters; encoders zero every flag bit the caller has not
//! legitimately set.

pub mod reply;
pub mod request;

pub use reply::{AbortPdu, ComplexAckHeader, ErrorPdu, RejectPdu, SegmentAck, SimpleAck};
pub use request::{ConfirmedRequestHeader, UnconfirmedRequestHeader};

use crate::DecodeError;

/// The eight PDU types, from bits 7..4 of the first APDU octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApduType {
    ConfirmedRequest = 0,
    UnconfirmedRequest = 1,
    SimpleAck = 2,
    ComplexAck = 3,
    SegmentAck = 4,
    Error = 5,
    Reject = 6,
    Abort = 7,
}

impl ApduType {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ConfirmedRequest),
            1 => Some(Self::UnconfirmedRequest),
            2 => Some(Self::SimpleAck),
            3 => Some(Self::ComplexAck),
            4 => Some(Self::SegmentAck),
            5 => Some(Self::Error),
            6 => Some(Self::Reject),
            7 => Some(Self::Abort),
            _ => None,
        }
    }

    /// Classifies an APDU from its first octet.
    pub fn of(apdu: &[u8]) -> Result<Self, DecodeError> {
        let first = apdu.first().ok_or(DecodeError::UnexpectedEof)?;
        Self::from_u8(first >> 4).ok_or(DecodeError::InvalidValue)
    }
}
