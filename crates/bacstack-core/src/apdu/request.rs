use crate::apdu::ApduType;
use crate::encoding::{reader::Reader, writer::Writer};
use crate::types::MaxApdu;
use crate::{DecodeError, EncodeError};

/// Header of a Confirmed-Request APDU.
///
/// Segmentation flags are decoded and carried so callers can detect and
/// refuse segmented traffic; this stack never sets them on encode paths
/// of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedRequestHeader {
    pub segmented: bool,
    pub more_follows: bool,
    pub segmented_response_accepted: bool,
    pub max_segments: u8,
    pub max_apdu: u8,
    pub invoke_id: u8,
    pub sequence_number: Option<u8>,
    pub proposed_window_size: Option<u8>,
    pub service_choice: u8,
}

impl ConfirmedRequestHeader {
    /// An unsegmented request header with this stack's fixed capability
    /// advertisement.
    pub fn unsegmented(invoke_id: u8, service_choice: u8, max_apdu: MaxApdu) -> Self {
        Self {
            segmented: false,
            more_follows: false,
            segmented_response_accepted: false,
            max_segments: 0,
            max_apdu: max_apdu.code(),
            invoke_id,
            sequence_number: None,
            proposed_window_size: None,
            service_choice,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut first = (ApduType::ConfirmedRequest as u8) << 4;
        if self.segmented {
            first |= 0b1000;
        }
        if self.more_follows {
            first |= 0b0100;
        }
        if self.segmented_response_accepted {
            first |= 0b0010;
        }
        w.write_u8(first)?;
        w.write_u8((self.max_segments << 4) | (self.max_apdu & 0x0F))?;
        w.write_u8(self.invoke_id)?;
        if self.segmented {
            w.write_u8(self.sequence_number.unwrap_or(0))?;
            w.write_u8(self.proposed_window_size.unwrap_or(1))?;
        }
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        if first >> 4 != ApduType::ConfirmedRequest as u8 {
            return Err(DecodeError::InvalidValue);
        }
        let segmented = first & 0b1000 != 0;
        let seg_apdu = r.read_u8()?;
        let invoke_id = r.read_u8()?;
        let (sequence_number, proposed_window_size) = if segmented {
            (Some(r.read_u8()?), Some(r.read_u8()?))
        } else {
            (None, None)
        };
        Ok(Self {
            segmented,
            more_follows: first & 0b0100 != 0,
            segmented_response_accepted: first & 0b0010 != 0,
            max_segments: seg_apdu >> 4,
            max_apdu: seg_apdu & 0x0F,
            invoke_id,
            sequence_number,
            proposed_window_size,
            service_choice: r.read_u8()?,
        })
    }
}

/// Header of an Unconfirmed-Request APDU: the type octet and the
/// service choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnconfirmedRequestHeader {
    pub service_choice: u8,
}

impl UnconfirmedRequestHeader {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8((ApduType::UnconfirmedRequest as u8) << 4)?;
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        if first >> 4 != ApduType::UnconfirmedRequest as u8 {
            return Err(DecodeError::InvalidValue);
        }
        Ok(Self {
            service_choice: r.read_u8()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfirmedRequestHeader, UnconfirmedRequestHeader};
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::MaxApdu;
    use crate::DecodeError;

    #[test]
    fn confirmed_header_roundtrip() {
        let header = ConfirmedRequestHeader::unsegmented(42, 0x0C, MaxApdu::Octets1476);
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        header.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x00, 0x05, 42, 0x0C]);

        let mut r = Reader::new(w.as_written());
        assert_eq!(ConfirmedRequestHeader::decode(&mut r).unwrap(), header);
    }

    #[test]
    fn segmented_header_carries_sequence_and_window() {
        let raw = [0x08, 0x75, 7, 2, 4, 0x0C];
        let mut r = Reader::new(&raw);
        let header = ConfirmedRequestHeader::decode(&mut r).unwrap();
        assert!(header.segmented);
        assert_eq!(header.sequence_number, Some(2));
        assert_eq!(header.proposed_window_size, Some(4));
        assert_eq!(header.max_segments, 7);
        assert_eq!(header.max_apdu, 5);
    }

    #[test]
    fn truncated_confirmed_header_is_eof() {
        let mut r = Reader::new(&[0x00, 0x05, 42]);
        assert_eq!(
            ConfirmedRequestHeader::decode(&mut r).unwrap_err(),
            DecodeError::UnexpectedEof
        );
    }

    #[test]
    fn unconfirmed_header_roundtrip() {
        let mut buf = [0u8; 4];
        let mut w = Writer::new(&mut buf);
        UnconfirmedRequestHeader { service_choice: 8 }
            .encode(&mut w)
            .unwrap();
        assert_eq!(w.as_written(), &[0x10, 0x08]);
    }
}
