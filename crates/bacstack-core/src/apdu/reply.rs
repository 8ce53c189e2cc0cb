use crate::apdu::ApduType;
use crate::encoding::{
    primitives::encode_app_enumerated,
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::{AbortReason, ErrorClass, ErrorCode, RejectReason};
use crate::{DecodeError, EncodeError};

/// Simple-Ack APDU: positive confirmation with no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleAck {
    pub invoke_id: u8,
    pub service_choice: u8,
}

impl SimpleAck {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8((ApduType::SimpleAck as u8) << 4)?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        expect_type(r, ApduType::SimpleAck)?;
        Ok(Self {
            invoke_id: r.read_u8()?,
            service_choice: r.read_u8()?,
        })
    }
}

/// Header of a Complex-Ack APDU; the service result follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexAckHeader {
    pub segmented: bool,
    pub more_follows: bool,
    pub invoke_id: u8,
    pub sequence_number: Option<u8>,
    pub proposed_window_size: Option<u8>,
    pub service_choice: u8,
}

impl ComplexAckHeader {
    /// An unsegmented acknowledgement header.
    pub const fn unsegmented(invoke_id: u8, service_choice: u8) -> Self {
        Self {
            segmented: false,
            more_follows: false,
            invoke_id,
            sequence_number: None,
            proposed_window_size: None,
            service_choice,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut first = (ApduType::ComplexAck as u8) << 4;
        if self.segmented {
            first |= 0b1000;
        }
        if self.more_follows {
            first |= 0b0100;
        }
        w.write_u8(first)?;
        w.write_u8(self.invoke_id)?;
        if self.segmented {
            w.write_u8(self.sequence_number.unwrap_or(0))?;
            w.write_u8(self.proposed_window_size.unwrap_or(1))?;
        }
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        if first >> 4 != ApduType::ComplexAck as u8 {
            return Err(DecodeError::InvalidValue);
        }
        let segmented = first & 0b1000 != 0;
        let invoke_id = r.read_u8()?;
        let (sequence_number, proposed_window_size) = if segmented {
            (Some(r.read_u8()?), Some(r.read_u8()?))
        } else {
            (None, None)
        };
        Ok(Self {
            segmented,
            more_follows: first & 0b0100 != 0,
            invoke_id,
            sequence_number,
            proposed_window_size,
            service_choice: r.read_u8()?,
        })
    }
}

/// Error APDU: the failed service choice plus an error class and code.
///
/// Decoding tolerates the three encodings seen in the field — bare
/// application enumerations, context tags 0/1, and the pair wrapped in
/// an opening/closing 0 — and the class/code stay optional because some
/// stacks truncate them. Encoding always writes the standard bare
/// application enumerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPdu {
    pub invoke_id: u8,
    pub service_choice: u8,
    pub error_class: Option<u32>,
    pub error_code: Option<u32>,
}

impl ErrorPdu {
    pub const fn new(
        invoke_id: u8,
        service_choice: u8,
        class: ErrorClass,
        code: ErrorCode,
    ) -> Self {
        Self {
            invoke_id,
            service_choice,
            error_class: Some(class.to_u32()),
            error_code: Some(code.to_u32()),
        }
    }

    pub const fn class(&self) -> Option<ErrorClass> {
        match self.error_class {
            Some(raw) => ErrorClass::from_u32(raw),
            None => None,
        }
    }

    pub const fn code(&self) -> Option<ErrorCode> {
        match self.error_code {
            Some(raw) => ErrorCode::from_u32(raw),
            None => None,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8((ApduType::Error as u8) << 4)?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.service_choice)?;
        if let (Some(class), Some(code)) = (self.error_class, self.error_code) {
            encode_app_enumerated(w, class)?;
            encode_app_enumerated(w, code)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        expect_type(r, ApduType::Error)?;
        let invoke_id = r.read_u8()?;
        let service_choice = r.read_u8()?;

        let (error_class, error_code) = if r.is_empty() {
            (None, None)
        } else {
            match Tag::decode(r)? {
                Tag::Opening { tag_num: 0 } => {
                    let class_tag = Tag::decode(r)?;
                    let class = decode_error_value(r, class_tag, 0)?;
                    let code_tag = Tag::decode(r)?;
                    let code = decode_error_value(r, code_tag, 1)?;
                    Tag::expect_closing(r, 0)?;
                    (Some(class), Some(code))
                }
                first => {
                    let class = decode_error_value(r, first, 0)?;
                    let code_tag = Tag::decode(r)?;
                    let code = decode_error_value(r, code_tag, 1)?;
                    (Some(class), Some(code))
                }
            }
        };

        Ok(Self {
            invoke_id,
            service_choice,
            error_class,
            error_code,
        })
    }
}

fn decode_error_value(r: &mut Reader<'_>, tag: Tag, ctx_num: u8) -> Result<u32, DecodeError> {
    match tag {
        Tag::Context { tag_num, len } if tag_num == ctx_num => r.read_unsigned_be(len as usize),
        Tag::Application {
            tag: AppTag::Enumerated,
            len,
        } => r.read_unsigned_be(len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

/// Reject APDU: one reason byte, no service choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectPdu {
    pub invoke_id: u8,
    pub reason: u8,
}

impl RejectPdu {
    pub const fn new(invoke_id: u8, reason: RejectReason) -> Self {
        Self {
            invoke_id,
            reason: reason as u8,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8((ApduType::Reject as u8) << 4)?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.reason)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        expect_type(r, ApduType::Reject)?;
        Ok(Self {
            invoke_id: r.read_u8()?,
            reason: r.read_u8()?,
        })
    }
}

/// Abort APDU: reason byte plus the server/client flag in bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortPdu {
    pub server: bool,
    pub invoke_id: u8,
    pub reason: u8,
}

impl AbortPdu {
    pub const fn from_server(invoke_id: u8, reason: AbortReason) -> Self {
        Self {
            server: true,
            invoke_id,
            reason: reason as u8,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(((ApduType::Abort as u8) << 4) | u8::from(self.server))?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.reason)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        if first >> 4 != ApduType::Abort as u8 {
            return Err(DecodeError::InvalidValue);
        }
        Ok(Self {
            server: first & 0x01 != 0,
            invoke_id: r.read_u8()?,
            reason: r.read_u8()?,
        })
    }
}

/// Segment-Ack APDU. Decoded so segmented peers can be recognised and
/// refused; this stack does not transfer segments itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentAck {
    pub negative_ack: bool,
    pub from_server: bool,
    pub invoke_id: u8,
    pub sequence_number: u8,
    pub actual_window_size: u8,
}

impl SegmentAck {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut first = (ApduType::SegmentAck as u8) << 4;
        if self.negative_ack {
            first |= 0b0010;
        }
        if self.from_server {
            first |= 0b0001;
        }
        w.write_u8(first)?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.sequence_number)?;
        w.write_u8(self.actual_window_size)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        if first >> 4 != ApduType::SegmentAck as u8 {
            return Err(DecodeError::InvalidValue);
        }
        Ok(Self {
            negative_ack: first & 0b0010 != 0,
            from_server: first & 0b0001 != 0,
            invoke_id: r.read_u8()?,
            sequence_number: r.read_u8()?,
            actual_window_size: r.read_u8()?,
        })
    }
}

fn expect_type(r: &mut Reader<'_>, expected: ApduType) -> Result<(), DecodeError> {
    let first = r.read_u8()?;
    if first >> 4 != expected as u8 {
        return Err(DecodeError::InvalidValue);
    }
    // Flag bits of this variant must be zero.
    if first & 0x0F != 0 {
        return Err(DecodeError::InvalidValue);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AbortPdu, ComplexAckHeader, ErrorPdu, RejectPdu, SegmentAck, SimpleAck};
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{AbortReason, ErrorClass, ErrorCode, RejectReason};

    #[test]
    fn simple_ack_roundtrip() {
        let ack = SimpleAck {
            invoke_id: 3,
            service_choice: 0x0F,
        };
        let mut buf = [0u8; 4];
        let mut w = Writer::new(&mut buf);
        ack.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x20, 3, 0x0F]);
        assert_eq!(
            SimpleAck::decode(&mut Reader::new(w.as_written())).unwrap(),
            ack
        );
    }

    #[test]
    fn error_pdu_encodes_bare_enumerations() {
        let err = ErrorPdu::new(9, 0x0F, ErrorClass::Property, ErrorCode::ValueOutOfRange);
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        err.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x50, 9, 0x0F, 0x91, 0x02, 0x91, 0x25]);

        let decoded = ErrorPdu::decode(&mut Reader::new(w.as_written())).unwrap();
        assert_eq!(decoded.class(), Some(ErrorClass::Property));
        assert_eq!(decoded.code(), Some(ErrorCode::ValueOutOfRange));
    }

    #[test]
    fn error_pdu_decodes_context_tagged_details() {
        let raw = [0x50, 1, 0x0C, 0x09, 0x01, 0x19, 0x1F];
        let decoded = ErrorPdu::decode(&mut Reader::new(&raw)).unwrap();
        assert_eq!(decoded.class(), Some(ErrorClass::Object));
        assert_eq!(decoded.code(), Some(ErrorCode::UnknownObject));
    }

    #[test]
    fn error_pdu_decodes_wrapped_details() {
        let raw = [0x50, 1, 0x0C, 0x0E, 0x91, 0x02, 0x91, 0x20, 0x0F];
        let decoded = ErrorPdu::decode(&mut Reader::new(&raw)).unwrap();
        assert_eq!(decoded.code(), Some(ErrorCode::UnknownProperty));
    }

    #[test]
    fn error_pdu_without_details_decodes() {
        let raw = [0x50, 1, 0x0C];
        let decoded = ErrorPdu::decode(&mut Reader::new(&raw)).unwrap();
        assert_eq!(decoded.error_class, None);
        assert_eq!(decoded.error_code, None);
    }

    #[test]
    fn reject_and_abort_are_three_bytes() {
        let mut buf = [0u8; 4];
        let mut w = Writer::new(&mut buf);
        RejectPdu::new(5, RejectReason::UnrecognizedService)
            .encode(&mut w)
            .unwrap();
        assert_eq!(w.as_written(), &[0x60, 5, 9]);

        let mut buf = [0u8; 4];
        let mut w = Writer::new(&mut buf);
        AbortPdu::from_server(5, AbortReason::SegmentationNotSupported)
            .encode(&mut w)
            .unwrap();
        assert_eq!(w.as_written(), &[0x71, 5, 4]);
    }

    #[test]
    fn segment_ack_roundtrip() {
        let ack = SegmentAck {
            negative_ack: true,
            from_server: false,
            invoke_id: 8,
            sequence_number: 2,
            actual_window_size: 1,
        };
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        ack.encode(&mut w).unwrap();
        assert_eq!(
            SegmentAck::decode(&mut Reader::new(w.as_written())).unwrap(),
            ack
        );
    }

    #[test]
    fn complex_ack_header_roundtrip() {
        let header = ComplexAckHeader::unsegmented(11, 0x0C);
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        header.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x30, 11, 0x0C]);
        assert_eq!(
            ComplexAckHeader::decode(&mut Reader::new(w.as_written())).unwrap(),
            header
        );
    }
}
