use crate::encoding::{
    primitives::{encode_ctx_object_id, encode_ctx_unsigned},
    reader::Reader,
    tag::Tag,
    writer::Writer,
};
use crate::services::read_property::{decode_addressing, decode_ctx_unsigned_tag};
use crate::services::value_codec::{decode_value_sequence, encode_application_value};
use crate::types::{DataValue, ObjectId, PropertyId};
use crate::{DecodeError, EncodeError};
use alloc::vec;
use alloc::vec::Vec;

pub const SERVICE_WRITE_PROPERTY: u8 = 0x0F;

/// WriteProperty parameters: `[0]` object id, `[1]` property id,
/// optional `[2]` array index, the value(s) between opening/closing 3,
/// optional `[4]` priority 1..=16.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest<'a> {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub values: Vec<DataValue<'a>>,
    pub priority: Option<u8>,
}

impl<'a> WritePropertyRequest<'a> {
    /// A whole-property write of a single value.
    pub fn scalar(object_id: ObjectId, property_id: PropertyId, value: DataValue<'a>) -> Self {
        Self {
            object_id,
            property_id,
            array_index: None,
            values: vec![value],
            priority: None,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(index) = self.array_index {
            encode_ctx_unsigned(w, 2, index)?;
        }
        Tag::Opening { tag_num: 3 }.encode(w)?;
        for value in &self.values {
            encode_application_value(w, value)?;
        }
        Tag::Closing { tag_num: 3 }.encode(w)?;
        if let Some(priority) = self.priority {
            encode_ctx_unsigned(w, 4, u32::from(priority))?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let (object_id, property_id) = decode_addressing(r)?;

        let (array_index, opening) = match Tag::decode(r)? {
            Tag::Context { tag_num: 2, len } => {
                (Some(r.read_unsigned_be(len as usize)?), Tag::decode(r)?)
            }
            other => (None, other),
        };
        if opening != (Tag::Opening { tag_num: 3 }) {
            return Err(DecodeError::InvalidTag);
        }
        let values = decode_value_sequence(r, 3)?;

        let priority = if r.is_empty() {
            None
        } else {
            let raw = decode_ctx_unsigned_tag(r, 4)?;
            if !(1..=16).contains(&raw) {
                return Err(DecodeError::InvalidValue);
            }
            Some(raw as u8)
        };

        Ok(Self {
            object_id,
            property_id,
            array_index,
            values,
            priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::WritePropertyRequest;
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{DataValue, ObjectId, ObjectType, PropertyId};
    use crate::DecodeError;

    #[test]
    fn prioritized_write_matches_fixture() {
        let req = WritePropertyRequest {
            priority: Some(8),
            ..WritePropertyRequest::scalar(
                ObjectId::new(ObjectType::AnalogOutput, 1),
                PropertyId::PresentValue,
                DataValue::Real(74.0),
            )
        };
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();
        assert_eq!(
            w.as_written(),
            &[
                0x0C, 0x00, 0x40, 0x00, 0x01, 0x19, 0x55, 0x3E, 0x44, 0x42, 0x94, 0x00, 0x00,
                0x3F, 0x49, 0x08,
            ]
        );

        let decoded = WritePropertyRequest::decode(&mut Reader::new(w.as_written())).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn indexed_write_roundtrip() {
        let req = WritePropertyRequest {
            array_index: Some(3),
            ..WritePropertyRequest::scalar(
                ObjectId::new(ObjectType::AnalogOutput, 2),
                PropertyId::PriorityArray,
                DataValue::Null,
            )
        };
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();
        let decoded = WritePropertyRequest::decode(&mut Reader::new(w.as_written())).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn priority_outside_one_to_sixteen_is_invalid() {
        // [4] priority = 17 after a null value.
        let raw = [
            0x0C, 0x00, 0x40, 0x00, 0x01, 0x19, 0x55, 0x3E, 0x00, 0x3F, 0x49, 0x11,
        ];
        assert_eq!(
            WritePropertyRequest::decode(&mut Reader::new(&raw)).unwrap_err(),
            DecodeError::InvalidValue
        );
    }
}
