use crate::encoding::{
    primitives::{encode_ctx_object_id, encode_ctx_unsigned},
    reader::Reader,
    tag::Tag,
    writer::Writer,
};
use crate::services::value_codec::{decode_value_sequence, encode_application_value};
use crate::types::{DataValue, ObjectId, PropertyId};
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

pub const SERVICE_READ_PROPERTY: u8 = 0x0C;

/// ReadProperty parameters: `[0]` object id, `[1]` property id,
/// optional `[2]` array index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
}

impl ReadPropertyRequest {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(index) = self.array_index {
            encode_ctx_unsigned(w, 2, index)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let (object_id, property_id) = decode_addressing(r)?;
        let array_index = if r.is_empty() {
            None
        } else {
            Some(decode_ctx_unsigned_tag(r, 2)?)
        };
        Ok(Self {
            object_id,
            property_id,
            array_index,
        })
    }
}

/// ReadProperty acknowledgement: the request addressing echoed back,
/// then the value(s) between opening/closing tag 3. Array reads produce
/// one value per element.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyAck<'a> {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub values: Vec<DataValue<'a>>,
}

impl<'a> ReadPropertyAck<'a> {
    /// The single result value, when the property is scalar.
    pub fn value(&self) -> Option<&DataValue<'a>> {
        match self.values.as_slice() {
            [single] => Some(single),
            _ => None,
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
        Tag::Closing { tag_num: 3 }.encode(w)
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
        Ok(Self {
            object_id,
            property_id,
            array_index,
            values,
        })
    }
}

pub(crate) fn decode_addressing(
    r: &mut Reader<'_>,
) -> Result<(ObjectId, PropertyId), DecodeError> {
    let object_id = match Tag::decode(r)? {
        Tag::Context { tag_num: 0, len: 4 } => ObjectId::from_raw(r.read_be_u32()?),
        _ => return Err(DecodeError::InvalidTag),
    };
    let property_id = PropertyId::from_u32(decode_ctx_unsigned_tag(r, 1)?);
    Ok((object_id, property_id))
}

pub(crate) fn decode_ctx_unsigned_tag(r: &mut Reader<'_>, tag_num: u8) -> Result<u32, DecodeError> {
    let len = Tag::expect_context(r, tag_num)?;
    r.read_unsigned_be(len as usize)
}

#[cfg(test)]
mod tests {
    use super::{ReadPropertyAck, ReadPropertyRequest};
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{DataValue, ObjectId, ObjectType, PropertyId};
    use alloc::vec;

    #[test]
    fn request_parameters_match_fixture() {
        let req = ReadPropertyRequest {
            object_id: ObjectId::new(ObjectType::AnalogInput, 1),
            property_id: PropertyId::PresentValue,
            array_index: None,
        };
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();
        assert_eq!(
            w.as_written(),
            &[0x0C, 0x00, 0x00, 0x00, 0x01, 0x19, 0x55]
        );
        assert_eq!(
            ReadPropertyRequest::decode(&mut Reader::new(w.as_written())).unwrap(),
            req
        );
    }

    #[test]
    fn ack_parameters_match_fixture() {
        let raw = [
            0x0C, 0x00, 0x00, 0x00, 0x01, 0x19, 0x55, 0x3E, 0x44, 0x42, 0x91, 0x00, 0x00, 0x3F,
        ];
        let ack = ReadPropertyAck::decode(&mut Reader::new(&raw)).unwrap();
        assert_eq!(ack.property_id, PropertyId::PresentValue);
        assert_eq!(ack.value(), Some(&DataValue::Real(72.5)));

        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        ack.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &raw);
    }

    #[test]
    fn array_reads_carry_index_and_element_sequence() {
        let ack = ReadPropertyAck {
            object_id: ObjectId::new(ObjectType::Device, 9),
            property_id: PropertyId::ObjectList,
            array_index: None,
            values: vec![
                DataValue::ObjectId(ObjectId::new(ObjectType::Device, 9)),
                DataValue::ObjectId(ObjectId::new(ObjectType::AnalogInput, 1)),
            ],
        };
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        ack.encode(&mut w).unwrap();
        let decoded = ReadPropertyAck::decode(&mut Reader::new(w.as_written())).unwrap();
        assert_eq!(decoded, ack);

        let indexed = ReadPropertyRequest {
            object_id: ObjectId::new(ObjectType::Device, 9),
            property_id: PropertyId::ObjectList,
            array_index: Some(0),
        };
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        indexed.encode(&mut w).unwrap();
        let decoded = ReadPropertyRequest::decode(&mut Reader::new(w.as_written())).unwrap();
        assert_eq!(decoded.array_index, Some(0));
    }
}
