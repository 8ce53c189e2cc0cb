//! Codec between [`DataValue`] and the tagged wire form.

use crate::encoding::{
    primitives::{
        decode_character_string, decode_signed, encode_app_bit_string, encode_app_boolean,
        encode_app_character_string, encode_app_date, encode_app_double, encode_app_enumerated,
        encode_app_null, encode_app_object_id, encode_app_octet_string, encode_app_real,
        encode_app_signed, encode_app_time, encode_app_unsigned,
    },
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::{BitString, DataValue, Date, ObjectId, Time};
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

pub fn encode_application_value(
    w: &mut Writer<'_>,
    value: &DataValue<'_>,
) -> Result<(), EncodeError> {
    match value {
        DataValue::Null => encode_app_null(w),
        DataValue::Boolean(v) => encode_app_boolean(w, *v),
        DataValue::Unsigned(v) => encode_app_unsigned(w, *v),
        DataValue::Signed(v) => encode_app_signed(w, *v),
        DataValue::Real(v) => encode_app_real(w, *v),
        DataValue::Double(v) => encode_app_double(w, *v),
        DataValue::OctetString(v) => encode_app_octet_string(w, v),
        DataValue::CharacterString(v) => encode_app_character_string(w, v),
        DataValue::BitString(v) => encode_app_bit_string(w, *v),
        DataValue::Enumerated(v) => encode_app_enumerated(w, *v),
        DataValue::Date(v) => encode_app_date(w, *v),
        DataValue::Time(v) => encode_app_time(w, *v),
        DataValue::ObjectId(v) => encode_app_object_id(w, *v),
        DataValue::Constructed { tag_num, values } => {
            Tag::Opening { tag_num: *tag_num }.encode(w)?;
            for child in values {
                encode_application_value(w, child)?;
            }
            Tag::Closing { tag_num: *tag_num }.encode(w)
        }
    }
}

pub fn decode_application_value<'a>(r: &mut Reader<'a>) -> Result<DataValue<'a>, DecodeError> {
    let tag = Tag::decode(r)?;
    decode_application_value_after_tag(r, tag)
}

pub fn decode_application_value_after_tag<'a>(
    r: &mut Reader<'a>,
    tag: Tag,
) -> Result<DataValue<'a>, DecodeError> {
    let (app, len) = match tag {
        Tag::Application { tag, len } => (tag, len as usize),
        Tag::Opening { tag_num } => {
            let mut values = Vec::new();
            loop {
                let child = Tag::decode(r)?;
                if child == (Tag::Closing { tag_num }) {
                    return Ok(DataValue::Constructed { tag_num, values });
                }
                values.push(decode_application_value_after_tag(r, child)?);
            }
        }
        // A closing tag here has no opening partner; context tags need
        // schema knowledge this codec does not have.
        _ => return Err(DecodeError::InvalidTag),
    };

    match app {
        AppTag::Null => {
            if len != 0 {
                return Err(DecodeError::InvalidLength);
            }
            Ok(DataValue::Null)
        }
        AppTag::Boolean => match len {
            0 => Ok(DataValue::Boolean(false)),
            1 => Ok(DataValue::Boolean(true)),
            _ => Err(DecodeError::InvalidLength),
        },
        AppTag::UnsignedInt => Ok(DataValue::Unsigned(r.read_unsigned_be(len)?)),
        AppTag::SignedInt => Ok(DataValue::Signed(decode_signed(r, len)?)),
        AppTag::Real => match len {
            4 => Ok(DataValue::Real(f32::from_be_bytes(r.read_fixed()?))),
            _ => Err(DecodeError::InvalidLength),
        },
        AppTag::Double => match len {
            8 => Ok(DataValue::Double(f64::from_be_bytes(r.read_fixed()?))),
            _ => Err(DecodeError::InvalidLength),
        },
        AppTag::OctetString => Ok(DataValue::OctetString(r.read_exact(len)?)),
        AppTag::CharacterString => Ok(DataValue::CharacterString(decode_character_string(
            r.read_exact(len)?,
        )?)),
        AppTag::BitString => Ok(DataValue::BitString(BitString::from_payload(
            r.read_exact(len)?,
        )?)),
        AppTag::Enumerated => Ok(DataValue::Enumerated(r.read_unsigned_be(len)?)),
        AppTag::Date => match len {
            4 => Ok(DataValue::Date(Date::from_octets(r.read_fixed()?))),
            _ => Err(DecodeError::InvalidLength),
        },
        AppTag::Time => match len {
            4 => Ok(DataValue::Time(Time::from_octets(r.read_fixed()?))),
            _ => Err(DecodeError::InvalidLength),
        },
        AppTag::ObjectId => match len {
            4 => Ok(DataValue::ObjectId(ObjectId::from_raw(r.read_be_u32()?))),
            _ => Err(DecodeError::InvalidLength),
        },
    }
}

/// Decodes application values until the closing tag `tag_num`, consuming
/// the closing tag. Used for the braced value list of property services.
pub fn decode_value_sequence<'a>(
    r: &mut Reader<'a>,
    tag_num: u8,
) -> Result<Vec<DataValue<'a>>, DecodeError> {
    let mut values = Vec::new();
    loop {
        let tag = Tag::decode(r)?;
        if tag == (Tag::Closing { tag_num }) {
            return Ok(values);
        }
        values.push(decode_application_value_after_tag(r, tag)?);
    }
}
