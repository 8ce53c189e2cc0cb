//! Typed codecs for the BACnet primitive types.
//!
//! Every primitive comes in an application-tagged flavour and a
//! context-tagged flavour; context decoders verify the expected tag
//! number before touching the payload. Integer payloads go through the
//! cursor's `write_unsigned_be`/`read_unsigned_be`, sized here with
//! [`unsigned_len`] and [`signed_len`] so encodings stay
//! length-minimal.

use crate::encoding::{
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::{BitString, Date, ObjectId, Time};
use crate::{DecodeError, EncodeError};
use alloc::borrow::Cow;
use alloc::string::String;

/// Character set selectors carried in the first octet of a character
/// string payload.
pub const CHARSET_UTF8: u8 = 0;
pub const CHARSET_DBCS: u8 = 1;
pub const CHARSET_JIS: u8 = 2;
pub const CHARSET_UCS2: u8 = 3;
pub const CHARSET_UCS4: u8 = 4;
pub const CHARSET_LATIN1: u8 = 5;

/// Minimal octet count for an unsigned payload. Zero still takes one
/// octet on encode; zero-length payloads are only accepted on decode.
pub const fn unsigned_len(value: u32) -> usize {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

/// Minimal octet count that keeps the sign of a two's-complement
/// payload.
pub const fn signed_len(value: i32) -> usize {
    match value {
        -0x80..=0x7F => 1,
        -0x8000..=0x7FFF => 2,
        -0x80_0000..=0x7F_FFFF => 3,
        _ => 4,
    }
}

/// Writes `value` two's-complement big-endian in the fewest octets,
/// returning the count.
pub fn encode_signed(w: &mut Writer<'_>, value: i32) -> Result<usize, EncodeError> {
    let len = signed_len(value);
    w.write_all(&value.to_be_bytes()[4 - len..])?;
    Ok(len)
}

/// Reads a two's-complement payload of `len` octets, sign-extending.
pub fn decode_signed(r: &mut Reader<'_>, len: usize) -> Result<i32, DecodeError> {
    if len == 0 || len > 4 {
        return Err(DecodeError::InvalidLength);
    }
    let bytes = r.read_exact(len)?;
    let fill = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut out = [fill; 4];
    out[4 - len..].copy_from_slice(bytes);
    Ok(i32::from_be_bytes(out))
}

/// Decodes a character string payload (charset octet + text). UTF-8
/// borrows from the input; ISO 8859-1 allocates only when a byte above
/// 0x7F forces transcoding.
pub fn decode_character_string<'a>(raw: &'a [u8]) -> Result<Cow<'a, str>, DecodeError> {
    let (&charset, text) = raw.split_first().ok_or(DecodeError::InvalidLength)?;
    match charset {
        CHARSET_UTF8 => core::str::from_utf8(text)
            .map(Cow::Borrowed)
            .map_err(|_| DecodeError::InvalidValue),
        CHARSET_LATIN1 => {
            if text.is_ascii() {
                // ASCII is valid UTF-8 as-is.
                Ok(Cow::Borrowed(core::str::from_utf8(text).expect("ascii")))
            } else {
                Ok(Cow::Owned(
                    text.iter().map(|&b| b as char).collect::<String>(),
                ))
            }
        }
        CHARSET_DBCS | CHARSET_JIS | CHARSET_UCS2 | CHARSET_UCS4 => {
            Err(DecodeError::UnsupportedCharset)
        }
        _ => Err(DecodeError::UnsupportedCharset),
    }
}

// Application-tagged encoders.

pub fn encode_app_null(w: &mut Writer<'_>) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::Null,
        len: 0,
    }
    .encode(w)
}

pub fn encode_app_boolean(w: &mut Writer<'_>, value: bool) -> Result<(), EncodeError> {
    // Application booleans carry the value in the length field.
    Tag::Application {
        tag: AppTag::Boolean,
        len: u32::from(value),
    }
    .encode(w)
}

pub fn encode_app_unsigned(w: &mut Writer<'_>, value: u32) -> Result<(), EncodeError> {
    let len = unsigned_len(value);
    Tag::Application {
        tag: AppTag::UnsignedInt,
        len: len as u32,
    }
    .encode(w)?;
    w.write_unsigned_be(value, len)
}

pub fn encode_app_signed(w: &mut Writer<'_>, value: i32) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::SignedInt,
        len: signed_len(value) as u32,
    }
    .encode(w)?;
    encode_signed(w, value).map(|_| ())
}

pub fn encode_app_enumerated(w: &mut Writer<'_>, value: u32) -> Result<(), EncodeError> {
    let len = unsigned_len(value);
    Tag::Application {
        tag: AppTag::Enumerated,
        len: len as u32,
    }
    .encode(w)?;
    w.write_unsigned_be(value, len)
}

pub fn encode_app_real(w: &mut Writer<'_>, value: f32) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::Real,
        len: 4,
    }
    .encode(w)?;
    w.write_all(&value.to_be_bytes())
}

pub fn encode_app_double(w: &mut Writer<'_>, value: f64) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::Double,
        len: 8,
    }
    .encode(w)?;
    w.write_all(&value.to_be_bytes())
}

pub fn encode_app_octet_string(w: &mut Writer<'_>, value: &[u8]) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::OctetString,
        len: payload_len(value.len(), 0)?,
    }
    .encode(w)?;
    w.write_all(value)
}

/// Encodes a character string as UTF-8 (charset 0). The tag length
/// includes the charset octet.
pub fn encode_app_character_string(w: &mut Writer<'_>, value: &str) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::CharacterString,
        len: payload_len(value.len(), 1)?,
    }
    .encode(w)?;
    w.write_u8(CHARSET_UTF8)?;
    w.write_all(value.as_bytes())
}

pub fn encode_app_bit_string(w: &mut Writer<'_>, value: BitString<'_>) -> Result<(), EncodeError> {
    if value.unused_bits > 7 {
        return Err(EncodeError::ValueOutOfRange);
    }
    Tag::Application {
        tag: AppTag::BitString,
        len: payload_len(value.data.len(), 1)?,
    }
    .encode(w)?;
    w.write_u8(value.unused_bits)?;
    w.write_all(value.data)
}

pub fn encode_app_date(w: &mut Writer<'_>, value: Date) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::Date,
        len: 4,
    }
    .encode(w)?;
    w.write_all(&value.to_octets())
}

pub fn encode_app_time(w: &mut Writer<'_>, value: Time) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::Time,
        len: 4,
    }
    .encode(w)?;
    w.write_all(&value.to_octets())
}

pub fn encode_app_object_id(w: &mut Writer<'_>, value: ObjectId) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::ObjectId,
        len: 4,
    }
    .encode(w)?;
    w.write_be_u32(value.raw())
}

// Application-tagged decoders.

pub fn decode_app_unsigned(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::UnsignedInt,
            len,
        } => r.read_unsigned_be(len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_signed(r: &mut Reader<'_>) -> Result<i32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::SignedInt,
            len,
        } => decode_signed(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_enumerated(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::Enumerated,
            len,
        } => r.read_unsigned_be(len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_real(r: &mut Reader<'_>) -> Result<f32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::Real,
            len: 4,
        } => Ok(f32::from_be_bytes(r.read_fixed()?)),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_object_id(r: &mut Reader<'_>) -> Result<ObjectId, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::ObjectId,
            len: 4,
        } => Ok(ObjectId::from_raw(r.read_be_u32()?)),
        _ => Err(DecodeError::InvalidTag),
    }
}

// Context-tagged encoders. The context flavour of a boolean carries one
// payload byte, unlike the application flavour.

pub fn encode_ctx_null(w: &mut Writer<'_>, tag_num: u8) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 0 }.encode(w)
}

pub fn encode_ctx_boolean(w: &mut Writer<'_>, tag_num: u8, value: bool) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 1 }.encode(w)?;
    w.write_u8(u8::from(value))
}

pub fn encode_ctx_unsigned(w: &mut Writer<'_>, tag_num: u8, value: u32) -> Result<(), EncodeError> {
    let len = unsigned_len(value);
    Tag::Context {
        tag_num,
        len: len as u32,
    }
    .encode(w)?;
    w.write_unsigned_be(value, len)
}

pub fn encode_ctx_signed(w: &mut Writer<'_>, tag_num: u8, value: i32) -> Result<(), EncodeError> {
    Tag::Context {
        tag_num,
        len: signed_len(value) as u32,
    }
    .encode(w)?;
    encode_signed(w, value).map(|_| ())
}

pub fn encode_ctx_enumerated(
    w: &mut Writer<'_>,
    tag_num: u8,
    value: u32,
) -> Result<(), EncodeError> {
    encode_ctx_unsigned(w, tag_num, value)
}

pub fn encode_ctx_real(w: &mut Writer<'_>, tag_num: u8, value: f32) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 4 }.encode(w)?;
    w.write_all(&value.to_be_bytes())
}

pub fn encode_ctx_double(w: &mut Writer<'_>, tag_num: u8, value: f64) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 8 }.encode(w)?;
    w.write_all(&value.to_be_bytes())
}

pub fn encode_ctx_octet_string(
    w: &mut Writer<'_>,
    tag_num: u8,
    value: &[u8],
) -> Result<(), EncodeError> {
    Tag::Context {
        tag_num,
        len: payload_len(value.len(), 0)?,
    }
    .encode(w)?;
    w.write_all(value)
}

pub fn encode_ctx_character_string(
    w: &mut Writer<'_>,
    tag_num: u8,
    value: &str,
) -> Result<(), EncodeError> {
    Tag::Context {
        tag_num,
        len: payload_len(value.len(), 1)?,
    }
    .encode(w)?;
    w.write_u8(CHARSET_UTF8)?;
    w.write_all(value.as_bytes())
}

pub fn encode_ctx_bit_string(
    w: &mut Writer<'_>,
    tag_num: u8,
    value: BitString<'_>,
) -> Result<(), EncodeError> {
    if value.unused_bits > 7 {
        return Err(EncodeError::ValueOutOfRange);
    }
    Tag::Context {
        tag_num,
        len: payload_len(value.data.len(), 1)?,
    }
    .encode(w)?;
    w.write_u8(value.unused_bits)?;
    w.write_all(value.data)
}

pub fn encode_ctx_date(w: &mut Writer<'_>, tag_num: u8, value: Date) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 4 }.encode(w)?;
    w.write_all(&value.to_octets())
}

pub fn encode_ctx_time(w: &mut Writer<'_>, tag_num: u8, value: Time) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 4 }.encode(w)?;
    w.write_all(&value.to_octets())
}

pub fn encode_ctx_object_id(
    w: &mut Writer<'_>,
    tag_num: u8,
    value: ObjectId,
) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 4 }.encode(w)?;
    w.write_be_u32(value.raw())
}

// Context-tagged decoders: verify the wrapper, then delegate.

pub fn decode_ctx_boolean(r: &mut Reader<'_>, tag_num: u8) -> Result<bool, DecodeError> {
    match Tag::expect_context(r, tag_num)? {
        1 => Ok(r.read_u8()? != 0),
        _ => Err(DecodeError::InvalidLength),
    }
}

pub fn decode_ctx_unsigned(r: &mut Reader<'_>, tag_num: u8) -> Result<u32, DecodeError> {
    let len = Tag::expect_context(r, tag_num)?;
    r.read_unsigned_be(len as usize)
}

pub fn decode_ctx_signed(r: &mut Reader<'_>, tag_num: u8) -> Result<i32, DecodeError> {
    let len = Tag::expect_context(r, tag_num)?;
    decode_signed(r, len as usize)
}

pub fn decode_ctx_enumerated(r: &mut Reader<'_>, tag_num: u8) -> Result<u32, DecodeError> {
    decode_ctx_unsigned(r, tag_num)
}

pub fn decode_ctx_real(r: &mut Reader<'_>, tag_num: u8) -> Result<f32, DecodeError> {
    match Tag::expect_context(r, tag_num)? {
        4 => Ok(f32::from_be_bytes(r.read_fixed()?)),
        _ => Err(DecodeError::InvalidLength),
    }
}

pub fn decode_ctx_double(r: &mut Reader<'_>, tag_num: u8) -> Result<f64, DecodeError> {
    match Tag::expect_context(r, tag_num)? {
        8 => Ok(f64::from_be_bytes(r.read_fixed()?)),
        _ => Err(DecodeError::InvalidLength),
    }
}

pub fn decode_ctx_octet_string<'a>(
    r: &mut Reader<'a>,
    tag_num: u8,
) -> Result<&'a [u8], DecodeError> {
    let len = Tag::expect_context(r, tag_num)?;
    r.read_exact(len as usize)
}

pub fn decode_ctx_character_string<'a>(
    r: &mut Reader<'a>,
    tag_num: u8,
) -> Result<Cow<'a, str>, DecodeError> {
    let len = Tag::expect_context(r, tag_num)?;
    decode_character_string(r.read_exact(len as usize)?)
}

pub fn decode_ctx_bit_string<'a>(
    r: &mut Reader<'a>,
    tag_num: u8,
) -> Result<BitString<'a>, DecodeError> {
    let len = Tag::expect_context(r, tag_num)?;
    BitString::from_payload(r.read_exact(len as usize)?)
}

pub fn decode_ctx_date(r: &mut Reader<'_>, tag_num: u8) -> Result<Date, DecodeError> {
    match Tag::expect_context(r, tag_num)? {
        4 => Ok(Date::from_octets(r.read_fixed()?)),
        _ => Err(DecodeError::InvalidLength),
    }
}

pub fn decode_ctx_time(r: &mut Reader<'_>, tag_num: u8) -> Result<Time, DecodeError> {
    match Tag::expect_context(r, tag_num)? {
        4 => Ok(Time::from_octets(r.read_fixed()?)),
        _ => Err(DecodeError::InvalidLength),
    }
}

pub fn decode_ctx_object_id(r: &mut Reader<'_>, tag_num: u8) -> Result<ObjectId, DecodeError> {
    match Tag::expect_context(r, tag_num)? {
        4 => Ok(ObjectId::from_raw(r.read_be_u32()?)),
        _ => Err(DecodeError::InvalidLength),
    }
}

pub fn encode_opening_tag(w: &mut Writer<'_>, tag_num: u8) -> Result<(), EncodeError> {
    Tag::Opening { tag_num }.encode(w)
}

pub fn encode_closing_tag(w: &mut Writer<'_>, tag_num: u8) -> Result<(), EncodeError> {
    Tag::Closing { tag_num }.encode(w)
}

fn payload_len(data_len: usize, prefix: usize) -> Result<u32, EncodeError> {
    u32::try_from(data_len + prefix).map_err(|_| EncodeError::ValueOutOfRange)
}
