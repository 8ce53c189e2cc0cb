use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

/// Length codes 0..=4 are literal; 5 announces an extended length.
const LVT_EXTENDED: u8 = 5;
/// Context-class length codes 6 and 7 mark opening and closing tags.
const LVT_OPENING: u8 = 6;
const LVT_CLOSING: u8 = 7;

/// The thirteen BACnet application tag numbers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTag {
    Null = 0,
    Boolean = 1,
    UnsignedInt = 2,
    SignedInt = 3,
    Real = 4,
    Double = 5,
    OctetString = 6,
    CharacterString = 7,
    BitString = 8,
    Enumerated = 9,
    Date = 10,
    Time = 11,
    ObjectId = 12,
}

impl AppTag {
    /// Maps a wire tag number to an application tag; 13..=15 are
    /// reserved by the standard.
    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => Self::Null,
            1 => Self::Boolean,
            2 => Self::UnsignedInt,
            3 => Self::SignedInt,
            4 => Self::Real,
            5 => Self::Double,
            6 => Self::OctetString,
            7 => Self::CharacterString,
            8 => Self::BitString,
            9 => Self::Enumerated,
            10 => Self::Date,
            11 => Self::Time,
            12 => Self::ObjectId,
            _ => return Err(DecodeError::InvalidTag),
        })
    }
}

/// One decoded tag header: class, number, and declared payload length.
///
/// Opening and closing tags carry no length; they bracket constructed
/// values inside service payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Application { tag: AppTag, len: u32 },
    Context { tag_num: u8, len: u32 },
    Opening { tag_num: u8 },
    Closing { tag_num: u8 },
}

impl Tag {
    pub fn encode(self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Tag::Application { tag, len } => encode_header(w, tag as u8, false, len),
            Tag::Context { tag_num, len } => encode_header(w, tag_num, true, len),
            Tag::Opening { tag_num } => encode_bracket(w, tag_num, LVT_OPENING),
            Tag::Closing { tag_num } => encode_bracket(w, tag_num, LVT_CLOSING),
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let initial = r.read_u8()?;
        let is_context = initial & 0b0000_1000 != 0;
        let lvt = initial & 0b0000_0111;

        // Tag number 15 in the upper nibble announces one extension byte.
        let tag_num = match initial >> 4 {
            0x0F => r.read_u8()?,
            n => n,
        };

        if is_context {
            match lvt {
                LVT_OPENING => return Ok(Tag::Opening { tag_num }),
                LVT_CLOSING => return Ok(Tag::Closing { tag_num }),
                _ => {}
            }
        } else if lvt == LVT_OPENING || lvt == LVT_CLOSING {
            return Err(DecodeError::ReservedBits);
        }

        let len = decode_length(r, lvt)?;
        if is_context {
            Ok(Tag::Context { tag_num, len })
        } else {
            Ok(Tag::Application {
                tag: AppTag::from_u8(tag_num)?,
                len,
            })
        }
    }

    /// Decodes a tag and checks it is the context tag `tag_num`,
    /// returning the declared length.
    pub fn expect_context(r: &mut Reader<'_>, tag_num: u8) -> Result<u32, DecodeError> {
        match Self::decode(r)? {
            Tag::Context { tag_num: n, len } if n == tag_num => Ok(len),
            _ => Err(DecodeError::InvalidTag),
        }
    }

    /// Decodes a tag and checks it is the opening tag `tag_num`.
    pub fn expect_opening(r: &mut Reader<'_>, tag_num: u8) -> Result<(), DecodeError> {
        match Self::decode(r)? {
            Tag::Opening { tag_num: n } if n == tag_num => Ok(()),
            _ => Err(DecodeError::InvalidTag),
        }
    }

    /// Decodes a tag and checks it is the closing tag `tag_num`.
    pub fn expect_closing(r: &mut Reader<'_>, tag_num: u8) -> Result<(), DecodeError> {
        match Self::decode(r)? {
            Tag::Closing { tag_num: n } if n == tag_num => Ok(()),
            _ => Err(DecodeError::InvalidTag),
        }
    }
}

fn encode_header(
    w: &mut Writer<'_>,
    tag_num: u8,
    is_context: bool,
    len: u32,
) -> Result<(), EncodeError> {
    let nibble = if tag_num <= 14 { tag_num } else { 0x0F };
    let lvt = if len <= 4 { len as u8 } else { LVT_EXTENDED };
    let mut initial = (nibble << 4) | lvt;
    if is_context {
        initial |= 0b0000_1000;
    }
    w.write_u8(initial)?;
    if tag_num > 14 {
        w.write_u8(tag_num)?;
    }

    if lvt == LVT_EXTENDED {
        if len <= 253 {
            w.write_u8(len as u8)?;
        } else if len <= u32::from(u16::MAX) {
            w.write_u8(254)?;
            w.write_be_u16(len as u16)?;
        } else {
            w.write_u8(255)?;
            w.write_be_u32(len)?;
        }
    }
    Ok(())
}

fn encode_bracket(w: &mut Writer<'_>, tag_num: u8, lvt: u8) -> Result<(), EncodeError> {
    let nibble = if tag_num <= 14 { tag_num } else { 0x0F };
    w.write_u8((nibble << 4) | 0b0000_1000 | lvt)?;
    if tag_num > 14 {
        w.write_u8(tag_num)?;
    }
    Ok(())
}

fn decode_length(r: &mut Reader<'_>, lvt: u8) -> Result<u32, DecodeError> {
    match lvt {
        0..=4 => Ok(u32::from(lvt)),
        LVT_EXTENDED => match r.read_u8()? {
            first @ 0..=253 => Ok(u32::from(first)),
            254 => Ok(u32::from(r.read_be_u16()?)),
            255 => r.read_be_u32(),
        },
        _ => Err(DecodeError::InvalidLength),
    }
}

#[cfg(test)]
mod tests {
    use super::{AppTag, Tag};
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::DecodeError;

    fn roundtrip(tag: Tag) -> (Tag, usize) {
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        tag.encode(&mut w).unwrap();
        let written = w.position();
        let mut r = Reader::new(w.as_written());
        let decoded = Tag::decode(&mut r).unwrap();
        assert!(r.is_empty());
        (decoded, written)
    }

    #[test]
    fn short_lengths_fit_the_initial_octet() {
        let tag = Tag::Application {
            tag: AppTag::Real,
            len: 4,
        };
        let (decoded, written) = roundtrip(tag);
        assert_eq!(decoded, tag);
        assert_eq!(written, 1);
    }

    #[test]
    fn extended_length_thresholds() {
        for len in [5, 253, 254, 65_535, 65_536, 1 << 24] {
            let tag = Tag::Context { tag_num: 3, len };
            assert_eq!(roundtrip(tag).0, tag);
        }
    }

    #[test]
    fn extended_tag_numbers_get_an_extra_octet() {
        let tag = Tag::Context {
            tag_num: 200,
            len: 1,
        };
        let (decoded, written) = roundtrip(tag);
        assert_eq!(decoded, tag);
        assert_eq!(written, 2);
    }

    #[test]
    fn brackets_are_single_octets() {
        assert_eq!(roundtrip(Tag::Opening { tag_num: 3 }).1, 1);
        assert_eq!(roundtrip(Tag::Closing { tag_num: 3 }).1, 1);
    }

    #[test]
    fn reserved_application_tag_numbers_are_rejected() {
        // Tag number 13, application class, length 1.
        let mut r = Reader::new(&[0xD1]);
        assert_eq!(Tag::decode(&mut r).unwrap_err(), DecodeError::InvalidTag);
    }

    #[test]
    fn application_class_bracket_codes_are_reserved() {
        let mut r = Reader::new(&[0x46]);
        assert_eq!(Tag::decode(&mut r).unwrap_err(), DecodeError::ReservedBits);
    }

    #[test]
    fn truncated_extended_length_is_eof() {
        // lvt=5 announces an extended length but the buffer ends.
        let mut r = Reader::new(&[0x25]);
        assert_eq!(Tag::decode(&mut r).unwrap_err(), DecodeError::UnexpectedEof);

        let mut r = Reader::new(&[0x25, 254, 0x01]);
        assert_eq!(Tag::decode(&mut r).unwrap_err(), DecodeError::UnexpectedEof);
    }
}
