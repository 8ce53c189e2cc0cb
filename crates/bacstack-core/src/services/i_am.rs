use crate::encoding::{
    primitives::{
        decode_app_enumerated, decode_app_object_id, decode_app_unsigned, encode_app_enumerated,
        encode_app_object_id, encode_app_unsigned,
    },
    reader::Reader,
    writer::Writer,
};
use crate::types::{ObjectId, ObjectType, Segmentation};
use crate::{DecodeError, EncodeError};

pub const SERVICE_I_AM: u8 = 0x00;

/// I-Am parameters, in wire order: device object id, accepted APDU
/// length, segmentation capability, vendor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IAmRequest {
    pub device_id: ObjectId,
    pub max_apdu: u32,
    pub segmentation: Segmentation,
    pub vendor_id: u32,
}

impl IAmRequest {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        encode_app_object_id(w, self.device_id)?;
        encode_app_unsigned(w, self.max_apdu)?;
        encode_app_enumerated(w, self.segmentation.to_u32())?;
        encode_app_unsigned(w, self.vendor_id)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let device_id = decode_app_object_id(r)?;
        if device_id.object_type() != ObjectType::Device {
            return Err(DecodeError::InvalidValue);
        }
        let max_apdu = decode_app_unsigned(r)?;
        let segmentation =
            Segmentation::from_u32(decode_app_enumerated(r)?).ok_or(DecodeError::InvalidValue)?;
        let vendor_id = decode_app_unsigned(r)?;
        Ok(Self {
            device_id,
            max_apdu,
            segmentation,
            vendor_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::IAmRequest;
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{ObjectId, ObjectType, Segmentation};
    use crate::DecodeError;

    #[test]
    fn parses_reply_from_device_389001() {
        let raw = [
            0xC4, 0x02, 0x05, 0xF0, 0x49, // device,389001
            0x22, 0x04, 0x49, // max-apdu 1097
            0x91, 0x00, // segmented-both
            0x21, 0x2A, // vendor 42
        ];
        let i_am = IAmRequest::decode(&mut Reader::new(&raw)).unwrap();
        assert_eq!(i_am.device_id.instance(), 389_001);
        assert_eq!(i_am.device_id.object_type(), ObjectType::Device);
        assert_eq!(i_am.max_apdu, 1097);
        assert_eq!(i_am.segmentation, Segmentation::Both);
        assert_eq!(i_am.vendor_id, 42);
    }

    #[test]
    fn roundtrip() {
        let req = IAmRequest {
            device_id: ObjectId::new(ObjectType::Device, 1234),
            max_apdu: 1476,
            segmentation: Segmentation::None,
            vendor_id: 842,
        };
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();
        assert_eq!(IAmRequest::decode(&mut Reader::new(w.as_written())).unwrap(), req);
    }

    #[test]
    fn non_device_object_id_is_invalid() {
        let req = IAmRequest {
            device_id: ObjectId::new(ObjectType::AnalogInput, 1),
            max_apdu: 480,
            segmentation: Segmentation::None,
            vendor_id: 0,
        };
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();
        assert_eq!(
            IAmRequest::decode(&mut Reader::new(w.as_written())).unwrap_err(),
            DecodeError::InvalidValue
        );
    }
}
