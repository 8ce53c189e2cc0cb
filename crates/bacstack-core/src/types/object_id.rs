use crate::types::ObjectType;
use core::fmt;

/// Packed BACnet object identifier: 10 bits of object type, 22 bits of
/// instance number, big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Largest assignable instance number; [`Self::UNASSIGNED_INSTANCE`]
    /// is reserved to mean "no value".
    pub const MAX_INSTANCE: u32 = 0x3F_FFFE;
    pub const UNASSIGNED_INSTANCE: u32 = 0x3F_FFFF;

    pub const fn new(object_type: ObjectType, instance: u32) -> Self {
        Self(((object_type.to_u16() as u32 & 0x03FF) << 22) | (instance & 0x3F_FFFF))
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn object_type(self) -> ObjectType {
        ObjectType::from_u16((self.0 >> 22) as u16 & 0x03FF)
    }

    pub const fn instance(self) -> u32 {
        self.0 & 0x3F_FFFF
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.object_type(), self.instance())
    }
}

#[cfg(test)]
mod tests {
    use super::ObjectId;
    use crate::types::ObjectType;
    use proptest::prelude::*;

    #[test]
    fn packs_type_and_instance() {
        let id = ObjectId::new(ObjectType::Device, 389_001);
        assert_eq!(id.raw(), 0x0205_F049);
        assert_eq!(id.object_type(), ObjectType::Device);
        assert_eq!(id.instance(), 389_001);
    }

    proptest! {
        #[test]
        fn packing_roundtrip(type_num in 0u16..1024, instance in 0u32..=ObjectId::MAX_INSTANCE) {
            let id = ObjectId::new(ObjectType::from_u16(type_num), instance);
            prop_assert_eq!(id.object_type().to_u16(), type_num);
            prop_assert_eq!(id.instance(), instance);
        }
    }
}
