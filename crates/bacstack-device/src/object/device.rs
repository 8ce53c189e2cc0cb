//! The device object.

use crate::object::{index_array, reject_index, status_flags, ObjectError, PropertyWrite};
use crate::value::PropertyValue;
use bacstack_core::types::{MaxApdu, ObjectId, ObjectType, PropertyId, Segmentation};
use std::collections::HashMap;

/// The local device's self-description. The registry keeps
/// `object_list` in step with the objects it holds.
#[derive(Debug, Clone)]
pub struct DeviceObject {
    pub instance: u32,
    pub object_name: String,
    pub description: String,
    pub location: String,
    pub vendor_name: String,
    pub vendor_id: u32,
    pub model_name: String,
    pub firmware_revision: String,
    pub max_apdu: MaxApdu,
    pub segmentation: Segmentation,
    pub object_list: Vec<ObjectId>,
    pub proprietary: HashMap<u32, PropertyValue>,
}

impl DeviceObject {
    pub fn new(instance: u32, object_name: impl Into<String>) -> Self {
        let object_list = vec![ObjectId::new(ObjectType::Device, instance)];
        Self {
            instance,
            object_name: object_name.into(),
            description: String::new(),
            location: String::new(),
            vendor_name: String::new(),
            vendor_id: 0,
            model_name: String::new(),
            firmware_revision: String::new(),
            max_apdu: MaxApdu::Octets1476,
            segmentation: Segmentation::None,
            object_list,
            proprietary: HashMap::new(),
        }
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::new(ObjectType::Device, self.instance)
    }

    pub fn read_property(
        &self,
        property: PropertyId,
        array_index: Option<u32>,
    ) -> Result<PropertyValue, ObjectError> {
        if let PropertyId::Other(id) = property {
            if let Some(value) = self.proprietary.get(&id) {
                return Ok(value.clone());
            }
            return Err(ObjectError::UnknownProperty);
        }

        if property == PropertyId::ObjectList {
            let items = self
                .object_list
                .iter()
                .map(|&id| PropertyValue::ObjectId(id))
                .collect();
            return index_array(items, array_index);
        }

        reject_index(array_index)?;
        Ok(match property {
            PropertyId::ObjectIdentifier => PropertyValue::ObjectId(self.object_id()),
            PropertyId::ObjectName => PropertyValue::CharacterString(self.object_name.clone()),
            PropertyId::ObjectType => {
                PropertyValue::Enumerated(u32::from(ObjectType::Device.to_u16()))
            }
            PropertyId::Description => PropertyValue::CharacterString(self.description.clone()),
            PropertyId::Location => PropertyValue::CharacterString(self.location.clone()),
            PropertyId::VendorName => PropertyValue::CharacterString(self.vendor_name.clone()),
            PropertyId::VendorIdentifier => PropertyValue::Unsigned(self.vendor_id),
            PropertyId::ModelName => PropertyValue::CharacterString(self.model_name.clone()),
            PropertyId::FirmwareRevision => {
                PropertyValue::CharacterString(self.firmware_revision.clone())
            }
            PropertyId::MaxApduLengthAccepted => {
                PropertyValue::Unsigned(u32::from(self.max_apdu.octets()))
            }
            PropertyId::SegmentationSupported => {
                PropertyValue::Enumerated(self.segmentation.to_u32())
            }
            PropertyId::ProtocolVersion => PropertyValue::Unsigned(1),
            PropertyId::SystemStatus => PropertyValue::Enumerated(0),
            PropertyId::StatusFlags => status_flags(false, false, false, false),
            _ => return Err(ObjectError::UnknownProperty),
        })
    }

    pub fn write_property(
        &mut self,
        property: PropertyId,
        write: PropertyWrite,
    ) -> Result<(), ObjectError> {
        if let PropertyId::Other(id) = property {
            self.proprietary.insert(id, write.value);
            return Ok(());
        }

        reject_index(write.array_index)?;
        match (property, write.value) {
            (PropertyId::ObjectName, PropertyValue::CharacterString(v)) => self.object_name = v,
            (PropertyId::Description, PropertyValue::CharacterString(v)) => self.description = v,
            (PropertyId::Location, PropertyValue::CharacterString(v)) => self.location = v,
            (
                PropertyId::ObjectName | PropertyId::Description | PropertyId::Location,
                _,
            ) => return Err(ObjectError::InvalidDataType),
            (
                PropertyId::ObjectIdentifier
                | PropertyId::ObjectType
                | PropertyId::ObjectList
                | PropertyId::VendorName
                | PropertyId::VendorIdentifier
                | PropertyId::ModelName
                | PropertyId::FirmwareRevision
                | PropertyId::MaxApduLengthAccepted
                | PropertyId::SegmentationSupported
                | PropertyId::ProtocolVersion
                | PropertyId::SystemStatus
                | PropertyId::StatusFlags,
                _,
            ) => return Err(ObjectError::WriteAccessDenied),
            _ => return Err(ObjectError::UnknownProperty),
        }
        Ok(())
    }
}
