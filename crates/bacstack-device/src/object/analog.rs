//! Analog input and output objects.

use crate::object::{index_array, reject_index, status_flags, ObjectError, PropertyWrite};
use crate::value::PropertyValue;
use bacstack_core::types::{ObjectId, ObjectType, PropertyId};
use std::collections::HashMap;

/// Priority slot used when a commanding write names none (the lowest).
const DEFAULT_PRIORITY: u8 = 16;

/// An analog input: a measured floating-point value with engineering
/// limits.
#[derive(Debug, Clone)]
pub struct AnalogInput {
    pub instance: u32,
    pub object_name: String,
    pub description: String,
    pub present_value: f32,
    pub min_present_value: f32,
    pub max_present_value: f32,
    pub units: String,
    pub out_of_service: bool,
    /// Vendor-specific properties, keyed by numeric id.
    pub proprietary: HashMap<u32, PropertyValue>,
}

impl AnalogInput {
    pub fn new(instance: u32, object_name: impl Into<String>) -> Self {
        Self {
            instance,
            object_name: object_name.into(),
            description: String::new(),
            present_value: 0.0,
            min_present_value: f32::MIN,
            max_present_value: f32::MAX,
            units: String::new(),
            out_of_service: false,
            proprietary: HashMap::new(),
        }
    }

    pub fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.min_present_value = min;
        self.max_present_value = max;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_present_value(mut self, value: f32) -> Self {
        self.present_value = value;
        self
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::new(ObjectType::AnalogInput, self.instance)
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

        reject_index(array_index)?;
        Ok(match property {
            PropertyId::ObjectIdentifier => PropertyValue::ObjectId(self.object_id()),
            PropertyId::ObjectName => PropertyValue::CharacterString(self.object_name.clone()),
            PropertyId::ObjectType => {
                PropertyValue::Enumerated(u32::from(ObjectType::AnalogInput.to_u16()))
            }
            PropertyId::Description => PropertyValue::CharacterString(self.description.clone()),
            PropertyId::PresentValue => PropertyValue::Real(self.present_value),
            PropertyId::MinPresValue => PropertyValue::Real(self.min_present_value),
            PropertyId::MaxPresValue => PropertyValue::Real(self.max_present_value),
            PropertyId::Units => PropertyValue::CharacterString(self.units.clone()),
            PropertyId::OutOfService => PropertyValue::Boolean(self.out_of_service),
            PropertyId::EventState => PropertyValue::Enumerated(0),
            PropertyId::StatusFlags => status_flags(false, false, false, self.out_of_service),
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
        match property {
            PropertyId::PresentValue => {
                let value = expect_real(&write.value)?;
                check_range(value, self.min_present_value, self.max_present_value)?;
                self.present_value = value;
            }
            PropertyId::ObjectName => self.object_name = expect_string(write.value)?,
            PropertyId::Description => self.description = expect_string(write.value)?,
            PropertyId::Units => self.units = expect_string(write.value)?,
            PropertyId::MinPresValue => self.min_present_value = expect_real(&write.value)?,
            PropertyId::MaxPresValue => self.max_present_value = expect_real(&write.value)?,
            PropertyId::OutOfService => self.out_of_service = expect_boolean(&write.value)?,
            PropertyId::ObjectIdentifier
            | PropertyId::ObjectType
            | PropertyId::StatusFlags
            | PropertyId::EventState => return Err(ObjectError::WriteAccessDenied),
            _ => return Err(ObjectError::UnknownProperty),
        }
        Ok(())
    }
}

/// An analog output: a commandable floating-point value resolved
/// through a 16-slot priority array.
#[derive(Debug, Clone)]
pub struct AnalogOutput {
    pub instance: u32,
    pub object_name: String,
    pub description: String,
    pub min_present_value: f32,
    pub max_present_value: f32,
    pub units: String,
    pub out_of_service: bool,
    pub priority_array: [Option<f32>; 16],
    pub relinquish_default: f32,
    pub proprietary: HashMap<u32, PropertyValue>,
}

impl AnalogOutput {
    pub fn new(instance: u32, object_name: impl Into<String>) -> Self {
        Self {
            instance,
            object_name: object_name.into(),
            description: String::new(),
            min_present_value: f32::MIN,
            max_present_value: f32::MAX,
            units: String::new(),
            out_of_service: false,
            priority_array: [None; 16],
            relinquish_default: 0.0,
            proprietary: HashMap::new(),
        }
    }

    pub fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.min_present_value = min;
        self.max_present_value = max;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_relinquish_default(mut self, value: f32) -> Self {
        self.relinquish_default = value;
        self
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::new(ObjectType::AnalogOutput, self.instance)
    }

    /// The commanded value: the lowest-numbered occupied priority slot,
    /// else the relinquish default.
    pub fn present_value(&self) -> f32 {
        self.priority_array
            .iter()
            .find_map(|slot| *slot)
            .unwrap_or(self.relinquish_default)
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

        if property == PropertyId::PriorityArray {
            let slots = self
                .priority_array
                .iter()
                .map(|slot| slot.map_or(PropertyValue::Null, PropertyValue::Real))
                .collect();
            return index_array(slots, array_index);
        }

        reject_index(array_index)?;
        Ok(match property {
            PropertyId::ObjectIdentifier => PropertyValue::ObjectId(self.object_id()),
            PropertyId::ObjectName => PropertyValue::CharacterString(self.object_name.clone()),
            PropertyId::ObjectType => {
                PropertyValue::Enumerated(u32::from(ObjectType::AnalogOutput.to_u16()))
            }
            PropertyId::Description => PropertyValue::CharacterString(self.description.clone()),
            PropertyId::PresentValue => PropertyValue::Real(self.present_value()),
            PropertyId::MinPresValue => PropertyValue::Real(self.min_present_value),
            PropertyId::MaxPresValue => PropertyValue::Real(self.max_present_value),
            PropertyId::RelinquishDefault => PropertyValue::Real(self.relinquish_default),
            PropertyId::Units => PropertyValue::CharacterString(self.units.clone()),
            PropertyId::OutOfService => PropertyValue::Boolean(self.out_of_service),
            PropertyId::EventState => PropertyValue::Enumerated(0),
            PropertyId::StatusFlags => status_flags(false, false, false, self.out_of_service),
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

        match property {
            PropertyId::PresentValue => {
                reject_index(write.array_index)?;
                let priority = match write.priority {
                    None => DEFAULT_PRIORITY,
                    Some(p @ 1..=16) => p,
                    Some(_) => return Err(ObjectError::ValueOutOfRange),
                };
                let slot = usize::from(priority) - 1;
                match write.value {
                    // Null relinquishes the command at that priority.
                    PropertyValue::Null => self.priority_array[slot] = None,
                    ref value => {
                        let value = expect_real(value)?;
                        check_range(value, self.min_present_value, self.max_present_value)?;
                        self.priority_array[slot] = Some(value);
                    }
                }
            }
            PropertyId::RelinquishDefault => {
                reject_index(write.array_index)?;
                self.relinquish_default = expect_real(&write.value)?;
            }
            PropertyId::ObjectName => {
                reject_index(write.array_index)?;
                self.object_name = expect_string(write.value)?;
            }
            PropertyId::Description => {
                reject_index(write.array_index)?;
                self.description = expect_string(write.value)?;
            }
            PropertyId::Units => {
                reject_index(write.array_index)?;
                self.units = expect_string(write.value)?;
            }
            PropertyId::MinPresValue => {
                reject_index(write.array_index)?;
                self.min_present_value = expect_real(&write.value)?;
            }
            PropertyId::MaxPresValue => {
                reject_index(write.array_index)?;
                self.max_present_value = expect_real(&write.value)?;
            }
            PropertyId::OutOfService => {
                reject_index(write.array_index)?;
                self.out_of_service = expect_boolean(&write.value)?;
            }
            PropertyId::ObjectIdentifier
            | PropertyId::ObjectType
            | PropertyId::StatusFlags
            | PropertyId::EventState
            | PropertyId::PriorityArray => return Err(ObjectError::WriteAccessDenied),
            _ => return Err(ObjectError::UnknownProperty),
        }
        Ok(())
    }
}

fn expect_real(value: &PropertyValue) -> Result<f32, ObjectError> {
    match value {
        PropertyValue::Real(v) => Ok(*v),
        _ => Err(ObjectError::InvalidDataType),
    }
}

fn expect_boolean(value: &PropertyValue) -> Result<bool, ObjectError> {
    match value {
        PropertyValue::Boolean(v) => Ok(*v),
        _ => Err(ObjectError::InvalidDataType),
    }
}

fn expect_string(value: PropertyValue) -> Result<String, ObjectError> {
    match value {
        PropertyValue::CharacterString(v) => Ok(v),
        _ => Err(ObjectError::InvalidDataType),
    }
}

fn check_range(value: f32, min: f32, max: f32) -> Result<(), ObjectError> {
    if value.is_nan() || value < min || value > max {
        return Err(ObjectError::ValueOutOfRange);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AnalogInput, AnalogOutput};
    use crate::object::{ObjectError, PropertyWrite};
    use crate::value::PropertyValue;
    use bacstack_core::types::PropertyId;

    fn write_real(value: f32, priority: Option<u8>) -> PropertyWrite {
        PropertyWrite {
            value: PropertyValue::Real(value),
            array_index: None,
            priority,
        }
    }

    #[test]
    fn input_write_outside_limits_is_out_of_range() {
        let mut ai = AnalogInput::new(1, "oat").with_limits(0.0, 100.0);
        assert_eq!(
            ai.write_property(PropertyId::PresentValue, write_real(250.0, None)),
            Err(ObjectError::ValueOutOfRange)
        );
        ai.write_property(PropertyId::PresentValue, write_real(72.5, None))
            .unwrap();
        assert_eq!(
            ai.read_property(PropertyId::PresentValue, None),
            Ok(PropertyValue::Real(72.5))
        );
    }

    #[test]
    fn input_rejects_mismatched_value_types() {
        let mut ai = AnalogInput::new(1, "oat");
        let err = ai.write_property(
            PropertyId::PresentValue,
            PropertyWrite::value(PropertyValue::Unsigned(7)),
        );
        assert_eq!(err, Err(ObjectError::InvalidDataType));
    }

    #[test]
    fn output_resolves_the_lowest_priority_slot() {
        let mut ao = AnalogOutput::new(1, "vav").with_relinquish_default(20.0);
        assert_eq!(ao.present_value(), 20.0);

        ao.write_property(PropertyId::PresentValue, write_real(74.0, Some(8)))
            .unwrap();
        ao.write_property(PropertyId::PresentValue, write_real(60.0, Some(12)))
            .unwrap();
        assert_eq!(ao.present_value(), 74.0);

        // A more urgent command wins.
        ao.write_property(PropertyId::PresentValue, write_real(80.0, Some(3)))
            .unwrap();
        assert_eq!(ao.present_value(), 80.0);

        // Relinquishing it falls back to the next slot down.
        ao.write_property(
            PropertyId::PresentValue,
            PropertyWrite {
                value: PropertyValue::Null,
                array_index: None,
                priority: Some(3),
            },
        )
        .unwrap();
        assert_eq!(ao.present_value(), 74.0);
    }

    #[test]
    fn output_write_without_priority_uses_slot_sixteen() {
        let mut ao = AnalogOutput::new(2, "pump");
        ao.write_property(PropertyId::PresentValue, write_real(1.0, None))
            .unwrap();
        assert_eq!(ao.priority_array[15], Some(1.0));
    }

    #[test]
    fn priority_array_reads_by_index() {
        let mut ao = AnalogOutput::new(2, "pump");
        ao.write_property(PropertyId::PresentValue, write_real(42.0, Some(8)))
            .unwrap();

        assert_eq!(
            ao.read_property(PropertyId::PriorityArray, Some(0)),
            Ok(PropertyValue::Unsigned(16))
        );
        assert_eq!(
            ao.read_property(PropertyId::PriorityArray, Some(8)),
            Ok(PropertyValue::Real(42.0))
        );
        assert_eq!(
            ao.read_property(PropertyId::PriorityArray, Some(7)),
            Ok(PropertyValue::Null)
        );
        assert_eq!(
            ao.read_property(PropertyId::PriorityArray, Some(17)),
            Err(ObjectError::InvalidArrayIndex)
        );
    }

    #[test]
    fn output_range_check_applies_per_slot() {
        let mut ao = AnalogOutput::new(3, "valve").with_limits(0.0, 100.0);
        assert_eq!(
            ao.write_property(PropertyId::PresentValue, write_real(120.0, Some(5))),
            Err(ObjectError::ValueOutOfRange)
        );
        assert_eq!(ao.priority_array[4], None);
    }

    #[test]
    fn proprietary_properties_live_in_the_side_map() {
        let mut ai = AnalogInput::new(1, "oat");
        assert_eq!(
            ai.read_property(PropertyId::Other(3042), None),
            Err(ObjectError::UnknownProperty)
        );
        ai.write_property(
            PropertyId::Other(3042),
            PropertyWrite::value(PropertyValue::Unsigned(9)),
        )
        .unwrap();
        assert_eq!(
            ai.read_property(PropertyId::Other(3042), None),
            Ok(PropertyValue::Unsigned(9))
        );
    }

    #[test]
    fn scalar_properties_refuse_array_indices() {
        let ai = AnalogInput::new(1, "oat");
        assert_eq!(
            ai.read_property(PropertyId::PresentValue, Some(1)),
            Err(ObjectError::PropertyIsNotAnArray)
        );
    }
}
