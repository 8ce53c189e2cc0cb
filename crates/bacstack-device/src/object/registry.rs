//! The object registry.

use crate::object::{BacnetObject, DeviceObject, ObjectError, PropertyWrite};
use crate::value::PropertyValue;
use bacstack_core::types::{ObjectId, PropertyId};
use std::collections::HashMap;
use std::sync::RwLock;

/// The set of objects one device serves, keyed by `(type, instance)`.
///
/// Shared between the dispatch loop and local callers under a
/// single-writer/multi-reader lock. The lock is never held while
/// anything touches the network and no observer code runs under it.
#[derive(Debug)]
pub struct ObjectRegistry {
    inner: RwLock<Inner>,
}

#[derive(Debug)]
struct Inner {
    objects: HashMap<ObjectId, BacnetObject>,
    device_id: ObjectId,
}

impl ObjectRegistry {
    /// Creates a registry owned by `device`; the device object itself
    /// is registered and cannot be removed.
    pub fn new(device: DeviceObject) -> Self {
        let device_id = device.object_id();
        let mut objects = HashMap::new();
        objects.insert(device_id, BacnetObject::Device(device));
        Self {
            inner: RwLock::new(Inner { objects, device_id }),
        }
    }

    pub fn device_id(&self) -> ObjectId {
        self.read().device_id
    }

    /// Registers an object. A key collision leaves the registry
    /// untouched.
    pub fn add(&self, object: impl Into<BacnetObject>) -> Result<ObjectId, ObjectError> {
        let object = object.into();
        let id = object.object_id();
        let mut inner = self.write();
        if inner.objects.contains_key(&id) {
            return Err(ObjectError::DuplicateObject);
        }
        inner.objects.insert(id, object);
        let device_id = inner.device_id;
        if let Some(BacnetObject::Device(device)) = inner.objects.get_mut(&device_id) {
            device.object_list.push(id);
        }
        Ok(id)
    }

    /// Unregisters an object. The device object refuses removal.
    pub fn remove(&self, id: ObjectId) -> Result<(), ObjectError> {
        let mut inner = self.write();
        if id == inner.device_id {
            return Err(ObjectError::WriteAccessDenied);
        }
        if inner.objects.remove(&id).is_none() {
            return Err(ObjectError::UnknownObject);
        }
        let device_id = inner.device_id;
        if let Some(BacnetObject::Device(device)) = inner.objects.get_mut(&device_id) {
            device.object_list.retain(|&listed| listed != id);
        }
        Ok(())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.read().objects.contains_key(&id)
    }

    /// A snapshot of one object.
    pub fn get(&self, id: ObjectId) -> Option<BacnetObject> {
        self.read().objects.get(&id).cloned()
    }

    /// Registered object ids, in no particular order.
    pub fn list(&self) -> Vec<ObjectId> {
        self.read().objects.keys().copied().collect()
    }

    pub fn read_property(
        &self,
        id: ObjectId,
        property: PropertyId,
        array_index: Option<u32>,
    ) -> Result<PropertyValue, ObjectError> {
        self.read()
            .objects
            .get(&id)
            .ok_or(ObjectError::UnknownObject)?
            .read_property(property, array_index)
    }

    pub fn write_property(
        &self,
        id: ObjectId,
        property: PropertyId,
        write: PropertyWrite,
    ) -> Result<(), ObjectError> {
        self.write()
            .objects
            .get_mut(&id)
            .ok_or(ObjectError::UnknownObject)?
            .write_property(property, write)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::ObjectRegistry;
    use crate::object::{AnalogInput, DeviceObject, ObjectError, PropertyWrite};
    use crate::value::PropertyValue;
    use bacstack_core::types::{ObjectId, ObjectType, PropertyId};

    fn registry() -> ObjectRegistry {
        ObjectRegistry::new(DeviceObject::new(1234, "plant"))
    }

    #[test]
    fn double_add_fails_and_leaves_state_unchanged() {
        let reg = registry();
        reg.add(AnalogInput::new(1, "oat").with_present_value(7.0))
            .unwrap();
        let err = reg.add(AnalogInput::new(1, "imposter")).unwrap_err();
        assert_eq!(err, ObjectError::DuplicateObject);

        let id = ObjectId::new(ObjectType::AnalogInput, 1);
        assert_eq!(
            reg.read_property(id, PropertyId::ObjectName, None),
            Ok(PropertyValue::CharacterString("oat".into()))
        );
        assert_eq!(
            reg.read_property(reg.device_id(), PropertyId::ObjectList, Some(0)),
            Ok(PropertyValue::Unsigned(2))
        );
    }

    #[test]
    fn double_remove_fails_the_second_time() {
        let reg = registry();
        let id = reg.add(AnalogInput::new(1, "oat")).unwrap();
        reg.remove(id).unwrap();
        assert_eq!(reg.remove(id), Err(ObjectError::UnknownObject));
        assert_eq!(
            reg.read_property(reg.device_id(), PropertyId::ObjectList, Some(0)),
            Ok(PropertyValue::Unsigned(1))
        );
    }

    #[test]
    fn the_device_object_cannot_be_removed() {
        let reg = registry();
        assert_eq!(
            reg.remove(reg.device_id()),
            Err(ObjectError::WriteAccessDenied)
        );
    }

    #[test]
    fn missing_objects_read_as_unknown_object() {
        let reg = registry();
        let ghost = ObjectId::new(ObjectType::AnalogInput, 9);
        assert_eq!(
            reg.read_property(ghost, PropertyId::PresentValue, None),
            Err(ObjectError::UnknownObject)
        );
        assert_eq!(
            reg.write_property(
                ghost,
                PropertyId::PresentValue,
                PropertyWrite::value(PropertyValue::Real(1.0)),
            ),
            Err(ObjectError::UnknownObject)
        );
    }

    #[test]
    fn object_list_tracks_membership() {
        let reg = registry();
        let a = reg.add(AnalogInput::new(1, "a")).unwrap();
        let b = reg.add(AnalogInput::new(2, "b")).unwrap();
        assert!(reg.contains(a) && reg.contains(b));
        assert_eq!(reg.list().len(), 3);

        reg.remove(a).unwrap();
        match reg.read_property(reg.device_id(), PropertyId::ObjectList, None) {
            Ok(PropertyValue::Array(items)) => {
                assert_eq!(items.len(), 2);
                assert!(!items.contains(&PropertyValue::ObjectId(a)));
            }
            other => panic!("unexpected object list: {other:?}"),
        }
    }
}
