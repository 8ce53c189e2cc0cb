//! Owned property values.
//!
//! The wire layer works with borrowed [`DataValue`]s; the object model
//! stores owned [`PropertyValue`]s. `Array` covers the array-typed
//! properties (priority arrays, object lists) whose wire image is a
//! flat sequence of application values.

use bacstack_core::types::{BitString, DataValue, Date, ObjectId, Time};

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Unsigned(u32),
    Signed(i32),
    Real(f32),
    Double(f64),
    OctetString(Vec<u8>),
    CharacterString(String),
    BitString { unused_bits: u8, data: Vec<u8> },
    Enumerated(u32),
    Date(Date),
    Time(Time),
    ObjectId(ObjectId),
    Array(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Owns a decoded wire value. Constructed values have no place in
    /// the property model and map to `None`.
    pub fn from_wire(value: &DataValue<'_>) -> Option<Self> {
        Some(match value {
            DataValue::Null => Self::Null,
            DataValue::Boolean(v) => Self::Boolean(*v),
            DataValue::Unsigned(v) => Self::Unsigned(*v),
            DataValue::Signed(v) => Self::Signed(*v),
            DataValue::Real(v) => Self::Real(*v),
            DataValue::Double(v) => Self::Double(*v),
            DataValue::OctetString(v) => Self::OctetString(v.to_vec()),
            DataValue::CharacterString(v) => Self::CharacterString(v.clone().into_owned()),
            DataValue::BitString(v) => Self::BitString {
                unused_bits: v.unused_bits,
                data: v.data.to_vec(),
            },
            DataValue::Enumerated(v) => Self::Enumerated(*v),
            DataValue::Date(v) => Self::Date(*v),
            DataValue::Time(v) => Self::Time(*v),
            DataValue::ObjectId(v) => Self::ObjectId(*v),
            DataValue::Constructed { .. } => return None,
        })
    }

    /// Owns a decoded value sequence: one value stays scalar, several
    /// become an `Array`.
    pub fn from_wire_sequence(values: &[DataValue<'_>]) -> Option<Self> {
        match values {
            [single] => Self::from_wire(single),
            many => Some(Self::Array(
                many.iter()
                    .map(Self::from_wire)
                    .collect::<Option<Vec<_>>>()?,
            )),
        }
    }

    /// Borrows this value as its wire form. Arrays cannot be borrowed
    /// as one value; see [`wire_values`](Self::wire_values).
    pub fn as_wire(&self) -> Option<DataValue<'_>> {
        Some(match self {
            Self::Null => DataValue::Null,
            Self::Boolean(v) => DataValue::Boolean(*v),
            Self::Unsigned(v) => DataValue::Unsigned(*v),
            Self::Signed(v) => DataValue::Signed(*v),
            Self::Real(v) => DataValue::Real(*v),
            Self::Double(v) => DataValue::Double(*v),
            Self::OctetString(v) => DataValue::OctetString(v),
            Self::CharacterString(v) => DataValue::string(v),
            Self::BitString { unused_bits, data } => {
                DataValue::BitString(BitString::new(*unused_bits, data))
            }
            Self::Enumerated(v) => DataValue::Enumerated(*v),
            Self::Date(v) => DataValue::Date(*v),
            Self::Time(v) => DataValue::Time(*v),
            Self::ObjectId(v) => DataValue::ObjectId(*v),
            Self::Array(_) => return None,
        })
    }

    /// The wire image of this value: one element for scalars, the
    /// element list for arrays.
    pub fn wire_values(&self) -> Vec<DataValue<'_>> {
        match self {
            Self::Array(items) => items.iter().filter_map(|item| item.as_wire()).collect(),
            scalar => scalar.as_wire().into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PropertyValue;
    use bacstack_core::types::DataValue;

    #[test]
    fn scalar_wire_roundtrip() {
        let value = PropertyValue::Real(21.5);
        let wire = value.as_wire().unwrap();
        assert_eq!(PropertyValue::from_wire(&wire), Some(value));
    }

    #[test]
    fn sequences_fold_into_arrays() {
        let wire = [DataValue::Unsigned(1), DataValue::Unsigned(2)];
        let value = PropertyValue::from_wire_sequence(&wire).unwrap();
        assert_eq!(
            value,
            PropertyValue::Array(vec![
                PropertyValue::Unsigned(1),
                PropertyValue::Unsigned(2)
            ])
        );
        assert_eq!(value.wire_values().len(), 2);
    }

    #[test]
    fn constructed_values_are_not_properties() {
        let wire = DataValue::Constructed {
            tag_num: 0,
            values: vec![],
        };
        assert_eq!(PropertyValue::from_wire(&wire), None);
    }
}
