/// Borrowed bit string.
pub mod bit_string;
/// Zero-copy application-layer values.
pub mod data_value;
/// BACnet date and time, with unspecified-field wildcards.
pub mod date_time;
/// Packed object identifier (type + instance).
pub mod object_id;
/// Object type enumeration.
pub mod object_type;
/// Property identifier enumeration.
pub mod property_id;
/// Protocol enumerations: segmentation, max APDU, error/reject/abort codes.
pub mod protocol;

pub use bit_string::BitString;
pub use data_value::DataValue;
pub use date_time::{Date, Time};
pub use object_id::ObjectId;
pub use object_type::ObjectType;
pub use property_id::PropertyId;
pub use protocol::{
    AbortReason, ErrorClass, ErrorCode, MaxApdu, RejectReason, Segmentation,
};
