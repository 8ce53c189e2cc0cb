//! The BACnet/IP device runtime.
//!
//! A [`DeviceManager`] binds one UDP socket and runs a complete BACnet
//! device over it: it answers Who-Is, ReadProperty and WriteProperty
//! against an in-memory [`object::ObjectRegistry`], discovers peers
//! with broadcast Who-Is, and issues confirmed requests correlated by
//! invoke id.
//!
//! ```no_run
//! use bacstack_device::{DeviceConfig, DeviceManager};
//! use bacstack_device::object::AnalogInput;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), bacstack_device::DeviceError> {
//! let config = DeviceConfig::new(1234).with_vendor(42, "acme");
//! let (manager, _events) = DeviceManager::start(config).await?;
//! manager.add_object(AnalogInput::new(1, "outside-air-temp").with_limits(-40.0, 140.0))?;
//!
//! let found = manager.discover_devices(Duration::from_secs(5)).await?;
//! println!("{} devices answered", found.len());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod config;
mod driver;
pub mod error;
mod manager;
pub mod object;
mod server;
pub mod value;

pub use config::{BroadcastMode, DeviceConfig};
pub use error::DeviceError;
pub use manager::{DeviceEvent, DeviceManager, DeviceRecord, EventStream};
pub use value::PropertyValue;

pub use bacstack_core::types::{
    ErrorClass, ErrorCode, MaxApdu, ObjectId, ObjectType, PropertyId, Segmentation,
};
pub use bacstack_datalink::LinkAddress;
