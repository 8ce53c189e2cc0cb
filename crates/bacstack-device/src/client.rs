//! Client-side property services over the driver.

use crate::driver::{Driver, ServiceReply};
use crate::error::DeviceError;
use crate::value::PropertyValue;
use bacstack_core::encoding::reader::Reader;
use bacstack_core::services::{
    ReadPropertyAck, ReadPropertyRequest, WritePropertyRequest, SERVICE_READ_PROPERTY,
    SERVICE_WRITE_PROPERTY,
};
use bacstack_core::types::{ObjectId, PropertyId};
use bacstack_datalink::LinkAddress;
use std::future::Future;
use std::time::Duration;

pub(crate) async fn read_property(
    driver: &Driver,
    peer: LinkAddress,
    object_id: ObjectId,
    property_id: PropertyId,
    array_index: Option<u32>,
    timeout: Option<Duration>,
    cancel: impl Future<Output = ()>,
) -> Result<PropertyValue, DeviceError> {
    let request = ReadPropertyRequest {
        object_id,
        property_id,
        array_index,
    };
    let reply = driver
        .request(
            peer,
            SERVICE_READ_PROPERTY,
            &|w| request.encode(w),
            timeout,
            cancel,
        )
        .await?;

    match reply {
        ServiceReply::ComplexAck(payload) => {
            let mut r = Reader::new(&payload);
            let ack = ReadPropertyAck::decode(&mut r)?;
            if ack.object_id != object_id || ack.property_id != property_id {
                return Err(DeviceError::UnsupportedResponse);
            }
            PropertyValue::from_wire_sequence(&ack.values).ok_or(DeviceError::UnsupportedResponse)
        }
        other => Err(reply_error(other, SERVICE_READ_PROPERTY)),
    }
}

pub(crate) async fn write_property(
    driver: &Driver,
    peer: LinkAddress,
    object_id: ObjectId,
    property_id: PropertyId,
    value: &PropertyValue,
    array_index: Option<u32>,
    priority: Option<u8>,
    timeout: Option<Duration>,
    cancel: impl Future<Output = ()>,
) -> Result<(), DeviceError> {
    let request = WritePropertyRequest {
        object_id,
        property_id,
        array_index,
        values: value.wire_values(),
        priority,
    };
    let reply = driver
        .request(
            peer,
            SERVICE_WRITE_PROPERTY,
            &|w| request.encode(w),
            timeout,
            cancel,
        )
        .await?;

    match reply {
        ServiceReply::SimpleAck => Ok(()),
        other => Err(reply_error(other, SERVICE_WRITE_PROPERTY)),
    }
}

/// Folds a non-success reply into the matching [`DeviceError`].
fn reply_error(reply: ServiceReply, service_choice: u8) -> DeviceError {
    match reply {
        ServiceReply::Error {
            invoke_id,
            error_class,
            error_code,
        } => DeviceError::Remote {
            service_choice,
            invoke_id,
            error_class,
            error_code,
        },
        ServiceReply::Reject { reason } => DeviceError::RemoteReject { reason },
        ServiceReply::Abort { reason, server } => DeviceError::RemoteAbort { reason, server },
        ServiceReply::SimpleAck | ServiceReply::ComplexAck(_) | ServiceReply::Segmented => {
            DeviceError::UnsupportedResponse
        }
    }
}
