//! Server-side request handling.
//!
//! Pure functions from a decoded request to reply APDU bytes, so the
//! dispatch loop stays a thin shell and every reply path is testable
//! without a socket.

use crate::config::DeviceConfig;
use crate::object::{ObjectError, ObjectRegistry, PropertyWrite};
use crate::value::PropertyValue;
use bacstack_core::apdu::{
    ComplexAckHeader, ConfirmedRequestHeader, ErrorPdu, RejectPdu, SimpleAck,
};
use bacstack_core::encoding::{reader::Reader, writer::Writer};
use bacstack_core::services::{
    IAmRequest, ReadPropertyAck, ReadPropertyRequest, WhoIsRequest, WritePropertyRequest,
    SERVICE_I_AM, SERVICE_READ_PROPERTY, SERVICE_WRITE_PROPERTY,
};
use bacstack_core::types::{
    ErrorClass, ErrorCode, ObjectId, ObjectType, RejectReason, Segmentation,
};
use bacstack_core::{DecodeError, EncodeError};
use bacstack_datalink::bip::transport::MAX_FRAME_LEN;

/// What the local device advertises about itself.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LocalIdentity {
    pub device_id: ObjectId,
    pub max_apdu: u32,
    pub segmentation: Segmentation,
    pub vendor_id: u32,
}

impl LocalIdentity {
    pub(crate) fn from_config(config: &DeviceConfig) -> Self {
        Self {
            device_id: ObjectId::new(ObjectType::Device, config.instance),
            max_apdu: u32::from(config.max_apdu.octets()),
            segmentation: config.segmentation,
            vendor_id: config.vendor_id,
        }
    }

    pub(crate) fn i_am(&self) -> IAmRequest {
        IAmRequest {
            device_id: self.device_id,
            max_apdu: self.max_apdu,
            segmentation: self.segmentation,
            vendor_id: self.vendor_id,
        }
    }
}

/// Answers a Who-Is whose parameters follow in `r`: the local I-Am when
/// the range covers this device, nothing otherwise.
pub(crate) fn answer_who_is(
    identity: &LocalIdentity,
    r: &mut Reader<'_>,
) -> Result<Option<Vec<u8>>, crate::error::DeviceError> {
    let who_is = WhoIsRequest::decode(r)?;
    if !who_is.matches(identity.device_id.instance()) {
        return Ok(None);
    }
    let apdu = encode_apdu(|w| {
        bacstack_core::apdu::UnconfirmedRequestHeader {
            service_choice: SERVICE_I_AM,
        }
        .encode(w)?;
        identity.i_am().encode(w)
    })?;
    Ok(Some(apdu))
}

/// Executes one confirmed request against the registry and builds the
/// reply APDU. Always produces *some* reply; protocol-level failures
/// become Error or Reject PDUs rather than silence.
pub(crate) fn answer_confirmed(
    registry: &ObjectRegistry,
    header: &ConfirmedRequestHeader,
    params: &mut Reader<'_>,
) -> Vec<u8> {
    let invoke_id = header.invoke_id;

    // Segmented requests are refused outright; the flag bits are
    // decoded but nothing reassembles them.
    if header.segmented || header.more_follows {
        return error_reply(
            invoke_id,
            header.service_choice,
            ErrorClass::Services,
            ErrorCode::OptionalFunctionalityNotSupported,
        );
    }

    match header.service_choice {
        SERVICE_READ_PROPERTY => match ReadPropertyRequest::decode(params) {
            Ok(request) => answer_read_property(registry, invoke_id, &request),
            Err(err) => reject_reply(invoke_id, reject_reason(err)),
        },
        SERVICE_WRITE_PROPERTY => match WritePropertyRequest::decode(params) {
            Ok(request) => answer_write_property(registry, invoke_id, &request),
            Err(err) => reject_reply(invoke_id, reject_reason(err)),
        },
        _ => reject_reply(invoke_id, RejectReason::UnrecognizedService),
    }
}

fn answer_read_property(
    registry: &ObjectRegistry,
    invoke_id: u8,
    request: &ReadPropertyRequest,
) -> Vec<u8> {
    match registry.read_property(request.object_id, request.property_id, request.array_index) {
        Ok(value) => {
            let ack = ReadPropertyAck {
                object_id: request.object_id,
                property_id: request.property_id,
                array_index: request.array_index,
                values: value.wire_values(),
            };
            encode_apdu(|w| {
                ComplexAckHeader::unsegmented(invoke_id, SERVICE_READ_PROPERTY).encode(w)?;
                ack.encode(w)
            })
            .unwrap_or_else(|_| {
                error_reply(
                    invoke_id,
                    SERVICE_READ_PROPERTY,
                    ErrorClass::Resources,
                    ErrorCode::Other,
                )
            })
        }
        Err(err) => object_error_reply(invoke_id, SERVICE_READ_PROPERTY, err),
    }
}

fn answer_write_property(
    registry: &ObjectRegistry,
    invoke_id: u8,
    request: &WritePropertyRequest<'_>,
) -> Vec<u8> {
    let Some(value) = PropertyValue::from_wire_sequence(&request.values) else {
        return object_error_reply(invoke_id, SERVICE_WRITE_PROPERTY, ObjectError::InvalidDataType);
    };
    let write = PropertyWrite {
        value,
        array_index: request.array_index,
        priority: request.priority,
    };
    match registry.write_property(request.object_id, request.property_id, write) {
        Ok(()) => encode_apdu(|w| {
            SimpleAck {
                invoke_id,
                service_choice: SERVICE_WRITE_PROPERTY,
            }
            .encode(w)
        })
        .expect("a simple ack always fits"),
        Err(err) => object_error_reply(invoke_id, SERVICE_WRITE_PROPERTY, err),
    }
}

fn object_error_reply(invoke_id: u8, service_choice: u8, err: ObjectError) -> Vec<u8> {
    let (class, code) = err.class_code();
    error_reply(invoke_id, service_choice, class, code)
}

fn error_reply(invoke_id: u8, service_choice: u8, class: ErrorClass, code: ErrorCode) -> Vec<u8> {
    encode_apdu(|w| ErrorPdu::new(invoke_id, service_choice, class, code).encode(w))
        .expect("an error reply always fits")
}

fn reject_reply(invoke_id: u8, reason: RejectReason) -> Vec<u8> {
    encode_apdu(|w| RejectPdu::new(invoke_id, reason).encode(w))
        .expect("a reject reply always fits")
}

fn reject_reason(err: DecodeError) -> RejectReason {
    match err {
        DecodeError::InvalidTag | DecodeError::ReservedBits => RejectReason::InvalidTag,
        DecodeError::UnexpectedEof => RejectReason::MissingRequiredParameter,
        DecodeError::InvalidValue => RejectReason::ParameterOutOfRange,
        DecodeError::InvalidLength => RejectReason::InvalidParameterDataType,
        _ => RejectReason::Other,
    }
}

fn encode_apdu(
    build: impl Fn(&mut Writer<'_>) -> Result<(), EncodeError>,
) -> Result<Vec<u8>, EncodeError> {
    let mut buf = [0u8; MAX_FRAME_LEN];
    let mut w = Writer::new(&mut buf);
    build(&mut w)?;
    Ok(w.as_written().to_vec())
}
