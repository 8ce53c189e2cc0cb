use crate::object::ObjectError;
use bacstack_core::types::{ErrorClass, ErrorCode};
use bacstack_datalink::DataLinkError;
use thiserror::Error;

/// Errors surfaced by device operations.
///
/// `Remote*` variants report what a peer answered; everything else is
/// local. Codec errors on inbound frames never reach here — the receive
/// and dispatch loops log and drop those.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("encode error: {0}")]
    Encode(#[from] bacstack_core::EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] bacstack_core::DecodeError),
    #[error("request timed out")]
    Timeout,
    #[error("request cancelled")]
    Cancelled,
    #[error("driver shut down")]
    Shutdown,
    #[error("all invoke ids in flight")]
    ResourceBusy,
    #[error("object error: {0}")]
    Object(#[from] ObjectError),
    #[error("peer returned error class {error_class:?} code {error_code:?} for service {service_choice} (invoke id {invoke_id})")]
    Remote {
        service_choice: u8,
        invoke_id: u8,
        error_class: Option<u32>,
        error_code: Option<u32>,
    },
    #[error("peer rejected request: reason {reason}")]
    RemoteReject { reason: u8 },
    #[error("peer aborted request: reason {reason} (server={server})")]
    RemoteAbort { reason: u8, server: bool },
    #[error("response was not decodable for the request sent")]
    UnsupportedResponse,
}

impl DeviceError {
    /// Decoded error class of a [`Remote`](Self::Remote) failure.
    pub fn remote_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Remote {
                error_class: Some(raw),
                ..
            } => ErrorClass::from_u32(*raw),
            _ => None,
        }
    }

    /// Decoded error code of a [`Remote`](Self::Remote) failure.
    pub fn remote_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Remote {
                error_code: Some(raw),
                ..
            } => ErrorCode::from_u32(*raw),
            _ => None,
        }
    }
}
