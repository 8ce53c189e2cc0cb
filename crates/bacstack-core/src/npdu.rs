//! NPDU header: protocol version, control octet, optional routing
//! (destination/source network + MAC), hop count, and the network-layer
//! message fields that replace application data when control bit 7 is
//! set.

use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

/// The only NPDU protocol version ever published.
pub const NPDU_VERSION: u8 = 0x01;

/// Control-octet bits.
pub const CONTROL_NETWORK_MESSAGE: u8 = 0x80;
pub const CONTROL_DESTINATION: u8 = 0x20;
pub const CONTROL_SOURCE: u8 = 0x08;
pub const CONTROL_EXPECTING_REPLY: u8 = 0x04;
/// Bits 6 and 4 are reserved and must be zero.
const CONTROL_RESERVED: u8 = 0x50;

/// Network priority carried in control bits 1..0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Priority {
    #[default]
    Normal = 0,
    Urgent = 1,
    Critical = 2,
    LifeSafety = 3,
}

/// Routed address: destination or source network number plus MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkAddress {
    pub network: u16,
    pub mac: [u8; 6],
    pub mac_len: u8,
}

impl NetworkAddress {
    /// The broadcast DNET with a zero-length MAC.
    pub const GLOBAL_BROADCAST: Self = Self {
        network: 0xFFFF,
        mac: [0; 6],
        mac_len: 0,
    };
}

/// A decoded or to-be-encoded NPDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Npdu {
    pub control: u8,
    pub destination: Option<NetworkAddress>,
    pub source: Option<NetworkAddress>,
    pub hop_count: Option<u8>,
    pub message_type: Option<u8>,
    pub vendor_id: Option<u16>,
}

impl Npdu {
    /// Header for a locally delivered application PDU.
    pub const fn application() -> Self {
        Self {
            control: 0,
            destination: None,
            source: None,
            hop_count: None,
            message_type: None,
            vendor_id: None,
        }
    }

    /// Header for a confirmed request awaiting a reply.
    pub const fn expecting_reply() -> Self {
        let mut npdu = Self::application();
        npdu.control = CONTROL_EXPECTING_REPLY;
        npdu
    }

    pub const fn is_network_message(&self) -> bool {
        self.control & CONTROL_NETWORK_MESSAGE != 0
    }

    pub const fn expects_reply(&self) -> bool {
        self.control & CONTROL_EXPECTING_REPLY != 0
    }

    pub const fn priority(&self) -> Priority {
        match self.control & 0x03 {
            0 => Priority::Normal,
            1 => Priority::Urgent,
            2 => Priority::Critical,
            _ => Priority::LifeSafety,
        }
    }

    /// Encodes the header. The destination/control/hop-count coupling is
    /// derived from the option fields, not the caller's control bits.
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut control = self.control & !(CONTROL_DESTINATION | CONTROL_SOURCE);
        if self.destination.is_some() {
            control |= CONTROL_DESTINATION;
        }
        if self.source.is_some() {
            control |= CONTROL_SOURCE;
        }

        w.write_u8(NPDU_VERSION)?;
        w.write_u8(control)?;
        if let Some(dest) = self.destination {
            encode_network_address(w, dest)?;
        }
        if let Some(src) = self.source {
            encode_network_address(w, src)?;
        }
        if self.destination.is_some() {
            w.write_u8(self.hop_count.unwrap_or(255))?;
        }
        if self.is_network_message() {
            let message_type = self.message_type.unwrap_or(0);
            w.write_u8(message_type)?;
            if message_type >= 0x80 {
                w.write_be_u16(self.vendor_id.unwrap_or(0))?;
            }
        }
        Ok(())
    }

    /// Decodes the header, leaving the reader at the application data
    /// (or at the end for network-layer messages). `r.position()` tells
    /// the caller how many bytes the header took.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != NPDU_VERSION {
            return Err(DecodeError::VersionMismatch);
        }
        let control = r.read_u8()?;
        if control & CONTROL_RESERVED != 0 {
            return Err(DecodeError::ReservedBits);
        }

        let destination = if control & CONTROL_DESTINATION != 0 {
            Some(decode_network_address(r)?)
        } else {
            None
        };
        let source = if control & CONTROL_SOURCE != 0 {
            Some(decode_network_address(r)?)
        } else {
            None
        };
        let hop_count = if destination.is_some() {
            Some(r.read_u8()?)
        } else {
            None
        };

        let (message_type, vendor_id) = if control & CONTROL_NETWORK_MESSAGE != 0 {
            let message_type = r.read_u8()?;
            let vendor_id = if message_type >= 0x80 {
                Some(r.read_be_u16()?)
            } else {
                None
            };
            (Some(message_type), vendor_id)
        } else {
            (None, None)
        };

        Ok(Self {
            control,
            destination,
            source,
            hop_count,
            message_type,
            vendor_id,
        })
    }
}

fn encode_network_address(w: &mut Writer<'_>, addr: NetworkAddress) -> Result<(), EncodeError> {
    if usize::from(addr.mac_len) > addr.mac.len() {
        return Err(EncodeError::InvalidLength);
    }
    w.write_be_u16(addr.network)?;
    w.write_u8(addr.mac_len)?;
    w.write_all(&addr.mac[..usize::from(addr.mac_len)])
}

fn decode_network_address(r: &mut Reader<'_>) -> Result<NetworkAddress, DecodeError> {
    let network = r.read_be_u16()?;
    let mac_len = r.read_u8()?;
    if mac_len > 6 {
        return Err(DecodeError::InvalidLength);
    }
    let mut mac = [0u8; 6];
    mac[..usize::from(mac_len)].copy_from_slice(r.read_exact(usize::from(mac_len))?);
    Ok(NetworkAddress {
        network,
        mac,
        mac_len,
    })
}
