//! BACnet Virtual Link Control: the four-octet envelope at the front of
//! every BACnet/IP datagram.

use bacstack_core::encoding::{reader::Reader, writer::Writer};
use bacstack_core::{DecodeError, EncodeError};

/// Link type octet for BACnet/IP.
pub const BVLC_TYPE_BIP: u8 = 0x81;

/// Octets of the header itself: type, function, two length bytes.
pub const BVLC_HEADER_LEN: usize = 4;

/// BVLC function codes.
///
/// The full table decodes so captures and foreign traffic stay
/// identifiable; the transport only originates the two `Original*`
/// functions and only consumes those plus [`ForwardedNpdu`](Self::ForwardedNpdu).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvlcFunction {
    Result,
    WriteBroadcastDistributionTable,
    ReadBroadcastDistributionTable,
    ReadBroadcastDistributionTableAck,
    ForwardedNpdu,
    RegisterForeignDevice,
    ReadForeignDeviceTable,
    ReadForeignDeviceTableAck,
    DeleteForeignDeviceTableEntry,
    DistributeBroadcastToNetwork,
    OriginalUnicastNpdu,
    OriginalBroadcastNpdu,
    Unknown(u8),
}

impl BvlcFunction {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Result,
            0x01 => Self::WriteBroadcastDistributionTable,
            0x02 => Self::ReadBroadcastDistributionTable,
            0x03 => Self::ReadBroadcastDistributionTableAck,
            0x04 => Self::ForwardedNpdu,
            0x05 => Self::RegisterForeignDevice,
            0x06 => Self::ReadForeignDeviceTable,
            0x07 => Self::ReadForeignDeviceTableAck,
            0x08 => Self::DeleteForeignDeviceTableEntry,
            0x09 => Self::DistributeBroadcastToNetwork,
            0x0A => Self::OriginalUnicastNpdu,
            0x0B => Self::OriginalBroadcastNpdu,
            v => Self::Unknown(v),
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Result => 0x00,
            Self::WriteBroadcastDistributionTable => 0x01,
            Self::ReadBroadcastDistributionTable => 0x02,
            Self::ReadBroadcastDistributionTableAck => 0x03,
            Self::ForwardedNpdu => 0x04,
            Self::RegisterForeignDevice => 0x05,
            Self::ReadForeignDeviceTable => 0x06,
            Self::ReadForeignDeviceTableAck => 0x07,
            Self::DeleteForeignDeviceTableEntry => 0x08,
            Self::DistributeBroadcastToNetwork => 0x09,
            Self::OriginalUnicastNpdu => 0x0A,
            Self::OriginalBroadcastNpdu => 0x0B,
            Self::Unknown(v) => v,
        }
    }
}

/// The BVLC envelope: function and the total frame length, header
/// included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvlcHeader {
    pub function: BvlcFunction,
    pub length: u16,
}

impl BvlcHeader {
    /// Header for a frame whose payload is `payload_len` bytes.
    pub fn for_payload(function: BvlcFunction, payload_len: usize) -> Result<Self, EncodeError> {
        let length = payload_len
            .checked_add(BVLC_HEADER_LEN)
            .and_then(|total| u16::try_from(total).ok())
            .ok_or(EncodeError::ValueOutOfRange)?;
        Ok(Self { function, length })
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(BVLC_TYPE_BIP)?;
        w.write_u8(self.function.to_u8())?;
        w.write_be_u16(self.length)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != BVLC_TYPE_BIP {
            return Err(DecodeError::WrongLinkType);
        }
        let function = BvlcFunction::from_u8(r.read_u8()?);
        let length = r.read_be_u16()?;
        if usize::from(length) < BVLC_HEADER_LEN {
            return Err(DecodeError::InvalidLength);
        }
        Ok(Self { function, length })
    }

    /// Decodes the header of a complete datagram and checks the declared
    /// length against what actually arrived.
    pub fn decode_exact(r: &mut Reader<'_>, datagram_len: usize) -> Result<Self, DecodeError> {
        let header = Self::decode(r)?;
        if usize::from(header.length) != datagram_len {
            return Err(DecodeError::InvalidLength);
        }
        Ok(header)
    }

    pub const fn payload_len(&self) -> usize {
        self.length as usize - BVLC_HEADER_LEN
    }
}
