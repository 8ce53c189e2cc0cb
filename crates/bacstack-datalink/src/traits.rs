use crate::LinkAddress;
use thiserror::Error;

/// Errors surfaced by a data link.
#[derive(Debug, Error)]
pub enum DataLinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame too large for the link")]
    FrameTooLarge,
    #[error("invalid frame")]
    InvalidFrame,
    #[error("unsupported BVLC function 0x{0:02x}")]
    UnsupportedBvlcFunction(u8),
}

/// One BACnet data link.
///
/// A link carries NPDU images: `send`/`broadcast` prepend whatever
/// link-level framing the medium needs, `recv` strips it again and
/// reports the originating [`LinkAddress`]. The service layer never
/// sees link framing, which is what keeps it transport-agnostic.
pub trait DataLink: Send + Sync {
    /// Sends an NPDU image to a single peer.
    async fn send(&self, address: LinkAddress, npdu: &[u8]) -> Result<(), DataLinkError>;

    /// Sends an NPDU image to every peer reachable at the broadcast
    /// `address`.
    async fn broadcast(&self, address: LinkAddress, npdu: &[u8]) -> Result<(), DataLinkError>;

    /// Receives the next NPDU image into `buf`, returning the byte
    /// count and the source address.
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, LinkAddress), DataLinkError>;
}
