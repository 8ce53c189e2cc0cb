//! BACnet data links.
//!
//! The [`DataLink`] trait is the seam between the protocol stack and a
//! physical link: implementations deliver NPDU images with an
//! identifying source address and accept NPDU images to transmit. The
//! BACnet/IP link over UDP lives in [`bip`]; an MS/TP link (different
//! framing below the NPDU, same contract above it) would implement the
//! same trait.

#![allow(async_fn_in_trait)]

pub mod address;
pub mod bip;
pub mod traits;

pub use address::LinkAddress;
pub use bip::transport::BipTransport;
pub use traits::{DataLink, DataLinkError};
