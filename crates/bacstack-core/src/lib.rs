//! BACnet wire encoding and decoding in pure Rust.
//!
//! `bacstack-core` implements the three stacked BACnet framings — the
//! network PDU, the application PDU, and the tagged primitive encoding
//! used for service parameters — as zero-copy codecs over byte slices.
//! It has no I/O and no async; the datalink and device crates build the
//! running stack on top of it.
//!
//! The crate is `no_std` compatible (it always requires `alloc`); the
//! **`std`** feature (default) only adds `std::error::Error`
//! implementations for the error types.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// APDU headers for the eight BACnet PDU types.
pub mod apdu;
/// Tag system, primitive codecs, and the byte-slice reader/writer.
pub mod encoding;
/// Encode and decode error types.
pub mod error;
/// NPDU (network layer) header codec.
pub mod npdu;
/// Service request and acknowledgement codecs.
pub mod services;
/// Core data types: object identifiers, property identifiers, values.
pub mod types;

pub use error::{DecodeError, EncodeError};
