/// BVLC header codec.
pub mod bvlc;
/// The UDP transport.
pub mod transport;
