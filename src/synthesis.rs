//! Turning payload bytes into Ethernet/IP/TCP frames.
//!
//! [`PacketSynthesizer`] builds one frame from a [`crate::session::PacketContext`];
//! [`PacketWriter`] splits payloads into MSS-sized segments, dispatches every
//! frame to its sink and keeps both directions' counters in step.

pub mod synthesizer;
pub mod writer;

pub use synthesizer::PacketSynthesizer;
pub use writer::{PacketWriter, MSS};
