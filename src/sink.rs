//! Destinations for synthesized frames.

pub mod packet_sink;

pub use packet_sink::{FrameTransmitter, PacketSink, SharedCapture, SharedTransmitter};
