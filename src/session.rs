//! Per-direction state of a logged connection.
//!
//! A logged TCP connection is modelled as two [`PacketContext`] values, one per
//! direction. Each context carries the endpoints, the running
//! sequence/acknowledgment counters and the link-layer addresses needed to
//! synthesize that side's frames.

pub mod context;
pub mod types;

pub use context::PacketContext;
pub use types::{AddressFamily, Direction, MacAddr, TcpFlags};
