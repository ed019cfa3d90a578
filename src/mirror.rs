//! Live replay toward a passive mirror host.
//!
//! Before synthetic frames can be put on the wire, the mirror target's
//! hardware address has to be known. [`MirrorResolver`] broadcasts ARP
//! requests on the mirror interface and waits for a consistent reply, retrying
//! on a fixed schedule.
//!
//! ```text
//! INIT ──▶ REQUEST_SENT ──▶ MATCHED
//!               │  ▲
//!               ▼  │
//!             RETRY ──▶ EXHAUSTED
//! ```
//!
//! The link itself is abstracted by [`LinkLayer`]; with the `live` feature
//! enabled, [`pcap_link::PcapLink`] provides a libpcap-backed implementation.

pub mod arp;
#[cfg(feature = "live")]
pub mod pcap_link;
pub mod resolver;

pub use resolver::{
    resolve_detached, LinkLayer, MirrorEndpoint, MirrorResolver, ResolverPolicy, Sleeper,
    ThreadSleeper,
};
