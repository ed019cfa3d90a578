//! Capture-file container.
//!
//! Frames synthesized for a logged connection are persisted in the classic
//! libpcap file format so that standard packet-capture tooling can open them.
//! [`CaptureFile`] decides whether an existing file can be appended to, resets
//! foreign content, and appends one record per frame.

pub mod container;

pub use container::{CaptureFile, CaptureHandle, GlobalHeader, RecordHeader, PCAP_MAGIC};
