use std::fs::File;
use std::sync::{Arc, Mutex};

use log::trace;

use crate::capture_file::{CaptureFile, CaptureHandle};
use crate::error_handling::types::{DispatchError, NetworkError};

/// A capture file that several connection logs append to.
pub type SharedCapture<H = File> = Arc<Mutex<CaptureFile<H>>>;

/// A live link shared by every connection replayed to a mirror target.
pub type SharedTransmitter = Arc<Mutex<dyn FrameTransmitter>>;

/// Puts a complete Ethernet frame on the wire.
pub trait FrameTransmitter: Send {
    fn transmit(&mut self, frame: &[u8]) -> Result<(), NetworkError>;
}

/// Where the frames of one logged connection go.
///
/// Selected once when a connection starts being logged. Each variant holds a
/// lock around its backend so that appends or transmissions from different
/// connections never interleave within a frame.
pub enum PacketSink<H: CaptureHandle = File> {
    File(SharedCapture<H>),
    Live(SharedTransmitter),
}

impl<H: CaptureHandle> PacketSink<H> {
    pub fn file(capture: CaptureFile<H>) -> Self {
        PacketSink::File(Arc::new(Mutex::new(capture)))
    }

    pub fn live<T: FrameTransmitter + 'static>(transmitter: T) -> Self {
        let shared: SharedTransmitter = Arc::new(Mutex::new(transmitter));
        PacketSink::Live(shared)
    }

    /// Hands `frame` to the backend. The frame is consumed either way; there
    /// is no read-back beyond the returned status.
    pub fn dispatch(&self, frame: Vec<u8>) -> Result<(), DispatchError> {
        match self {
            PacketSink::File(capture) => {
                let mut capture = capture.lock().map_err(|_| DispatchError::SinkPoisoned)?;
                capture.append(&frame)?;
            }
            PacketSink::Live(link) => {
                let mut link = link.lock().map_err(|_| DispatchError::SinkPoisoned)?;
                link.transmit(&frame)?;
            }
        }
        trace!("Dispatched frame of {} bytes", frame.len());
        Ok(())
    }

    pub fn is_live(&self) -> bool {
        matches!(self, PacketSink::Live(_))
    }
}

// Manual impl: cloning shares the backend and must not require `H: Clone`.
impl<H: CaptureHandle> Clone for PacketSink<H> {
    fn clone(&self) -> Self {
        match self {
            PacketSink::File(capture) => PacketSink::File(Arc::clone(capture)),
            PacketSink::Live(link) => PacketSink::Live(Arc::clone(link)),
        }
    }
}
