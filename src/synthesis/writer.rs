use std::fs::File;

use log::{trace, warn};
use rand::rngs::StdRng;
use rand::Rng;

use super::synthesizer::PacketSynthesizer;
use crate::capture_file::CaptureHandle;
use crate::error_handling::types::PacketError;
use crate::session::{PacketContext, TcpFlags};
use crate::sink::PacketSink;

/// Largest payload placed in a single segment, keeping frames under a
/// 1500 byte Ethernet MTU after header overhead.
pub const MSS: usize = 1420;

/// Synthesizes frames and hands each one to a [`PacketSink`].
pub struct PacketWriter<H: CaptureHandle = File, R: Rng = StdRng> {
    synthesizer: PacketSynthesizer<R>,
    sink: PacketSink<H>,
}

impl<H: CaptureHandle> PacketWriter<H, StdRng> {
    pub fn new(sink: PacketSink<H>) -> Self {
        Self::with_synthesizer(sink, PacketSynthesizer::new())
    }
}

impl<H: CaptureHandle, R: Rng> PacketWriter<H, R> {
    pub fn with_synthesizer(sink: PacketSink<H>, synthesizer: PacketSynthesizer<R>) -> Self {
        Self { synthesizer, sink }
    }

    /// Synthesizes a single frame from `ctx` and dispatches it.
    pub fn write_packet(
        &mut self,
        ctx: &mut PacketContext,
        flags: TcpFlags,
        payload: &[u8],
    ) -> Result<(), PacketError> {
        let frame = self.synthesizer.synthesize(ctx, flags, payload)?;
        self.sink.dispatch(frame).map_err(|e| {
            warn!("Failed to write packet: {}", e);
            PacketError::from(e)
        })
    }

    /// Logs `payload` as sent from `sender` to `receiver`.
    ///
    /// The payload is cut into segments of at most [`MSS`] bytes, each sent
    /// from `sender` with `flags`; `receiver.acknowledgment` advances by each
    /// segment's length once it has been dispatched. A single pure `ACK` from
    /// `receiver` closes the exchange, also for an empty payload.
    ///
    /// Stops at the first failure. Segments dispatched before it stay in the
    /// sink.
    pub fn write_payload(
        &mut self,
        sender: &mut PacketContext,
        receiver: &mut PacketContext,
        flags: TcpFlags,
        payload: &[u8],
    ) -> Result<(), PacketError> {
        for chunk in payload.chunks(MSS) {
            self.write_packet(sender, flags, chunk)?;
            receiver.acknowledgment = receiver.acknowledgment.wrapping_add(chunk.len() as u32);
        }

        self.write_packet(receiver, TcpFlags::ACK, &[])?;
        trace!(
            "Wrote {} payload bytes in {} segments",
            payload.len(),
            payload.len().div_ceil(MSS)
        );
        Ok(())
    }

    pub fn sink(&self) -> &PacketSink<H> {
        &self.sink
    }
}
