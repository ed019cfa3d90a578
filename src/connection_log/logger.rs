use std::fs::File;

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::Rng;
use uuid::Uuid;

use crate::capture_file::CaptureHandle;
use crate::error_handling::types::{LogError, PacketError};
use crate::session::{Direction, MacAddr, PacketContext, TcpFlags};
use crate::synthesis::PacketWriter;

/// Source address of client frames written to capture files.
pub const CLIENT_HW_ADDR: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
/// Source address of server frames written to capture files.
pub const SERVER_HW_ADDR: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);

/// Synthetic packet log of one TCP connection toward one sink.
///
/// Holds both directions' contexts. The first failure is logged, returned to
/// the caller and disables the log; every later call does nothing and
/// returns `Ok(())`, so that a broken capture never interrupts the
/// connection being observed.
pub struct ConnectionLog<H: CaptureHandle = File, R: Rng = StdRng> {
    id: Uuid,
    client: PacketContext,
    server: PacketContext,
    writer: PacketWriter<H, R>,
    disabled: bool,
}

impl<H: CaptureHandle, R: Rng> ConnectionLog<H, R> {
    /// `client` describes the client-to-server direction; the server side is
    /// derived from it.
    pub fn new(id: Uuid, client: PacketContext, writer: PacketWriter<H, R>) -> Self {
        let server = client.peer();
        debug!(
            "[{}] Connection log created for {}:{} -> {}:{}",
            id,
            client.src_ip(),
            client.src_port,
            client.dst_ip(),
            client.dst_port
        );
        Self {
            id,
            client,
            server,
            writer,
            disabled: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn client(&self) -> &PacketContext {
        &self.client
    }

    pub fn server(&self) -> &PacketContext {
        &self.server
    }

    pub(crate) fn server_mut(&mut self) -> &mut PacketContext {
        &mut self.server
    }

    pub fn writer(&self) -> &PacketWriter<H, R> {
        &self.writer
    }

    /// Writes the three-way handshake establishing the connection.
    pub fn open(&mut self) -> Result<(), LogError> {
        self.guard("handshake", |log| {
            let Self {
                client,
                server,
                writer,
                ..
            } = log;

            writer.write_packet(client, TcpFlags::SYN, &[])?;
            client.sequence = client.sequence.wrapping_add(1);
            server.acknowledgment = client.sequence;

            writer.write_packet(server, TcpFlags::SYN | TcpFlags::ACK, &[])?;
            server.sequence = server.sequence.wrapping_add(1);
            client.acknowledgment = server.sequence;

            writer.write_packet(client, TcpFlags::ACK, &[])
        })?;
        if !self.disabled {
            info!("[{}] Connection established", self.id);
        }
        Ok(())
    }

    /// Writes `payload` as sent in `direction`, followed by the receiver's
    /// acknowledgment.
    pub fn log_payload(&mut self, direction: Direction, payload: &[u8]) -> Result<(), LogError> {
        self.guard("payload", |log| {
            let (sender, receiver) = sides(&mut log.client, &mut log.server, direction);
            log.writer
                .write_payload(sender, receiver, TcpFlags::PSH | TcpFlags::ACK, payload)
        })
    }

    /// Writes the FIN exchange, started by the side sending in `initiator`.
    pub fn close(&mut self, initiator: Direction) -> Result<(), LogError> {
        self.guard("teardown", |log| {
            let (first, second) = sides(&mut log.client, &mut log.server, initiator);
            let writer = &mut log.writer;

            writer.write_packet(first, TcpFlags::FIN | TcpFlags::ACK, &[])?;
            first.sequence = first.sequence.wrapping_add(1);
            second.acknowledgment = first.sequence;

            writer.write_packet(second, TcpFlags::FIN | TcpFlags::ACK, &[])?;
            second.sequence = second.sequence.wrapping_add(1);
            first.acknowledgment = second.sequence;

            writer.write_packet(first, TcpFlags::ACK, &[])
        })?;
        if !self.disabled {
            info!("[{}] Connection closed", self.id);
        }
        Ok(())
    }

    fn guard<F>(&mut self, what: &str, op: F) -> Result<(), LogError>
    where
        F: FnOnce(&mut Self) -> Result<(), PacketError>,
    {
        if self.disabled {
            return Ok(());
        }
        op(self).map_err(|e| {
            error!("[{}] Disabling connection log after {} failure: {}", self.id, what, e);
            self.disabled = true;
            LogError::from(e)
        })
    }
}

fn sides<'a>(
    client: &'a mut PacketContext,
    server: &'a mut PacketContext,
    direction: Direction,
) -> (&'a mut PacketContext, &'a mut PacketContext) {
    match direction {
        Direction::ClientToServer => (client, server),
        Direction::ServerToClient => (server, client),
    }
}
