use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

use super::logger::{ConnectionLog, CLIENT_HW_ADDR, SERVER_HW_ADDR};
use crate::capture_file::CaptureFile;
use crate::configuration::Config;
use crate::error_handling::types::LogError;
use crate::mirror::MirrorEndpoint;
use crate::session::PacketContext;
use crate::sink::{FrameTransmitter, PacketSink, SharedCapture, SharedTransmitter};
use crate::synthesis::PacketWriter;

/// The configured destinations of connection logs.
///
/// The shared capture file and the mirror link are opened once and shared
/// by every connection; per-connection files are created on demand.
pub struct LogTargets {
    shared: Option<SharedCapture>,
    directory: Option<PathBuf>,
    mirror: Option<(MirrorEndpoint, SharedTransmitter)>,
}

impl LogTargets {
    /// Opens the capture targets named in `config`.
    ///
    /// The mirror is not resolved here; attach it with
    /// [`LogTargets::with_mirror`] once its address is known.
    pub fn from_config(config: &Config) -> Result<Self, LogError> {
        let shared = match &config.capture.file {
            Some(path) => Some(Arc::new(Mutex::new(CaptureFile::open_path(path)?))),
            None => None,
        };
        Ok(Self {
            shared,
            directory: config.capture.directory.clone(),
            mirror: None,
        })
    }

    pub fn with_mirror<T: FrameTransmitter + 'static>(
        mut self,
        endpoint: MirrorEndpoint,
        transmitter: T,
    ) -> Self {
        info!(
            "Replaying connections to mirror {} ({})",
            endpoint.target_ip, endpoint.target_hw_addr
        );
        let link: SharedTransmitter = Arc::new(Mutex::new(transmitter));
        self.mirror = Some((endpoint, link));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.shared.is_none() && self.directory.is_none() && self.mirror.is_none()
    }

    /// Returns one unopened [`ConnectionLog`] per active target for a new
    /// connection from `client` to `server`.
    pub fn open_connection(
        &self,
        client: SocketAddr,
        server: SocketAddr,
    ) -> Result<Vec<ConnectionLog>, LogError> {
        let id = Uuid::new_v4();
        let mut file_ctx = PacketContext::new(client, server)?;
        file_ctx.src_hw_addr = CLIENT_HW_ADDR;
        file_ctx.dst_hw_addr = SERVER_HW_ADDR;

        let mut logs = Vec::new();
        if let Some(shared) = &self.shared {
            let sink = PacketSink::File(Arc::clone(shared));
            logs.push(ConnectionLog::new(id, file_ctx.clone(), PacketWriter::new(sink)));
        }

        if let Some(directory) = &self.directory {
            let path = directory.join(connection_file_name(Utc::now(), client, server, id));
            let capture = CaptureFile::open_path(&path)?;
            logs.push(ConnectionLog::new(
                id,
                file_ctx.clone(),
                PacketWriter::new(PacketSink::file(capture)),
            ));
        }

        if let Some((endpoint, link)) = &self.mirror {
            let mut mirror_ctx = PacketContext::new(client, server)?;
            mirror_ctx.src_hw_addr = endpoint.local_hw_addr;
            mirror_ctx.dst_hw_addr = endpoint.target_hw_addr;
            let sink = PacketSink::Live(Arc::clone(link));
            let mut log = ConnectionLog::new(id, mirror_ctx, PacketWriter::new(sink));
            // Both directions travel from the local interface to the mirror.
            log.server_mut().src_hw_addr = endpoint.local_hw_addr;
            log.server_mut().dst_hw_addr = endpoint.target_hw_addr;
            logs.push(log);
        }

        debug!("[{}] Opened {} connection logs", id, logs.len());
        Ok(logs)
    }
}

/// `<UTC time>-<client>,<port>-<server>,<port>-<id>.pcap`
fn connection_file_name(
    now: DateTime<Utc>,
    client: SocketAddr,
    server: SocketAddr,
    id: Uuid,
) -> PathBuf {
    PathBuf::from(format!(
        "{}-{},{}-{},{}-{}.pcap",
        now.format("%Y%m%dT%H%M%SZ"),
        client.ip(),
        client.port(),
        server.ip(),
        server.port(),
        id
    ))
}
