use std::net::{IpAddr, Ipv4Addr};

use log::{debug, info};
use pcap::{Active, Capture, Device};

use super::resolver::LinkLayer;
use crate::error_handling::types::NetworkError;
use crate::session::MacAddr;
use crate::sink::FrameTransmitter;

const SNAPLEN: i32 = 100;
const READ_TIMEOUT_MS: i32 = 10;
const ARP_FILTER: &str = "arp";

/// A libpcap handle on the mirror interface, filtered to ARP traffic.
///
/// The same handle sends ARP requests during resolution and afterwards
/// transmits the replayed frames.
pub struct PcapLink {
    interface: String,
    capture: Capture<Active>,
}

impl PcapLink {
    pub fn open(interface: &str) -> Result<Self, NetworkError> {
        let device = Device::list()
            .map_err(|e| NetworkError::InterfaceNotFound(format!("{}: {}", interface, e)))?
            .into_iter()
            .find(|d| d.name == interface)
            .ok_or_else(|| NetworkError::InterfaceNotFound(interface.to_string()))?;

        let mut capture = Capture::from_device(device)
            .and_then(|c| {
                c.promisc(false)
                    .snaplen(SNAPLEN)
                    .timeout(READ_TIMEOUT_MS)
                    .open()
            })
            .map_err(|e| NetworkError::CaptureFailed(format!("{}: {}", interface, e)))?;
        capture
            .filter(ARP_FILTER, true)
            .map_err(|e| NetworkError::CaptureFailed(format!("filter {}: {}", ARP_FILTER, e)))?;

        info!("Opened mirror interface {}", interface);
        Ok(Self {
            interface: interface.to_string(),
            capture,
        })
    }
}

impl LinkLayer for PcapLink {
    fn interface(&self) -> &str {
        &self.interface
    }

    fn hardware_address(&self) -> Result<MacAddr, NetworkError> {
        let path = format!("/sys/class/net/{}/address", self.interface);
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| NetworkError::AddressUnavailable(format!("{}: {}", path, e)))?;
        contents
            .trim()
            .parse::<MacAddr>()
            .map_err(|e| NetworkError::AddressUnavailable(format!("{}: {}", path, e)))
    }

    fn ipv4_address(&self) -> Result<Ipv4Addr, NetworkError> {
        let devices = Device::list()
            .map_err(|e| NetworkError::AddressUnavailable(e.to_string()))?;
        devices
            .into_iter()
            .filter(|d| d.name == self.interface)
            .flat_map(|d| d.addresses)
            .find_map(|a| match a.addr {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| {
                NetworkError::AddressUnavailable(format!("no IPv4 address on {}", self.interface))
            })
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), NetworkError> {
        self.capture
            .sendpacket(frame)
            .map_err(|e| NetworkError::TransmitFailed(e.to_string()))
    }

    fn dispatch(
        &mut self,
        max_frames: usize,
        on_frame: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<usize, NetworkError> {
        let mut seen = 0;
        while seen < max_frames {
            match self.capture.next_packet() {
                Ok(packet) => {
                    seen += 1;
                    if on_frame(packet.data) {
                        break;
                    }
                }
                Err(pcap::Error::TimeoutExpired) => break,
                Err(e) => return Err(NetworkError::CaptureFailed(e.to_string())),
            }
        }
        debug!("Read {} frames from {}", seen, self.interface);
        Ok(seen)
    }
}

impl FrameTransmitter for PcapLink {
    fn transmit(&mut self, frame: &[u8]) -> Result<(), NetworkError> {
        self.send(frame)
    }
}
