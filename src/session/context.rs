use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use log::error;

use super::types::{AddressFamily, MacAddr};
use crate::error_handling::types::PacketError;

/// State needed to synthesize one direction of a logged TCP connection.
///
/// The address family is fixed when the context is created: both endpoint
/// addresses are validated against it and cannot be replaced afterwards.
/// Ports, counters and hardware addresses are plain fields mutated by the
/// writer acting on behalf of this half-connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketContext {
    family: AddressFamily,
    src_ip: IpAddr,
    dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    /// Next sequence number to send; wraps modulo 2^32.
    pub sequence: u32,
    /// Cumulative acknowledgment of bytes received from the peer.
    pub acknowledgment: u32,
    pub src_hw_addr: MacAddr,
    /// Stays [`MacAddr::UNRESOLVED`] until a mirror target has been resolved.
    pub dst_hw_addr: MacAddr,
}

impl PacketContext {
    /// Creates a context from already parsed endpoints.
    ///
    /// # Errors
    /// [`PacketError::AddressFamilyMismatch`] when `src` and `dst` are not of
    /// the same family.
    pub fn new(src: SocketAddr, dst: SocketAddr) -> Result<Self, PacketError> {
        let family = family_of(&src.ip());
        if family_of(&dst.ip()) != family {
            return Err(PacketError::AddressFamilyMismatch(format!(
                "{} and {}",
                src.ip(),
                dst.ip()
            )));
        }

        Ok(Self {
            family,
            src_ip: src.ip(),
            dst_ip: dst.ip(),
            src_port: src.port(),
            dst_port: dst.port(),
            sequence: 0,
            acknowledgment: 0,
            src_hw_addr: MacAddr::UNRESOLVED,
            dst_hw_addr: MacAddr::UNRESOLVED,
        })
    }

    /// Creates a context from the textual endpoints handed over by the
    /// interception engine.
    ///
    /// The family is inferred from `src_addr`; `dst_addr` must agree. Both
    /// addresses are then converted in that family and the ports parsed as
    /// decimal numbers. Counters start at zero.
    pub fn from_text(
        src_addr: &str,
        src_port: &str,
        dst_addr: &str,
        dst_port: &str,
    ) -> Result<Self, PacketError> {
        let family = match AddressFamily::infer(src_addr) {
            Some(af) => af,
            None => {
                error!("Unknown address family: {}", src_addr);
                return Err(PacketError::AddressFamilyMismatch(format!(
                    "unrecognized address family: {}",
                    src_addr
                )));
            }
        };
        if AddressFamily::infer(dst_addr) != Some(family) {
            error!(
                "Src and dst address families do not match: {}, {}",
                src_addr, dst_addr
            );
            return Err(PacketError::AddressFamilyMismatch(format!(
                "{} and {}",
                src_addr, dst_addr
            )));
        }

        let src = SocketAddr::new(convert_address(src_addr, family)?, parse_port(src_port)?);
        let dst = SocketAddr::new(convert_address(dst_addr, family)?, parse_port(dst_port)?);
        Self::new(src, dst)
    }

    /// Returns the context for the opposite direction of the same connection.
    ///
    /// Endpoints and hardware addresses are swapped, counters start at zero.
    pub fn peer(&self) -> PacketContext {
        PacketContext {
            family: self.family,
            src_ip: self.dst_ip,
            dst_ip: self.src_ip,
            src_port: self.dst_port,
            dst_port: self.src_port,
            sequence: 0,
            acknowledgment: 0,
            src_hw_addr: self.dst_hw_addr,
            dst_hw_addr: self.src_hw_addr,
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn src_ip(&self) -> IpAddr {
        self.src_ip
    }

    pub fn dst_ip(&self) -> IpAddr {
        self.dst_ip
    }
}

fn family_of(addr: &IpAddr) -> AddressFamily {
    match addr {
        IpAddr::V4(_) => AddressFamily::Inet,
        IpAddr::V6(_) => AddressFamily::Inet6,
    }
}

fn convert_address(text: &str, family: AddressFamily) -> Result<IpAddr, PacketError> {
    let converted = match family {
        AddressFamily::Inet => text.parse::<Ipv4Addr>().map(IpAddr::V4),
        AddressFamily::Inet6 => text.parse::<Ipv6Addr>().map(IpAddr::V6),
    };
    converted.map_err(|_| {
        error!("Error converting {} address: {}", family, text);
        PacketError::AddressConversionFailure(format!("{} address {}", family, text))
    })
}

fn parse_port(text: &str) -> Result<u16, PacketError> {
    text.trim()
        .parse::<u16>()
        .map_err(|_| PacketError::AddressConversionFailure(format!("port {}", text)))
}
