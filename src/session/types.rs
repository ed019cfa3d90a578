//! Common data types used across the session subsystem.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Network-layer family of a logged connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl AddressFamily {
    /// Infers the family from the textual form of an address.
    ///
    /// Anything containing a colon is taken as IPv6, dotted digits as IPv4.
    /// Other text has no family. The text is not validated here; conversion
    /// happens separately and can still fail for a recognised family.
    pub fn infer(addr: &str) -> Option<AddressFamily> {
        if addr.contains(':') {
            Some(AddressFamily::Inet6)
        } else if addr.contains('.') && addr.chars().all(|c| c.is_ascii_digit() || c == '.') {
            Some(AddressFamily::Inet)
        } else {
            None
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Inet => write!(f, "IPv4"),
            AddressFamily::Inet6 => write!(f, "IPv6"),
        }
    }
}

/// Direction of a payload event within a logged connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Bytes sent by the connecting client to the server.
    ClientToServer,
    /// Bytes sent by the server back to the client.
    ServerToClient,
}

/// 48-bit Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Placeholder for a destination that has not been resolved yet.
    pub const UNRESOLVED: MacAddr = MacAddr([0; 6]);
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_unresolved(&self) -> bool {
        *self == MacAddr::UNRESOLVED
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacAddrParseError(pub String);

impl fmt::Display for MacAddrParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hardware address: {}", self.0)
    }
}

impl std::error::Error for MacAddrParseError {}

impl FromStr for MacAddr {
    type Err = MacAddrParseError;

    /// Parses `aa:bb:cc:dd:ee:ff` (or `-` separated) as found in sysfs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let parts: Vec<&str> = text.split(|c| c == ':' || c == '-').collect();
        if parts.len() != 6 {
            return Err(MacAddrParseError(text.to_string()));
        }
        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(parts) {
            if part.is_empty() || part.len() > 2 {
                return Err(MacAddrParseError(text.to_string()));
            }
            *octet =
                u8::from_str_radix(part, 16).map_err(|_| MacAddrParseError(text.to_string()))?;
        }
        Ok(MacAddr(octets))
    }
}

/// TCP control flags carried by a synthesized segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags(u8);

impl TcpFlags {
    pub const FIN: TcpFlags = TcpFlags(0x01);
    pub const SYN: TcpFlags = TcpFlags(0x02);
    pub const RST: TcpFlags = TcpFlags(0x04);
    pub const PSH: TcpFlags = TcpFlags(0x08);
    pub const ACK: TcpFlags = TcpFlags(0x10);
    pub const URG: TcpFlags = TcpFlags(0x20);

    pub const fn empty() -> TcpFlags {
        TcpFlags(0)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> TcpFlags {
        TcpFlags(bits & 0x3f)
    }

    pub const fn contains(&self, other: TcpFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TcpFlags {
    type Output = TcpFlags;

    fn bitor(self, rhs: TcpFlags) -> TcpFlags {
        TcpFlags(self.0 | rhs.0)
    }
}
