//! ARP request encoding and reply matching for IPv4 over Ethernet.

use std::net::Ipv4Addr;

use etherparse::{EtherType, Ethernet2Header, Ethernet2HeaderSlice};

use crate::session::MacAddr;

pub const ARP_LEN: usize = 28;
pub const ARPHRD_ETHER: u16 = 1;
pub const ARPOP_REQUEST: u16 = 1;
pub const ARPOP_REPLY: u16 = 2;
const PROTOCOL_IPV4: u16 = 0x0800;

/// An Ethernet/IPv4 ARP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub operation: u16,
    pub sender_hw: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_hw: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Who has `target_ip`? Tell `sender_ip`.
    pub fn request(sender_hw: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            hardware_type: ARPHRD_ETHER,
            protocol_type: PROTOCOL_IPV4,
            operation: ARPOP_REQUEST,
            sender_hw,
            sender_ip,
            target_hw: MacAddr::UNRESOLVED,
            target_ip,
        }
    }

    /// `sender_ip` is at `sender_hw`, addressed to the requester.
    pub fn reply(
        sender_hw: MacAddr,
        sender_ip: Ipv4Addr,
        target_hw: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self {
            hardware_type: ARPHRD_ETHER,
            protocol_type: PROTOCOL_IPV4,
            operation: ARPOP_REPLY,
            sender_hw,
            sender_ip,
            target_hw,
            target_ip,
        }
    }

    pub fn to_bytes(&self) -> [u8; ARP_LEN] {
        let mut buf = [0u8; ARP_LEN];
        buf[0..2].copy_from_slice(&self.hardware_type.to_be_bytes());
        buf[2..4].copy_from_slice(&self.protocol_type.to_be_bytes());
        buf[4] = 6;
        buf[5] = 4;
        buf[6..8].copy_from_slice(&self.operation.to_be_bytes());
        buf[8..14].copy_from_slice(&self.sender_hw.octets());
        buf[14..18].copy_from_slice(&self.sender_ip.octets());
        buf[18..24].copy_from_slice(&self.target_hw.octets());
        buf[24..28].copy_from_slice(&self.target_ip.octets());
        buf
    }

    /// Parses an ARP body. Only 6-byte hardware and 4-byte protocol
    /// addresses are understood.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < ARP_LEN || buf[4] != 6 || buf[5] != 4 {
            return None;
        }
        let mac = |at: usize| {
            let mut octets = [0u8; 6];
            octets.copy_from_slice(&buf[at..at + 6]);
            MacAddr(octets)
        };
        let ip = |at: usize| Ipv4Addr::new(buf[at], buf[at + 1], buf[at + 2], buf[at + 3]);
        Some(Self {
            hardware_type: u16::from_be_bytes([buf[0], buf[1]]),
            protocol_type: u16::from_be_bytes([buf[2], buf[3]]),
            operation: u16::from_be_bytes([buf[6], buf[7]]),
            sender_hw: mac(8),
            sender_ip: ip(14),
            target_hw: mac(18),
            target_ip: ip(24),
        })
    }

    /// Wraps the message in an Ethernet frame from `source` to `destination`.
    pub fn to_frame(&self, source: MacAddr, destination: MacAddr) -> Vec<u8> {
        let eth = Ethernet2Header {
            source: source.octets(),
            destination: destination.octets(),
            ether_type: EtherType::ARP,
        };
        let mut frame = Vec::with_capacity(Ethernet2Header::LEN + ARP_LEN);
        frame.extend_from_slice(&eth.to_bytes());
        frame.extend_from_slice(&self.to_bytes());
        frame
    }
}

/// The broadcast frame asking for the hardware address of `target_ip`.
pub fn request_frame(local_hw: MacAddr, local_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Vec<u8> {
    ArpPacket::request(local_hw, local_ip, target_ip).to_frame(local_hw, MacAddr::BROADCAST)
}

/// Returns the answering hardware address if `frame` is an ARP reply from
/// `target_ip`.
///
/// The reply must be an Ethernet/IPv4 reply whose sender protocol address is
/// `target_ip`, and the hardware address it claims must equal the frame's
/// Ethernet source.
pub fn match_reply(frame: &[u8], target_ip: Ipv4Addr) -> Option<MacAddr> {
    let eth = Ethernet2HeaderSlice::from_slice(frame).ok()?;
    if eth.ether_type() != EtherType::ARP {
        return None;
    }
    let arp = ArpPacket::parse(&frame[eth.slice().len()..])?;

    if arp.operation != ARPOP_REPLY
        || arp.protocol_type != PROTOCOL_IPV4
        || arp.hardware_type != ARPHRD_ETHER
    {
        return None;
    }
    if arp.sender_ip != target_ip {
        return None;
    }
    // Spoofed or proxied replies are ignored.
    if arp.sender_hw.octets() != eth.source() {
        return None;
    }
    Some(arp.sender_hw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL_HW: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x10]);
    const TARGET_HW: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x20]);
    const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 10);
    const TARGET_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 20);

    fn reply_frame() -> Vec<u8> {
        ArpPacket::reply(TARGET_HW, TARGET_IP, LOCAL_HW, LOCAL_IP).to_frame(TARGET_HW, LOCAL_HW)
    }

    #[test]
    fn request_frame_layout() {
        let frame = request_frame(LOCAL_HW, LOCAL_IP, TARGET_IP);
        assert_eq!(frame.len(), 42);
        assert_eq!(&frame[0..6], &[0xff; 6]);
        assert_eq!(&frame[6..12], &LOCAL_HW.octets());
        assert_eq!(&frame[12..14], &[0x08, 0x06]);
        assert_eq!(
            &frame[14..22],
            &[0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01]
        );
        assert_eq!(&frame[22..28], &LOCAL_HW.octets());
        assert_eq!(&frame[28..32], &LOCAL_IP.octets());
        assert_eq!(&frame[32..38], &[0u8; 6]);
        assert_eq!(&frame[38..42], &TARGET_IP.octets());
    }

    #[test]
    fn matches_consistent_reply() {
        assert_eq!(match_reply(&reply_frame(), TARGET_IP), Some(TARGET_HW));
    }

    #[test]
    fn ignores_requests() {
        let frame = ArpPacket::request(TARGET_HW, TARGET_IP, LOCAL_IP).to_frame(TARGET_HW, MacAddr::BROADCAST);
        assert_eq!(match_reply(&frame, TARGET_IP), None);
    }

    #[test]
    fn ignores_other_hosts() {
        let other = Ipv4Addr::new(192, 0, 2, 99);
        let frame = ArpPacket::reply(TARGET_HW, other, LOCAL_HW, LOCAL_IP).to_frame(TARGET_HW, LOCAL_HW);
        assert_eq!(match_reply(&frame, TARGET_IP), None);
    }

    #[test]
    fn ignores_inconsistent_sender() {
        let spoofer = MacAddr([0x02, 0, 0, 0, 0, 0x66]);
        let frame = ArpPacket::reply(TARGET_HW, TARGET_IP, LOCAL_HW, LOCAL_IP).to_frame(spoofer, LOCAL_HW);
        assert_eq!(match_reply(&frame, TARGET_IP), None);
    }

    #[test]
    fn ignores_wrong_hardware_or_protocol() {
        let mut reply = ArpPacket::reply(TARGET_HW, TARGET_IP, LOCAL_HW, LOCAL_IP);
        reply.hardware_type = 6;
        assert_eq!(match_reply(&reply.to_frame(TARGET_HW, LOCAL_HW), TARGET_IP), None);

        let mut reply = ArpPacket::reply(TARGET_HW, TARGET_IP, LOCAL_HW, LOCAL_IP);
        reply.protocol_type = 0x86dd;
        assert_eq!(match_reply(&reply.to_frame(TARGET_HW, LOCAL_HW), TARGET_IP), None);
    }

    #[test]
    fn ignores_truncated_and_non_arp_frames() {
        let frame = reply_frame();
        assert_eq!(match_reply(&frame[..30], TARGET_IP), None);
        assert_eq!(match_reply(&frame[..10], TARGET_IP), None);

        let mut ipv4 = frame.clone();
        ipv4[12] = 0x08;
        ipv4[13] = 0x00;
        assert_eq!(match_reply(&ipv4, TARGET_IP), None);
    }

    #[test]
    fn parse_reads_back_fields() {
        let reply = ArpPacket::reply(TARGET_HW, TARGET_IP, LOCAL_HW, LOCAL_IP);
        assert_eq!(ArpPacket::parse(&reply.to_bytes()), Some(reply));
    }
}
