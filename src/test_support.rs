//! Helpers shared by unit tests: decoding synthesized frames and capture files.

use std::net::IpAddr;

use etherparse::{Ethernet2HeaderSlice, Ipv4HeaderSlice, Ipv6HeaderSlice, TcpHeaderSlice};

use crate::capture_file::{GlobalHeader, RecordHeader};
use crate::session::{MacAddr, TcpFlags};

/// Field values read back from one synthesized frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub eth_src: MacAddr,
    pub eth_dst: MacAddr,
    pub ether_type: u16,
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    /// TTL for IPv4, hop limit for IPv6.
    pub hop_limit: u8,
    pub ip_protocol: u8,
    pub ipv4_identification: Option<u16>,
    pub dont_fragment: bool,
    pub src_port: u16,
    pub dst_port: u16,
    pub sequence: u32,
    pub acknowledgment: u32,
    pub flags: TcpFlags,
    pub window: u16,
    pub urgent_pointer: u16,
    pub payload: Vec<u8>,
}

pub fn decode_frame(frame: &[u8]) -> DecodedFrame {
    let eth = Ethernet2HeaderSlice::from_slice(frame).expect("ethernet header");
    let ether_type = eth.ether_type().0;
    let rest = &frame[eth.slice().len()..];

    let (src_ip, dst_ip, hop_limit, ip_protocol, identification, dont_fragment, ip_len, ip_total) =
        match ether_type {
            0x0800 => {
                let ip = Ipv4HeaderSlice::from_slice(rest).expect("ipv4 header");
                (
                    IpAddr::V4(ip.source_addr()),
                    IpAddr::V4(ip.destination_addr()),
                    ip.ttl(),
                    ip.protocol().0,
                    Some(ip.identification()),
                    ip.dont_fragment(),
                    ip.slice().len(),
                    ip.total_len() as usize,
                )
            }
            0x86dd => {
                let ip = Ipv6HeaderSlice::from_slice(rest).expect("ipv6 header");
                (
                    IpAddr::V6(ip.source_addr()),
                    IpAddr::V6(ip.destination_addr()),
                    ip.hop_limit(),
                    ip.next_header().0,
                    None,
                    false,
                    ip.slice().len(),
                    ip.slice().len() + ip.payload_length() as usize,
                )
            }
            other => panic!("unexpected ether type {:#06x}", other),
        };

    let tcp = TcpHeaderSlice::from_slice(&rest[ip_len..]).expect("tcp header");
    let mut flags = TcpFlags::empty();
    for (set, flag) in [
        (tcp.fin(), TcpFlags::FIN),
        (tcp.syn(), TcpFlags::SYN),
        (tcp.rst(), TcpFlags::RST),
        (tcp.psh(), TcpFlags::PSH),
        (tcp.ack(), TcpFlags::ACK),
        (tcp.urg(), TcpFlags::URG),
    ] {
        if set {
            flags = flags | flag;
        }
    }
    let payload = rest[ip_len + tcp.slice().len()..ip_total].to_vec();

    DecodedFrame {
        eth_src: MacAddr(eth.source()),
        eth_dst: MacAddr(eth.destination()),
        ether_type,
        src_ip,
        dst_ip,
        hop_limit,
        ip_protocol,
        ipv4_identification: identification,
        dont_fragment,
        src_port: tcp.source_port(),
        dst_port: tcp.destination_port(),
        sequence: tcp.sequence_number(),
        acknowledgment: tcp.acknowledgment_number(),
        flags,
        window: tcp.window_size(),
        urgent_pointer: tcp.urgent_pointer(),
        payload,
    }
}

/// Splits a capture file image into its records.
pub fn capture_records(bytes: &[u8]) -> Vec<(RecordHeader, Vec<u8>)> {
    let mut out = Vec::new();
    let mut pos = GlobalHeader::LEN;
    while pos < bytes.len() {
        let mut raw = [0u8; RecordHeader::LEN];
        raw.copy_from_slice(&bytes[pos..pos + RecordHeader::LEN]);
        let header = RecordHeader::from_bytes(&raw);
        pos += RecordHeader::LEN;
        let end = pos + header.incl_len as usize;
        out.push((header, bytes[pos..end].to_vec()));
        pos = end;
    }
    out
}

/// Decodes every frame stored in a capture file image.
pub fn capture_frames(bytes: &[u8]) -> Vec<DecodedFrame> {
    capture_records(bytes)
        .iter()
        .map(|(_, frame)| decode_frame(frame))
        .collect()
}
