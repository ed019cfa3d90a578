use std::net::IpAddr;

use etherparse::{IpHeaders, IpNumber, Ipv4Header, Ipv6Header, PacketBuilder, TcpHeader};
use log::{error, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error_handling::types::PacketError;
use crate::session::{PacketContext, TcpFlags};

/// Receive window advertised by every synthesized segment.
pub const TCP_WINDOW: u16 = 32767;
pub const IPV4_TTL: u8 = 64;
pub const IPV6_HOP_LIMIT: u8 = 255;

/// Builds complete Ethernet + IPv4/IPv6 + TCP frames from a [`PacketContext`].
///
/// Checksums, length fields and byte order are left to etherparse's
/// `PacketBuilder`. The random source draws initial sequence numbers and IPv4
/// identification values; it is a type parameter so tests can seed it.
pub struct PacketSynthesizer<R: Rng = StdRng> {
    rng: R,
}

impl PacketSynthesizer<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for PacketSynthesizer<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> PacketSynthesizer<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Synthesizes one frame sent from `ctx` carrying `payload`.
    ///
    /// A `SYN` in `flags` starts a new half-connection: `ctx.sequence` is
    /// replaced by a random initial sequence number. On success the sequence
    /// advances by `payload.len()` (mod 2^32). On error `ctx` is untouched.
    pub fn synthesize(
        &mut self,
        ctx: &mut PacketContext,
        flags: TcpFlags,
        payload: &[u8],
    ) -> Result<Vec<u8>, PacketError> {
        let sequence = if flags.contains(TcpFlags::SYN) {
            self.rng.gen::<u32>()
        } else {
            ctx.sequence
        };

        let tcp = tcp_header(ctx, sequence, flags);
        let ip = match (ctx.src_ip(), ctx.dst_ip()) {
            (IpAddr::V4(src), IpAddr::V4(dst)) => {
                let header = Ipv4Header {
                    identification: self.rng.gen::<u16>(),
                    dont_fragment: true,
                    time_to_live: IPV4_TTL,
                    protocol: IpNumber::TCP,
                    source: src.octets(),
                    destination: dst.octets(),
                    ..Default::default()
                };
                IpHeaders::Ipv4(header, Default::default())
            }
            (IpAddr::V6(src), IpAddr::V6(dst)) => {
                let header = Ipv6Header {
                    next_header: IpNumber::TCP,
                    hop_limit: IPV6_HOP_LIMIT,
                    source: src.octets(),
                    destination: dst.octets(),
                    ..Default::default()
                };
                IpHeaders::Ipv6(header, Default::default())
            }
            (src, dst) => {
                return Err(PacketError::AddressFamilyMismatch(format!(
                    "{} and {}",
                    src, dst
                )))
            }
        };

        let builder = PacketBuilder::ethernet2(ctx.src_hw_addr.octets(), ctx.dst_hw_addr.octets())
            .ip(ip)
            .tcp_header(tcp);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).map_err(|e| {
            error!("Error building packet: {}", e);
            PacketError::FrameConstruction(e.to_string())
        })?;

        ctx.sequence = sequence.wrapping_add(payload.len() as u32);
        trace!(
            "Synthesized {} byte frame {}:{} -> {}:{} seq={} ack={} flags={:#04x} payload={}",
            frame.len(),
            ctx.src_ip(),
            ctx.src_port,
            ctx.dst_ip(),
            ctx.dst_port,
            sequence,
            ctx.acknowledgment,
            flags.bits(),
            payload.len()
        );
        Ok(frame)
    }
}

fn tcp_header(ctx: &PacketContext, sequence: u32, flags: TcpFlags) -> TcpHeader {
    let mut tcp = TcpHeader::new(ctx.src_port, ctx.dst_port, sequence, TCP_WINDOW);
    tcp.acknowledgment_number = ctx.acknowledgment;
    tcp.fin = flags.contains(TcpFlags::FIN);
    tcp.syn = flags.contains(TcpFlags::SYN);
    tcp.rst = flags.contains(TcpFlags::RST);
    tcp.psh = flags.contains(TcpFlags::PSH);
    tcp.ack = flags.contains(TcpFlags::ACK);
    tcp.urg = flags.contains(TcpFlags::URG);
    tcp.urgent_pointer = 0;
    tcp
}
