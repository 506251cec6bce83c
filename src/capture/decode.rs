use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use pnet::packet::PacketSize;
use pnet::packet::ethernet::{EtherType, EtherTypes};
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::{ExtensionPacket, Ipv6Packet};
use pnet::packet::tcp::{TcpFlags, TcpPacket};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Attempt {
    pub src: SocketAddr,
    pub dst: SocketAddr,
}

pub fn decode(proto: EtherType, payload: &[u8]) -> Option<Attempt> {
    let (src, dst, segment) = match proto {
        EtherTypes::Ipv4 => ipv4(payload)?,
        EtherTypes::Ipv6 => ipv6(payload)?,
        _                => return None,
    };

    let tcp = TcpPacket::new(segment)?;
    if tcp.get_flags() & TcpFlags::SYN == 0 || loopback(&dst) {
        return None;
    }

    Some(Attempt {
        src: SocketAddr::new(src, tcp.get_source()),
        dst: SocketAddr::new(dst, tcp.get_destination()),
    })
}

fn ipv4(payload: &[u8]) -> Option<(IpAddr, IpAddr, &[u8])> {
    let pkt = Ipv4Packet::new(payload)?;
    if pkt.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return None;
    }

    // only the first fragment carries the tcp header
    if pkt.get_fragment_offset() != 0 {
        return None;
    }

    let n   = pkt.get_header_length() as usize * 4;
    let end = (pkt.get_total_length() as usize).min(payload.len());
    if n < Ipv4Packet::minimum_packet_size() || n > end {
        return None;
    }

    let src = pkt.get_source().into();
    let dst = pkt.get_destination().into();
    Some((src, dst, &payload[n..end]))
}

fn ipv6(payload: &[u8]) -> Option<(IpAddr, IpAddr, &[u8])> {
    let pkt = Ipv6Packet::new(payload)?;

    let n   = Ipv6Packet::minimum_packet_size();
    let end = (n + pkt.get_payload_length() as usize).min(payload.len());

    let mut next = pkt.get_next_header();
    let mut rest = &payload[n..end];

    while extension(next) {
        let ext = ExtensionPacket::new(rest)?;
        let n   = ext.packet_size();
        next = ext.get_next_header();
        rest = rest.get(n..)?;
    }

    if next != IpNextHeaderProtocols::Tcp {
        return None;
    }

    let src = pkt.get_source().into();
    let dst = pkt.get_destination().into();
    Some((src, dst, rest))
}

fn extension(next: IpNextHeaderProtocol) -> bool {
    match next {
        IpNextHeaderProtocols::Hopopt    => true,
        IpNextHeaderProtocols::Ipv6Route => true,
        IpNextHeaderProtocols::Ipv6Opts  => true,
        _                                => false,
    }
}

fn loopback(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(ip) => ip.is_loopback(),
        IpAddr::V6(ip) => ip.is_loopback() || mapped(ip).map_or(false, |ip| ip.is_loopback()),
    }
}

fn mapped(ip: &Ipv6Addr) -> Option<Ipv4Addr> {
    match ip.segments() {
        [0, 0, 0, 0, 0, 0xffff, _, _] => ip.to_ipv4(),
        _                             => None,
    }
}
