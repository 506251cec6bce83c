use std::os::raw::c_int;
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use anyhow::Result;
use errno::{errno, Errno};
use libc::{pollfd, EAGAIN, EINTR, ENOBUFS, POLLIN};
use log::trace;
use netlink_packet_core::{NetlinkBuffer, NetlinkMessage, NetlinkPayload};
use netlink_packet_netfilter::{NetfilterMessage, NetfilterMessageInner};
use netlink_packet_netfilter::nflog::{config_request, NfLogMessage};
use netlink_packet_netfilter::nflog::nlas::config::{ConfigCmd, ConfigMode, ConfigNla};
use netlink_packet_netfilter::nflog::nlas::packet::{PacketHdr, PacketNla};
use netlink_packet_utils::nla::Nla;
use netlink_sys::{constants::NETLINK_NETFILTER, Socket as Netlink, SocketAddr};
use pnet::packet::ethernet::EtherType;
use super::{Command, Message, Packet, Recv};

pub struct Socket {
    sock: Netlink,
    buf:  Vec<u8>,
}

impl Socket {
    pub fn open() -> Result<Self> {
        let mut sock = Netlink::new(NETLINK_NETFILTER)?;
        sock.bind_auto()?;
        Ok(Self {
            sock: sock,
            buf:  Vec::with_capacity(256 * 1024),
        })
    }

    pub fn buffer(&self, size: usize) -> Result<()> {
        Ok(self.sock.set_rx_buf_sz(size as c_int)?)
    }

    pub fn send(&self, seq: u32, family: u8, group: u16, cmd: Command) -> Result<()> {
        let msg    = request(seq, family, group, cmd);
        let kernel = SocketAddr::new(0, 0);
        self.sock.send_to(&msg, &kernel, 0)?;
        Ok(())
    }

    pub fn recv(&mut self, timeout: Duration) -> Result<Recv> {
        if !self.wait(timeout)? {
            return Ok(Recv::Timeout);
        }

        self.buf.clear();

        match self.sock.recv(&mut self.buf, 0) {
            Ok(_)  => Ok(Recv::Data(messages(&self.buf))),
            Err(e) => match e.raw_os_error() {
                Some(EAGAIN) | Some(EINTR) => Ok(Recv::Timeout),
                Some(ENOBUFS)              => Ok(Recv::Overrun),
                _                          => Err(e.into()),
            },
        }
    }

    fn wait(&self, timeout: Duration) -> Result<bool> {
        let mut fds = pollfd {
            fd:      self.sock.as_raw_fd(),
            events:  POLLIN,
            revents: 0,
        };

        let timeout = timeout.as_millis() as c_int;
        match unsafe { libc::poll(&mut fds, 1, timeout) } {
            -1 if errno().0 == EINTR => Ok(false),
            -1                       => Err(errno())?,
             n                       => Ok(n > 0),
        }
    }
}

pub fn request(seq: u32, family: u8, group: u16, cmd: Command) -> Vec<u8> {
    let nla: ConfigNla = match cmd {
        Command::Bind     => ConfigCmd::Bind.into(),
        Command::Unbind   => ConfigCmd::Unbind.into(),
        Command::PfBind   => ConfigCmd::PfBind.into(),
        Command::PfUnbind => ConfigCmd::PfUnbind.into(),
        Command::Copy(n)  => ConfigMode::new_packet(n).into(),
    };

    let mut msg = config_request(family, group, vec![nla]);
    msg.header.sequence_number = seq;

    let mut buf = vec![0u8; msg.buffer_len()];
    msg.serialize(&mut buf);
    buf
}

pub fn messages(buf: &[u8]) -> Vec<Message> {
    let mut msgs = Vec::new();
    let mut rest = buf;

    while let Ok(nl) = NetlinkBuffer::new_checked(rest) {
        let len = nl.length() as usize;

        match NetlinkMessage::<NetfilterMessage>::deserialize(&rest[..len]) {
            Ok(msg) => msgs.push(message(msg)),
            Err(e)  => trace!("invalid netlink message: {}", e),
        }

        rest = rest.get(align(len)..).unwrap_or(&[]);
    }

    msgs
}

fn message(msg: NetlinkMessage<NetfilterMessage>) -> Message {
    let seq  = msg.header.sequence_number;
    let kind = msg.header.message_type;

    match msg.payload {
        NetlinkPayload::Error(e) => match e.code {
            None       => Message::Ack(seq),
            Some(code) => Message::Error(seq, Errno(-code.get())),
        },
        NetlinkPayload::InnerMessage(NetfilterMessage {
            inner: NetfilterMessageInner::NfLog(NfLogMessage::Packet(nlas)),
            ..
        }) => match packet(nlas) {
            Some(packet) => Message::Packet(packet),
            None         => Message::Other(kind),
        },
        _ => Message::Other(kind),
    }
}

fn packet(nlas: Vec<PacketNla>) -> Option<Packet> {
    let mut proto   = None;
    let mut payload = None;

    for nla in nlas {
        match nla {
            PacketNla::PacketHdr(hdr) => proto   = Some(protocol(&hdr)),
            PacketNla::Payload(data)  => payload = Some(data),
            _                         => (),
        }
    }

    Some(Packet {
        proto:   proto?,
        payload: payload?,
    })
}

// PacketHdr has no accessors, its wire form starts with hw_protocol
fn protocol(hdr: &PacketHdr) -> EtherType {
    let mut raw = [0u8; 4];
    hdr.emit_value(&mut raw);
    EtherType(u16::from_be_bytes([raw[0], raw[1]]))
}

fn align(n: usize) -> usize {
    (n + 3) & !3
}
