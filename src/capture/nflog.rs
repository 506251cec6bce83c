use std::sync::Arc;
use std::time::Duration;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, trace, warn};
use pnet::packet::ethernet::EtherType;
use crate::collect::{Closed, Connection, Producer, Shutdown};
use crate::process::{Lookup, Procs, Resolver, Process};
use crate::sockets::{Sockets, Table};
use super::{decode, Source};
use super::netlink::{Command, Message, Recv, Socket};

pub const NAME: &str = "nflog";

const DESCRIPTION: &str = "\
nflog iptables hook
Gets packets from the iptables NFLOG target. Add iptables rules like so:

    iptables -I OUTPUT -m state --state NEW -p tcp -j NFLOG --nflog-group 100

Options:
    nflog:group:<ID>    NFLOG group to listen on (default 100)";

const GROUP:   u16      = 100;
const RANGE:   u32      = 0xffff;
const BUFFER:  usize    = 1024 * 1024;
const TIMEOUT: Duration = Duration::from_millis(250);

pub struct NFLog<T = Sockets, L = Procs> {
    group:    u16,
    resolver: Resolver<T, L>,
    seq:      u32,
}

impl NFLog {
    pub fn new() -> Self {
        Self::with(Resolver::new(Sockets, Procs))
    }
}

impl<T: Table, L: Lookup> NFLog<T, L> {
    pub fn with(resolver: Resolver<T, L>) -> Self {
        Self {
            group:    GROUP,
            resolver: resolver,
            seq:      0,
        }
    }

    #[cfg(test)]
    pub(super) fn group(&self) -> u16 {
        self.group
    }

    pub fn connection(&self, proto: EtherType, payload: &[u8]) -> Option<Connection> {
        let attempt = decode(proto, payload)?;

        let proc = match self.resolver.resolve(attempt.src, attempt.dst) {
            Ok(proc) => proc,
            Err(e)   => {
                warn!("unable to resolve {} -> {}: {}", attempt.src, attempt.dst, e);
                Process::unknown()
            }
        };

        debug!("new TCP connection {} -> {} by {}", attempt.src, attempt.dst, proc.name);

        Some(Connection::new(NAME, attempt.dst, proc))
    }

    fn subscribe(&mut self, sock: &mut Socket) -> Result<()> {
        let group  = self.group;
        let unspec = libc::AF_UNSPEC as u8;

        for &family in &[libc::AF_INET as u8, libc::AF_INET6 as u8] {
            for &cmd in &[Command::PfUnbind, Command::PfBind] {
                if let Err(e) = self.request(sock, family, 0, cmd) {
                    debug!("nflog {} for family {}: {}", cmd, family, e);
                }
            }
        }

        self.request(sock, unspec, group, Command::Bind).context("bind")?;
        self.request(sock, unspec, group, Command::Copy(RANGE)).context("copy mode")?;

        Ok(())
    }

    fn request(&mut self, sock: &mut Socket, family: u8, group: u16, cmd: Command) -> Result<()> {
        self.seq += 1;
        sock.send(self.seq, family, group, cmd)?;

        for _ in 0..8 {
            let msgs = match sock.recv(TIMEOUT)? {
                Recv::Data(msgs) => msgs,
                Recv::Timeout    => continue,
                Recv::Overrun    => continue,
            };

            for msg in msgs {
                match msg {
                    Message::Ack(seq)      if seq == self.seq => return Ok(()),
                    Message::Error(seq, e) if seq == self.seq => return Err(e.into()),
                    _                                         => (),
                }
            }
        }

        Err(anyhow!("no acknowledgement for request {}", self.seq))
    }

    fn unsubscribe(&mut self, sock: &Socket) {
        self.seq += 1;
        let unspec = libc::AF_UNSPEC as u8;
        if let Err(e) = sock.send(self.seq, unspec, self.group, Command::Unbind) {
            debug!("nflog group {} unbind failed: {}", self.group, e);
        }
    }

    fn poll(&mut self, sock: &mut Socket, shutdown: &Shutdown, queue: &Producer) -> Result<()> {
        while !shutdown.raised() {
            let msgs = match sock.recv(TIMEOUT)? {
                Recv::Data(msgs) => msgs,
                Recv::Timeout    => continue,
                Recv::Overrun    => {
                    warn!("nflog group {} receive buffer overrun", self.group);
                    continue;
                }
            };

            for msg in msgs {
                let packet = match msg {
                    Message::Packet(packet) => packet,
                    Message::Error(_, e)    => {
                        warn!("nflog group {} error: {}", self.group, e);
                        continue;
                    }
                    other                   => {
                        trace!("ignoring netlink message {:?}", other);
                        continue;
                    }
                };

                if let Some(conn) = self.connection(packet.proto, &packet.payload) {
                    match queue.send(Arc::new(conn), shutdown) {
                        Ok(())                        => (),
                        Err(Closed::Cancelled)        => return Ok(()),
                        Err(e @ Closed::Disconnected) => return Err(e.into()),
                    }
                }
            }
        }

        Ok(())
    }
}

impl<T, L> Source for NFLog<T, L>
where
    T: Table + Send,
    L: Lookup + Send,
{
    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn process(&mut self, shutdown: &Shutdown, queue: Producer) -> Result<()> {
        let mut sock = Socket::open().context("nflog socket")?;

        if let Err(e) = sock.buffer(BUFFER) {
            debug!("nflog receive buffer unchanged: {}", e);
        }

        self.subscribe(&mut sock).with_context(|| {
            format!("nflog group {} subscription", self.group)
        })?;

        info!("listening on nflog group {}", self.group);

        let result = self.poll(&mut sock, shutdown, &queue);
        self.unsubscribe(&sock);
        result
    }

    fn cleanup(&mut self) {
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "group" => self.group = value.parse().with_context(|| {
                format!("invalid nflog group '{}'", value)
            })?,
            _       => return Err(anyhow!("option '{}' unknown for nflog input", key)),
        }
        Ok(())
    }
}
