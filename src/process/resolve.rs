use std::fmt;
use std::net::{IpAddr, SocketAddr};
use libc::pid_t;
use log::trace;
use crate::sockets::{Family, Socket, Table};
use super::{Lookup, Parent, Process};

pub struct Resolver<T, L> {
    table: T,
    procs: L,
}

#[derive(Debug)]
pub enum Error {
    Ambiguous(usize),
    Table(anyhow::Error),
    Lookup(pid_t, anyhow::Error),
}

impl<T: Table, L: Lookup> Resolver<T, L> {
    pub fn new(table: T, procs: L) -> Self {
        Self { table, procs }
    }

    pub fn resolve(&self, src: SocketAddr, dst: SocketAddr) -> Result<Process, Error> {
        let mut found = self.scan(Family::of(&dst.ip()), src, dst)?;

        if found.is_empty() {
            if let (Some(src), Some(dst)) = (mapped(src), mapped(dst)) {
                found = self.scan(Family::V6, src, dst)?;
            }
        }

        let socket = match found.as_slice() {
            []       => return Ok(Process::unknown()),
            [socket] => socket,
            many     => return Err(Error::Ambiguous(many.len())),
        };

        let pid = match self.table.owner(socket.inode).map_err(Error::Table)? {
            Some(pid) => pid,
            None      => {
                trace!("socket {} -> {} has no owner", src, dst);
                return Ok(Process::unknown());
            }
        };

        let info   = self.procs.lookup(pid).map_err(|e| Error::Lookup(pid, e))?;
        let parent = match info.ppid {
            ppid if ppid > 0 => self.procs.lookup(ppid).map_err(|e| Error::Lookup(ppid, e))?.into(),
            _                => Parent::unknown(),
        };

        Ok(Process::new(info, parent))
    }

    fn scan(&self, family: Family, src: SocketAddr, dst: SocketAddr) -> Result<Vec<Socket>, Error> {
        let sockets = self.table.sockets(family).map_err(Error::Table)?;
        Ok(sockets.into_iter().filter(|s| {
            s.local == src && s.remote == dst
        }).collect())
    }
}

// Dual-stack sockets record IPv4 flows with IPv4-mapped IPv6 addresses.
fn mapped(addr: SocketAddr) -> Option<SocketAddr> {
    match addr.ip() {
        IpAddr::V4(ip) => Some(SocketAddr::new(ip.to_ipv6_mapped().into(), addr.port())),
        IpAddr::V6(_)  => None,
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Ambiguous(n)   => write!(f, "{} sockets match the connection", n),
            Error::Table(e)       => write!(f, "socket table unavailable: {}", e),
            Error::Lookup(pid, e) => write!(f, "process {} lookup failed: {}", pid, e),
        }
    }
}

impl std::error::Error for Error {}
