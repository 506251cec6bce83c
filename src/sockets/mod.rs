use std::net::{IpAddr, SocketAddr};
use anyhow::Result;
use libc::pid_t;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Family {
    V4,
    V6,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Socket {
    pub local:  SocketAddr,
    pub remote: SocketAddr,
    pub inode:  u64,
}

pub trait Table {
    fn sockets(&self, family: Family) -> Result<Vec<Socket>>;

    fn owner(&self, inode: u64) -> Result<Option<pid_t>>;
}

impl Family {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

pub use ext::Sockets;

#[cfg(target_os = "linux")]
#[path = "linux.rs"]
mod ext;

#[cfg(not(target_os = "linux"))]
#[path = "empty.rs"]
mod ext;
