use std::convert::TryFrom;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use serde::{Serialize, Deserialize};
use crate::process::Process;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub origin:  String,
    pub dst:     IpAddr,
    pub port:    u16,
    pub version: Version,
    pub proc:    Process,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Version {
    V4,
    V6,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Target {
    pub addr: IpAddr,
    pub port: u16,
}

impl Connection {
    pub fn new(origin: &str, dst: SocketAddr, proc: Process) -> Self {
        Self {
            origin:  origin.to_owned(),
            dst:     dst.ip(),
            port:    dst.port(),
            version: Version::of(&dst.ip()),
            proc:    proc,
        }
    }

    pub fn target(&self) -> Target {
        Target {
            addr: self.dst,
            port: self.port,
        }
    }
}

impl Version {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Version::V4,
            IpAddr::V6(_) => Version::V6,
        }
    }
}

impl From<Version> for u8 {
    fn from(v: Version) -> u8 {
        match v {
            Version::V4 => 4,
            Version::V6 => 6,
        }
    }
}

impl TryFrom<u8> for Version {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            4 => Ok(Version::V4),
            6 => Ok(Version::V6),
            n => Err(format!("invalid IP version {}", n)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}
