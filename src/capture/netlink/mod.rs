use std::fmt;
use errno::Errno;
use pnet::packet::ethernet::EtherType;

pub use ext::{messages, Socket};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Bind,
    Unbind,
    PfBind,
    PfUnbind,
    Copy(u32),
}

#[derive(Debug, Eq, PartialEq)]
pub enum Message {
    Packet(Packet),
    Ack(u32),
    Error(u32, Errno),
    Other(u16),
}

#[derive(Debug, Eq, PartialEq)]
pub struct Packet {
    pub proto:   EtherType,
    pub payload: Vec<u8>,
}

pub enum Recv {
    Data(Vec<Message>),
    Timeout,
    Overrun,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Command::Bind     => write!(f, "bind"),
            Command::Unbind   => write!(f, "unbind"),
            Command::PfBind   => write!(f, "pf bind"),
            Command::PfUnbind => write!(f, "pf unbind"),
            Command::Copy(n)  => write!(f, "copy {} bytes", n),
        }
    }
}

#[cfg(target_os = "linux")]
#[path = "linux.rs"]
mod ext;

#[cfg(not(target_os = "linux"))]
#[path = "empty.rs"]
mod ext;
