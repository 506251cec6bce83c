use anyhow::Result;
use libc::pid_t;
use serde::{Serialize, Deserialize};

pub const UNKNOWN: &str = "unknown";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub pid:     pid_t,
    pub name:    String,
    pub cmdline: String,
    pub user:    String,
    pub parent:  Parent,
}

// Exactly one level of ancestry: a parent has no parent of its own.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Parent {
    pub pid:     pid_t,
    pub name:    String,
    pub cmdline: String,
    pub user:    String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Info {
    pub pid:     pid_t,
    pub ppid:    pid_t,
    pub name:    String,
    pub cmdline: String,
    pub user:    String,
}

pub trait Lookup {
    fn lookup(&self, pid: pid_t) -> Result<Info>;
}

impl Process {
    pub fn new(info: Info, parent: Parent) -> Self {
        Self {
            pid:     info.pid,
            name:    info.name,
            cmdline: info.cmdline,
            user:    info.user,
            parent:  parent,
        }
    }

    pub fn unknown() -> Self {
        Self {
            pid:     0,
            name:    UNKNOWN.to_owned(),
            cmdline: UNKNOWN.to_owned(),
            user:    UNKNOWN.to_owned(),
            parent:  Parent::unknown(),
        }
    }
}

impl Parent {
    pub fn unknown() -> Self {
        Self {
            pid:     0,
            name:    UNKNOWN.to_owned(),
            cmdline: UNKNOWN.to_owned(),
            user:    UNKNOWN.to_owned(),
        }
    }
}

impl Default for Process {
    fn default() -> Self {
        Self::unknown()
    }
}

impl From<Info> for Parent {
    fn from(info: Info) -> Self {
        Self {
            pid:     info.pid,
            name:    info.name,
            cmdline: info.cmdline,
            user:    info.user,
        }
    }
}

pub use ext::Procs;
pub use resolve::{Error, Resolver};

mod resolve;

#[cfg(target_os = "linux")]
#[path = "linux.rs"]
mod ext;

#[cfg(not(target_os = "linux"))]
#[path = "empty.rs"]
mod ext;

#[cfg(test)]
mod test;
