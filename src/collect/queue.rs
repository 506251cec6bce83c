use std::fmt;
use std::sync::Arc;
use crossbeam_channel::{Receiver, Sender, select};
use super::{Connection, Shutdown};

#[derive(Clone)]
pub struct Producer {
    tx: Sender<Arc<Connection>>,
}

#[derive(Clone)]
pub struct Consumer {
    rx: Receiver<Arc<Connection>>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Closed {
    Cancelled,
    Disconnected,
}

pub fn bounded(capacity: usize) -> (Producer, Consumer) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (Producer { tx }, Consumer { rx })
}

impl Producer {
    pub fn send(&self, conn: Arc<Connection>, shutdown: &Shutdown) -> Result<(), Closed> {
        if shutdown.raised() {
            return Err(Closed::Cancelled);
        }

        select! {
            send(self.tx, conn) -> r => r.map_err(|_| Closed::Disconnected),
            recv(shutdown.rx)   -> _ => Err(Closed::Cancelled),
        }
    }
}

impl Consumer {
    pub fn recv(&self, shutdown: &Shutdown) -> Result<Arc<Connection>, Closed> {
        if shutdown.raised() {
            return Err(Closed::Cancelled);
        }

        select! {
            recv(self.rx)     -> r => r.map_err(|_| Closed::Disconnected),
            recv(shutdown.rx) -> _ => Err(Closed::Cancelled),
        }
    }
}

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Closed::Cancelled    => write!(f, "queue cancelled"),
            Closed::Disconnected => write!(f, "queue disconnected"),
        }
    }
}

impl std::error::Error for Closed {}
