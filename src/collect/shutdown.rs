use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};

// Raising drops the only sender, which disconnects every receiver at once
// and wakes any select! waiting on it.
pub struct Trigger {
    tx: Sender<()>,
}

#[derive(Clone, Debug)]
pub struct Shutdown {
    pub(crate) rx: Receiver<()>,
}

pub fn shutdown() -> (Trigger, Shutdown) {
    let (tx, rx) = bounded(0);
    (Trigger { tx }, Shutdown { rx })
}

impl Trigger {
    pub fn raise(self) {
        drop(self.tx);
    }
}

impl Shutdown {
    pub fn raised(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    #[cfg(test)]
    pub(crate) fn wait(&self, timeout: std::time::Duration) -> bool {
        use crossbeam_channel::RecvTimeoutError::Disconnected;
        matches!(self.rx.recv_timeout(timeout), Err(Disconnected))
    }
}
