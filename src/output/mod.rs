use anyhow::Result;
use crate::collect::{Consumer, Shutdown};

pub use iptables::{IPTables, Policy, NAME as IPTABLES};
pub use loki::{Loki, NAME as LOKI};

mod iptables;
mod loki;

pub trait Sink: Send {
    fn description(&self) -> &str;

    fn process(&mut self, shutdown: &Shutdown, queue: Consumer) -> Result<()>;

    fn cleanup(&mut self);

    fn set_option(&mut self, key: &str, value: &str) -> Result<()>;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
