use anyhow::Result;
use crate::collect::{Producer, Shutdown};

pub use decode::{decode, Attempt};
pub use nflog::{NFLog, NAME as NFLOG};

pub mod netlink;

mod decode;
mod nflog;

pub trait Source: Send {
    fn description(&self) -> &str;

    fn process(&mut self, shutdown: &Shutdown, queue: Producer) -> Result<()>;

    fn cleanup(&mut self);

    fn set_option(&mut self, key: &str, value: &str) -> Result<()>;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
