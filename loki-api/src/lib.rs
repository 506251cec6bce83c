mod api;
mod client;
mod error;
mod nanos;

pub use api::*;
pub use client::{Auth, Client};
pub use error::Error;
