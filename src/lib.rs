pub mod agent;
pub mod args;
pub mod capture;
pub mod collect;
pub mod os;
pub mod output;
pub mod process;
pub mod registry;
pub mod sockets;
