pub use push::{Entry, Push, Stream};

mod push;
