pub use queue::{bounded, Closed, Consumer, Producer};
pub use record::{Connection, Target, Version};
pub use shutdown::{shutdown, Shutdown, Trigger};

mod queue;
mod record;
mod shutdown;
