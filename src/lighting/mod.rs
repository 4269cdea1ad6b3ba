mod keys;
mod message;
mod scheduler;

pub use keys::KeySet;
pub use message::{LightKind, LightMessage, LightSink};
pub use scheduler::LookaheadScheduler;
