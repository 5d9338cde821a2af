pub mod queue;

pub use queue::{BufferQueue, PcmBuffer};
