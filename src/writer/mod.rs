pub mod pool;
pub mod types;
pub mod writer;

pub use pool::{DispatchOutcome, PoolSettings, WriterPool};
pub use types::{IntakeItem, WriterType};
pub use writer::{BatchSettings, WriterHandle};
