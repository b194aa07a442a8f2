//! Asynchronous chunk generation: worker pool, completion queues and the
//! consumer-thread drain loop.

pub mod queue;
pub mod scheduler;

pub use queue::{CompletionEnvelope, CompletionQueue, CompletionSender, DrainMode};
pub use scheduler::{DrainStats, GenerationScheduler, QueueKind, SchedulerConfig};
