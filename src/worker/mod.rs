pub mod consumer;
pub mod dispatcher;

pub use consumer::{HandleOutcome, JobConsumer};
pub use dispatcher::{requeue_unfinished, Dispatcher};
