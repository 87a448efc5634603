pub mod bounded;
pub mod enqueuer;

pub use bounded::{BoundedQueue, CloseOnDrop, QueueError};
pub use enqueuer::{EnqueueError, EnqueueSummary, UrlEnqueuer};
