pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod validation;

pub use error::EventError;
pub use pipeline::ChatIntentPipeline;
pub use scheduler::EventScheduler;
pub use store::{EventStore, MessageSink, NotificationStore, SqliteEventStore};
pub use types::*;
pub use validation::{ValidationReport, validate_event, validate_update};
