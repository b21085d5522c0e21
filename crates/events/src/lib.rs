//! Domain events and the in-process event bus.
//!
//! Modules never hold references to each other; they publish [`DomainEvent`]s
//! and subscribe [`EventHandler`]s by event type. The bus fans every event out
//! to its handlers, each on its own task and behind its own failure boundary.

pub mod bus;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod handler;

pub use bus::EventBus;
pub use dispatch::{Dispatch, DispatchSummary, HandlerOutcome};
pub use envelope::{DomainEvent, DomainEventBuilder, Payload};
pub use error::EventError;
pub use handler::{EventHandler, FnHandler, HandlerResult};
