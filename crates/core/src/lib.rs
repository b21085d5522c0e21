//! `colosseum-core`: shared domain building blocks.
//!
//! Business modules depend on this crate for identifiers and their error
//! model; it has no knowledge of the registry or the event bus.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ChannelId, MessageId, TeamId, TournamentId, UserId};
