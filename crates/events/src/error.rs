use thiserror::Error;

/// Errors raised while building or reading a [`crate::DomainEvent`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("{event_type}: payload field `{field}` is missing")]
    MissingField { event_type: String, field: String },

    #[error("{event_type}: payload field `{field}` is invalid: {reason}")]
    InvalidField {
        event_type: String,
        field: String,
        reason: String,
    },

    #[error("payload must be a JSON object, got {0}")]
    PayloadNotObject(String),
}
