use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::EventError;

/// Event-specific data. Consumers read it through [`DomainEvent::payload_field`].
pub type Payload = Map<String, Value>;

/// A fact that happened in one module, carried by the bus to any module that cares.
///
/// Notes:
/// - `event_type` is a dotted namespace, `<module>.<aggregate>.<verb>`
///   (e.g. `"iam.user.registered"`).
/// - `timestamp` is stamped when the event is built, i.e. at publish time.
/// - Immutable once built: fields are private and there are no setters. The bus
///   shares one instance between all handlers behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    event_id: Uuid,
    event_type: String,
    aggregate_id: String,
    aggregate_type: String,
    timestamp: DateTime<Utc>,
    payload: Payload,
}

impl DomainEvent {
    pub fn new(
        event_type: impl Into<String>,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self::builder(event_type, aggregate_type, aggregate_id)
            .payload(payload)
            .build()
    }

    pub fn builder(
        event_type: impl Into<String>,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
    ) -> DomainEventBuilder {
        DomainEventBuilder {
            event_type: event_type.into(),
            aggregate_type: aggregate_type.into(),
            aggregate_id: aggregate_id.into(),
            payload: Payload::new(),
            occurred_at: None,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The `<module>` segment of the event type (everything before the first dot).
    pub fn namespace(&self) -> &str {
        self.event_type
            .split_once('.')
            .map_or(self.event_type.as_str(), |(ns, _)| ns)
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// String payload field, if present and a string.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Deserialize a single payload field into `T`.
    pub fn payload_field<T: DeserializeOwned>(&self, key: &str) -> Result<T, EventError> {
        let raw = self
            .payload
            .get(key)
            .ok_or_else(|| EventError::MissingField {
                event_type: self.event_type.clone(),
                field: key.to_string(),
            })?;

        T::deserialize(raw).map_err(|e| EventError::InvalidField {
            event_type: self.event_type.clone(),
            field: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Builder returned by [`DomainEvent::builder`].
#[derive(Debug, Clone)]
pub struct DomainEventBuilder {
    event_type: String,
    aggregate_type: String,
    aggregate_id: String,
    payload: Payload,
    occurred_at: Option<DateTime<Utc>>,
}

impl DomainEventBuilder {
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Replace the whole payload.
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Replace the whole payload from a JSON value, which must be an object.
    pub fn payload_value(mut self, value: Value) -> Result<Self, EventError> {
        match value {
            Value::Object(map) => {
                self.payload = map;
                Ok(self)
            }
            other => Err(EventError::PayloadNotObject(json_kind(&other).to_string())),
        }
    }

    /// Override the timestamp (defaults to the moment `build` is called).
    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }

    pub fn build(self) -> DomainEvent {
        DomainEvent {
            event_id: Uuid::now_v7(),
            event_type: self.event_type,
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type,
            timestamp: self.occurred_at.unwrap_or_else(Utc::now),
            payload: self.payload,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
