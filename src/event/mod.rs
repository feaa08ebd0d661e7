use std::fmt::Display;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod kinds;
pub mod registry;

pub use kinds::{
    BuildFields, DeploymentFields, EventKind, PodFields, RepositoryFields,
};
pub use registry::{EventRegistry, KindDecoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Started,
    Progress,
    Completed,
    Error,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Started => "started",
            EventStatus::Progress => "progress",
            EventStatus::Completed => "completed",
            EventStatus::Error => "error",
        }
    }
}

impl Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub enum EventError {
    UnknownEventType(String),
    MalformedRecord(String),
}

impl Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventError::UnknownEventType(name) => write!(f, "unknown event type: {}", name),
            EventError::MalformedRecord(reason) => write!(f, "malformed event record: {}", reason),
        }
    }
}

impl std::error::Error for EventError {}

/// One status update for a task. The message is rendered exactly once, at
/// construction time, and travels verbatim through serialization so that a
/// rehydrated event reads identically even when the original message was
/// built from context that does not survive serialization (a caught error,
/// for example).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub status: EventStatus,
    pub message: String,
    pub payload: Map<String, Value>,
}

impl Event {
    /// Builds a brand-new event, rendering the message from the kind's
    /// own fields. This is the only path that computes a message.
    pub fn new(kind: EventKind, status: EventStatus) -> Self {
        let message = kind.format_message(status);
        Self {
            kind,
            status,
            message,
            payload: Map::new(),
        }
    }

    /// Builds an event with an explicitly supplied message, for callers
    /// whose message embeds transient context (e.g. an error in hand).
    pub fn with_message(kind: EventKind, status: EventStatus, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            payload: Map::new(),
        }
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    pub fn serialize(&self) -> Result<EventRecord> {
        Ok(EventRecord {
            event_type: self.event_type().to_string(),
            status: self.status,
            message: self.message.clone(),
            payload: self.payload.clone(),
            kwargs: self.kind.kwargs()?,
        })
    }
}

/// Persisted form of an [`Event`]: the type discriminator, the status as
/// its string value, the frozen message, the open payload bag, and the
/// kind's own fields under `kwargs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_type: String,
    pub status: EventStatus,
    pub message: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}
