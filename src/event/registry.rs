use std::collections::HashMap;

use serde_json::{Map, Value};

use super::kinds::{
    BuildFields, DeploymentFields, EventKind, PodFields, RepositoryFields,
};
use super::{Event, EventError, EventRecord};

/// Reconstructs a kind from a record's `kwargs` map.
pub type KindDecoder = fn(&Map<String, Value>) -> Result<EventKind, EventError>;

/// Name-to-decoder map for polymorphic event deserialization. Owned by the
/// composition root and passed where needed, so tests can build isolated
/// registries instead of mutating shared state.
pub struct EventRegistry {
    decoders: HashMap<String, KindDecoder>,
}

impl EventRegistry {
    /// A registry with no kinds registered.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers a decoder for `event_type`. Registering the same name
    /// twice replaces the previous decoder.
    pub fn register(&mut self, event_type: impl Into<String>, decoder: KindDecoder) {
        self.decoders.insert(event_type.into(), decoder);
    }

    /// Rebuilds an [`Event`] from its persisted record. The record's
    /// message is used verbatim, never recomputed. Unknown event types
    /// are an error, not a fallback.
    pub fn deserialize(&self, record: &EventRecord) -> Result<Event, EventError> {
        let decoder = self
            .decoders
            .get(&record.event_type)
            .ok_or_else(|| EventError::UnknownEventType(record.event_type.clone()))?;
        let kind = decoder(&record.kwargs)?;
        Ok(Event {
            kind,
            status: record.status,
            message: record.message.clone(),
            payload: record.payload.clone(),
        })
    }
}

impl Default for EventRegistry {
    /// Registry with the built-in kinds registered.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("deployment", decode_deployment);
        registry.register("build", decode_build);
        registry.register("pod", decode_pod);
        registry.register("repository", decode_repository);
        registry
    }
}

fn decode<T: serde::de::DeserializeOwned>(kwargs: &Map<String, Value>) -> Result<T, EventError> {
    serde_json::from_value(Value::Object(kwargs.clone()))
        .map_err(|e| EventError::MalformedRecord(e.to_string()))
}

fn decode_deployment(kwargs: &Map<String, Value>) -> Result<EventKind, EventError> {
    Ok(EventKind::Deployment(decode::<DeploymentFields>(kwargs)?))
}

fn decode_build(kwargs: &Map<String, Value>) -> Result<EventKind, EventError> {
    Ok(EventKind::Build(decode::<BuildFields>(kwargs)?))
}

fn decode_pod(kwargs: &Map<String, Value>) -> Result<EventKind, EventError> {
    Ok(EventKind::Pod(decode::<PodFields>(kwargs)?))
}

fn decode_repository(kwargs: &Map<String, Value>) -> Result<EventKind, EventError> {
    Ok(EventKind::Repository(decode::<RepositoryFields>(kwargs)?))
}
