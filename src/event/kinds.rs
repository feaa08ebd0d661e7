use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::EventStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentFields {
    pub available_replicas: Option<u32>,
    pub ready_replicas: Option<u32>,
    pub desired_replicas: Option<u32>,
    pub phase: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildFields {
    pub stream: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodFields {
    pub phase: Option<String>,
    pub container_name: Option<String>,
    pub container_state: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryFields {
    pub step: String,
}

/// Type-specific half of an event. Each variant carries a fixed schema;
/// anything beyond it belongs in the event's open `payload` bag.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Deployment(DeploymentFields),
    Build(BuildFields),
    Pod(PodFields),
    Repository(RepositoryFields),
}

impl EventKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            EventKind::Deployment(_) => "deployment",
            EventKind::Build(_) => "build",
            EventKind::Pod(_) => "pod",
            EventKind::Repository(_) => "repository",
        }
    }

    /// The kind's own fields as a flat map for persistence.
    pub fn kwargs(&self) -> Result<Map<String, Value>> {
        let value = match self {
            EventKind::Deployment(fields) => serde_json::to_value(fields)?,
            EventKind::Build(fields) => serde_json::to_value(fields)?,
            EventKind::Pod(fields) => serde_json::to_value(fields)?,
            EventKind::Repository(fields) => serde_json::to_value(fields)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            _ => unreachable!("event fields always serialize to an object"),
        }
    }

    /// Renders the display message for a brand-new event.
    pub fn format_message(&self, status: EventStatus) -> String {
        match self {
            EventKind::Deployment(fields) => match (fields.ready_replicas, fields.desired_replicas) {
                (Some(ready), Some(desired)) => {
                    format!("Deployment {}: {}/{} replicas ready", status, ready, desired)
                }
                _ => match &fields.phase {
                    Some(phase) => format!("Deployment {}: phase {}", status, phase),
                    None => format!("Deployment {}", status),
                },
            },
            EventKind::Build(fields) => match &fields.stream {
                Some(line) => format!("Build {}: {}", status, line.trim_end()),
                None => format!("Build {}", status),
            },
            EventKind::Pod(fields) => {
                let phase = fields.phase.as_deref().unwrap_or("unknown");
                match &fields.container_name {
                    Some(container) => format!("Pod {}: {} ({})", status, phase, container),
                    None => format!("Pod {}: {}", status, phase),
                }
            }
            EventKind::Repository(fields) => {
                format!("Repository {}: {}", status, fields.step)
            }
        }
    }
}
