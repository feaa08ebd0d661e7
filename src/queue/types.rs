use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DeploymentConfig;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Build,
    Serve,
    Run,
}

impl Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One queued unit of deployment work. The config is a snapshot taken at
/// enqueue time; nothing mutates a task record after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub project_id: String,
    pub namespace: String,
    pub task_type: TaskType,
    pub config: DeploymentConfig,
    pub queued_at: DateTime<Utc>,
    #[serde(default)]
    pub inputs: Option<Value>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl Task {
    /// Full addressing key for the metadata record. All three parts are
    /// needed to look a task up directly; the id alone requires a scan.
    pub fn composite_key(&self) -> String {
        format!("{}:{}:{}", self.namespace, self.project_id, self.task_id)
    }
}
