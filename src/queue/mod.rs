use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::DeploymentConfig;
use crate::store::Store;

pub mod types;

pub use types::{Task, TaskType};

/// Hash table holding task metadata under `{namespace}:{project_id}:{task_id}`.
pub const TASK_TABLE: &str = "jockey:tasks";
/// FIFO list of pending task ids.
pub const QUEUE_KEY: &str = "jockey:queue";

/// Durable hand-off of deployment work from producers to workers. FIFO
/// ordering follows the order of successful enqueue calls; the claim side
/// relies entirely on the store's atomic pop.
#[derive(Clone)]
pub struct TaskQueue {
    store: Arc<dyn Store>,
}

impl TaskQueue {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Persists the task metadata and pushes its id onto the FIFO queue,
    /// returning the new task id. The config is cloned here; later config
    /// changes never affect an already-queued task. Metadata is written
    /// before the id is pushed so a claimer always finds it.
    pub async fn queue_task(
        &self,
        task_type: TaskType,
        config: &DeploymentConfig,
        project_id: &str,
        inputs: Option<Value>,
        callback_url: Option<String>,
    ) -> Result<String> {
        let task = Task {
            task_id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            namespace: config.namespace.clone(),
            task_type,
            config: config.clone(),
            queued_at: Utc::now(),
            inputs,
            callback_url,
        };

        let record = serde_json::to_string(&task)?;
        self.store
            .hash_set(TASK_TABLE, &task.composite_key(), record)
            .await?;
        self.store
            .list_push(QUEUE_KEY, task.task_id.clone())
            .await?;

        info!(
            "Queued {} task {} for project {} in namespace {}",
            task_type, task.task_id, project_id, task.namespace
        );
        Ok(task.task_id)
    }

    /// Atomically pops the next pending task id and resolves its metadata.
    /// Returns `None` on an empty queue. A popped id without a metadata
    /// record is a ghost task: logged as an error and reported as `None`
    /// so the claim loop keeps polling.
    ///
    /// There is no lease: once popped, a task is never requeued, even if
    /// the claiming worker dies mid-execution.
    pub async fn claim_next_task(&self) -> Result<Option<Task>> {
        let task_id = match self.store.list_pop_front(QUEUE_KEY).await? {
            Some(task_id) => task_id,
            None => return Ok(None),
        };

        match self.get_task_data(&task_id).await? {
            Some(task) => Ok(Some(task)),
            None => {
                error!(
                    "Claimed task {} has no metadata record, dropping it",
                    task_id
                );
                Ok(None)
            }
        }
    }

    /// Looks a task up by id alone, scanning composite keys. `None` for
    /// ids with no backing record.
    pub async fn get_task_data(&self, task_id: &str) -> Result<Option<Task>> {
        let pattern = format!("*:*:{}", task_id);
        let hits = self.store.hash_scan(TASK_TABLE, &pattern).await?;
        match hits.into_iter().next() {
            Some((_, record)) => Ok(Some(serde_json::from_str(&record)?)),
            None => Ok(None),
        }
    }

    /// All tasks under one namespace + project, in stable scan order.
    pub async fn get_tasks(&self, namespace: &str, project_id: &str) -> Result<Vec<Task>> {
        let pattern = format!("{}:{}:*", namespace, project_id);
        let hits = self.store.hash_scan(TASK_TABLE, &pattern).await?;
        let mut tasks = Vec::with_capacity(hits.len());
        for (_, record) in hits {
            tasks.push(serde_json::from_str(&record)?);
        }
        Ok(tasks)
    }

    pub async fn get_queue_length(&self) -> Result<usize> {
        self.store.list_len(QUEUE_KEY).await
    }

    pub async fn get_queued_tasks(&self) -> Result<Vec<String>> {
        self.store.list_range(QUEUE_KEY).await
    }
}
