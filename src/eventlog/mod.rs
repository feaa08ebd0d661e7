use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::event::{Event, EventRecord, EventRegistry};
use crate::queue::TaskQueue;
use crate::store::Store;

/// Sorted-set key holding one task's event log.
pub fn events_key(task_id: &str) -> String {
    format!("events:{}", task_id)
}

/// Stored wrapper tying one event to one task at one moment. Namespace
/// and project are copied from the task at store time; `timestamp` is the
/// storage clock and the only sort/filter key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub namespace: String,
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: EventRecord,
}

/// Append-only, per-task, time-ordered record of status events.
pub struct EventLog {
    store: Arc<dyn Store>,
    registry: Arc<EventRegistry>,
    queue: TaskQueue,
}

impl EventLog {
    pub fn new(store: Arc<dyn Store>, registry: Arc<EventRegistry>) -> Self {
        let queue = TaskQueue::new(store.clone());
        Self {
            store,
            registry,
            queue,
        }
    }

    /// Appends an event to the task's log, stamped with the current time.
    /// Events for an unknown task are not actionable: logged and dropped.
    pub async fn store_event(&self, task_id: &str, event: &Event) -> Result<()> {
        self.store_event_at(task_id, event, Utc::now()).await
    }

    pub(crate) async fn store_event_at(
        &self,
        task_id: &str,
        event: &Event,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let task = match self.queue.get_task_data(task_id).await? {
            Some(task) => task,
            None => {
                warn!(
                    "Dropping {} event for unknown task {}",
                    event.event_type(),
                    task_id
                );
                return Ok(());
            }
        };

        let entry = LogEntry {
            namespace: task.namespace,
            project_id: task.project_id,
            timestamp,
            event: event.serialize()?,
        };
        self.store
            .zset_add(
                &events_key(task_id),
                timestamp.timestamp_millis(),
                serde_json::to_string(&entry)?,
            )
            .await
    }

    /// Events newest-first. With `start_time` set, only entries stored
    /// strictly after it are returned, so pollers never see the same
    /// event twice. Entries that fail to parse or decode are skipped;
    /// the rest of the log is still served.
    pub async fn get_task_events(
        &self,
        task_id: &str,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<Event>> {
        let min = start_time.map(|t| t.timestamp_millis());
        let members = self
            .store
            .zset_rev_range_by_score(&events_key(task_id), min)
            .await?;

        let mut events = Vec::with_capacity(members.len());
        for (_, raw) in members {
            if let Some(event) = self.decode_entry(task_id, &raw) {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// The single most recent event, or `None` for a task with no log.
    pub async fn get_task_status(&self, task_id: &str) -> Result<Option<Event>> {
        let members = self
            .store
            .zset_rev_range_by_score(&events_key(task_id), None)
            .await?;
        for (_, raw) in members {
            if let Some(event) = self.decode_entry(task_id, &raw) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    fn decode_entry(&self, task_id: &str, raw: &str) -> Option<Event> {
        let entry: LogEntry = match serde_json::from_str(raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable log entry for task {}: {}", task_id, e);
                return None;
            }
        };
        match self.registry.deserialize(&entry.event) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Skipping undecodable event for task {}: {}", task_id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests;
