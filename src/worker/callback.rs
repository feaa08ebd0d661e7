use anyhow::Result;
use serde::Serialize;

use crate::event::{Event, EventStatus};
use crate::queue::Task;

#[derive(Debug, Serialize)]
struct CallbackPayload<'a> {
    task_id: &'a str,
    status: EventStatus,
    message: &'a str,
}

/// Posts terminal task status to the caller-supplied callback URL. The
/// URL itself is opaque to the queue; delivery failures are the caller's
/// loss, never the worker's.
pub struct HttpCallback {
    client: reqwest::Client,
}

impl HttpCallback {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn notify(&self, url: &str, task: &Task, event: &Event) -> Result<()> {
        let payload = CallbackPayload {
            task_id: &task.task_id,
            status: event.status,
            message: &event.message,
        };
        self.client.post(url).json(&payload).send().await?;
        Ok(())
    }
}

impl Default for HttpCallback {
    fn default() -> Self {
        Self::new()
    }
}
