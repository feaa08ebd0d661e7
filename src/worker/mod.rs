use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use crate::event::{BuildFields, DeploymentFields, Event, EventKind, EventStatus, PodFields};
use crate::eventlog::EventLog;
use crate::queue::{Task, TaskQueue, TaskType};

mod callback;

pub use callback::HttpCallback;

/// Seam to the cluster side. An executor receives a claimed task and does
/// the actual build/serve/run, reporting intermediate progress through the
/// event log itself.
#[async_trait]
pub trait Executor: Send + Sync {
    fn task_type(&self) -> TaskType;
    async fn execute(&self, task: &Task, log: &EventLog) -> Result<()>;
}

/// One claim loop. Polls the queue, dispatches claimed tasks to the
/// executor registered for their type, and brackets every execution with
/// a started event and a terminal completed/error event.
pub struct Worker {
    queue: TaskQueue,
    log: Arc<EventLog>,
    executors: Arc<HashMap<TaskType, Arc<dyn Executor>>>,
    callback: HttpCallback,
    interval: Duration,
}

impl Worker {
    pub fn new(
        queue: TaskQueue,
        log: Arc<EventLog>,
        executors: Arc<HashMap<TaskType, Arc<dyn Executor>>>,
    ) -> Self {
        Self {
            queue,
            log,
            executors,
            callback: HttpCallback::new(),
            interval: Duration::from_millis(*crate::POLL_INTERVAL_MS),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn run(&self) {
        loop {
            match self.process_next_task().await {
                Ok(true) => continue, // keep draining
                Ok(false) => sleep(self.interval).await,
                Err(e) => {
                    error!("Error processing task: {}", e);
                    sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn process_next_task(&self) -> Result<bool> {
        let task = match self.queue.claim_next_task().await? {
            Some(task) => task,
            None => return Ok(false),
        };

        info!(
            "Claimed {} task {} in namespace {}",
            task.task_type, task.task_id, task.namespace
        );

        let executor = match self.executors.get(&task.task_type) {
            Some(executor) => executor,
            None => {
                let event = Event::with_message(
                    start_kind(task.task_type),
                    EventStatus::Error,
                    format!("No executor registered for {} tasks", task.task_type),
                );
                self.log.store_event(&task.task_id, &event).await?;
                self.notify(&task, &event).await;
                return Ok(true);
            }
        };

        self.log
            .store_event(
                &task.task_id,
                &Event::new(start_kind(task.task_type), EventStatus::Started),
            )
            .await?;

        let terminal = match executor.execute(&task, &self.log).await {
            Ok(()) => {
                info!("Task {} completed", task.task_id);
                Event::new(start_kind(task.task_type), EventStatus::Completed)
            }
            Err(e) => {
                error!("Task {} failed: {}", task.task_id, e);
                Event::with_message(
                    start_kind(task.task_type),
                    EventStatus::Error,
                    format!("{} task failed: {}", task.task_type, e),
                )
            }
        };
        self.log.store_event(&task.task_id, &terminal).await?;
        self.notify(&task, &terminal).await;

        Ok(true)
    }

    async fn notify(&self, task: &Task, event: &Event) {
        let url = task
            .callback_url
            .as_deref()
            .or(task.config.callback_url.as_deref());
        if let Some(url) = url {
            if let Err(e) = self.callback.notify(url, task, event).await {
                error!("Failed to deliver callback for task {}: {}", task.task_id, e);
            }
        }
    }
}

/// The event kind workers use for their own lifecycle reports; executors
/// emit finer-grained kinds themselves.
fn start_kind(task_type: TaskType) -> EventKind {
    match task_type {
        TaskType::Build => EventKind::Build(BuildFields::default()),
        TaskType::Serve => EventKind::Deployment(DeploymentFields::default()),
        TaskType::Run => EventKind::Pod(PodFields::default()),
    }
}

/// Spawns and tracks a set of workers sharing one executor table. Any
/// number of pools may run against the same store; the queue's atomic pop
/// keeps every task with exactly one worker.
pub struct WorkerPool {
    queue: TaskQueue,
    log: Arc<EventLog>,
    executors: HashMap<TaskType, Arc<dyn Executor>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(queue: TaskQueue, log: Arc<EventLog>) -> Self {
        Self {
            queue,
            log,
            executors: HashMap::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn register_executor(&mut self, executor: Arc<dyn Executor>) {
        let task_type = executor.task_type();
        info!("Registering executor for {} tasks", task_type);
        self.executors.insert(task_type, executor);
    }

    pub async fn spawn_worker(&self) {
        let worker = Worker::new(
            self.queue.clone(),
            self.log.clone(),
            Arc::new(self.executors.clone()),
        );
        let handle = tokio::spawn(async move {
            worker.run().await;
        });
        self.workers.lock().await.push(handle);
    }

    pub async fn run(&self) -> Result<()> {
        let mut workers = self.workers.lock().await;
        for worker in workers.drain(..) {
            worker.await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
