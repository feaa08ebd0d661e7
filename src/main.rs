use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use jockey::event::{BuildFields, Event, EventKind, EventStatus};
use jockey::{EventLog, Executor, Jockey, MemoryStore, Task, TaskType, WorkerPool};

/// Stand-in for the cluster executor: acknowledges the claimed task and
/// reports one progress event. Real deployments plug their own Executor
/// implementations into the pool.
struct LogOnlyExecutor {
    task_type: TaskType,
}

#[async_trait]
impl Executor for LogOnlyExecutor {
    fn task_type(&self) -> TaskType {
        self.task_type
    }

    async fn execute(&self, task: &Task, log: &EventLog) -> Result<()> {
        info!(
            "Executing {} task {} (project {}, namespace {})",
            task.task_type, task.task_id, task.project_id, task.namespace
        );
        let event = Event::new(
            EventKind::Build(BuildFields {
                stream: Some(format!("no-op executor handled {}", task.task_id)),
            }),
            EventStatus::Progress,
        );
        log.store_event(&task.task_id, &event).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    jockey::init_env();
    let _guard = jockey::utils::logger::init(&jockey::LOG_DIR)?;

    info!("Starting jockey worker daemon...");

    // In-process store: queue and claimers must share this one process.
    // Swap in a networked Store implementation to spread workers out.
    let store = Arc::new(MemoryStore::new());
    let jockey = Jockey::new(store);

    let mut pool = WorkerPool::new(jockey.queue.clone(), jockey.events.clone());
    pool.register_executor(Arc::new(LogOnlyExecutor {
        task_type: TaskType::Build,
    }));
    pool.register_executor(Arc::new(LogOnlyExecutor {
        task_type: TaskType::Serve,
    }));
    pool.register_executor(Arc::new(LogOnlyExecutor {
        task_type: TaskType::Run,
    }));

    pool.spawn_worker().await;
    pool.spawn_worker().await;

    info!("Workers started, polling for tasks");
    pool.run().await
}
