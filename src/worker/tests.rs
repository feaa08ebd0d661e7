use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::config::DeploymentConfig;
use crate::event::EventRegistry;
use crate::store::MemoryStore;

struct RecordingExecutor {
    task_type: TaskType,
    executed: AtomicUsize,
    fail_with: Option<String>,
}

impl RecordingExecutor {
    fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            executed: AtomicUsize::new(0),
            fail_with: None,
        }
    }

    fn failing(task_type: TaskType, reason: &str) -> Self {
        Self {
            task_type,
            executed: AtomicUsize::new(0),
            fail_with: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    fn task_type(&self) -> TaskType {
        self.task_type
    }

    async fn execute(&self, task: &Task, log: &EventLog) -> Result<()> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        log.store_event(
            &task.task_id,
            &Event::new(
                EventKind::Build(BuildFields {
                    stream: Some("Step 1/1 : FROM base".to_string()),
                }),
                EventStatus::Progress,
            ),
        )
        .await?;
        match &self.fail_with {
            Some(reason) => Err(anyhow::anyhow!("{}", reason)),
            None => Ok(()),
        }
    }
}

struct TestEnv {
    queue: TaskQueue,
    log: Arc<EventLog>,
}

fn setup() -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    TestEnv {
        queue: TaskQueue::new(store.clone()),
        log: Arc::new(EventLog::new(store, Arc::new(EventRegistry::default()))),
    }
}

fn worker_with(env: &TestEnv, executor: Arc<dyn Executor>) -> Worker {
    let mut executors: HashMap<TaskType, Arc<dyn Executor>> = HashMap::new();
    executors.insert(executor.task_type(), executor);
    Worker::new(env.queue.clone(), env.log.clone(), Arc::new(executors))
}

async fn enqueue(env: &TestEnv, task_type: TaskType) -> String {
    let config = DeploymentConfig::builder("ns1", "p1").build();
    env.queue
        .queue_task(task_type, &config, "p1", None, None)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_worker_brackets_execution_with_events() {
    let env = setup();
    let executor = Arc::new(RecordingExecutor::new(TaskType::Build));
    let worker = worker_with(&env, executor.clone());
    let task_id = enqueue(&env, TaskType::Build).await;

    assert!(worker.process_next_task().await.unwrap());
    assert_eq!(executor.executed.load(Ordering::SeqCst), 1);
    assert_eq!(env.queue.get_queue_length().await.unwrap(), 0);

    let events = env.log.get_task_events(&task_id, None).await.unwrap();
    let statuses: Vec<_> = events.iter().map(|e| e.status).collect();
    // newest first: completed, executor progress, started
    assert_eq!(
        statuses,
        vec![EventStatus::Completed, EventStatus::Progress, EventStatus::Started]
    );
}

#[tokio::test]
async fn test_worker_records_executor_failure() {
    let env = setup();
    let executor = Arc::new(RecordingExecutor::failing(TaskType::Serve, "image pull backoff"));
    let worker = worker_with(&env, executor);
    let task_id = enqueue(&env, TaskType::Serve).await;

    assert!(worker.process_next_task().await.unwrap());

    let status = env.log.get_task_status(&task_id).await.unwrap().unwrap();
    assert_eq!(status.status, EventStatus::Error);
    assert!(status.message.contains("image pull backoff"));
}

#[tokio::test]
async fn test_missing_executor_is_a_task_error_not_a_crash() {
    let env = setup();
    // only build tasks are executable, but a run task arrives
    let executor = Arc::new(RecordingExecutor::new(TaskType::Build));
    let worker = worker_with(&env, executor.clone());
    let task_id = enqueue(&env, TaskType::Run).await;

    assert!(worker.process_next_task().await.unwrap());
    assert_eq!(executor.executed.load(Ordering::SeqCst), 0);

    let status = env.log.get_task_status(&task_id).await.unwrap().unwrap();
    assert_eq!(status.status, EventStatus::Error);
    assert!(status.message.contains("No executor registered"));
}

#[tokio::test]
async fn test_empty_queue_reports_idle() {
    let env = setup();
    let worker = worker_with(&env, Arc::new(RecordingExecutor::new(TaskType::Build)));
    assert!(!worker.process_next_task().await.unwrap());
}
