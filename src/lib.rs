pub mod config;
pub mod event;
pub mod eventlog;
pub mod queue;
pub mod store;
pub mod utils;
pub mod worker;

use std::env;
use std::sync::Arc;

use once_cell::sync::Lazy;

pub use config::{ConfigBuilder, ConfigError, DeploymentConfig, DeploymentPack};
pub use event::{Event, EventError, EventKind, EventRecord, EventRegistry, EventStatus};
pub use eventlog::EventLog;
pub use queue::{Task, TaskQueue, TaskType};
pub use store::{MemoryStore, Store};
pub use worker::{Executor, Worker, WorkerPool};

const DEFAULT_DEPLOYMENT_DOMAIN: &str = "deploy.localhost";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Domain suffix for derived hostnames (`{project_id}.{domain}`).
pub static DEPLOYMENT_DOMAIN: Lazy<String> = Lazy::new(|| {
    match env::var("JOCKEY_DEPLOYMENT_DOMAIN") {
        Ok(domain) => domain,
        Err(_) => dotenv::var("JOCKEY_DEPLOYMENT_DOMAIN")
            .unwrap_or_else(|_| DEFAULT_DEPLOYMENT_DOMAIN.to_string()),
    }
});

pub static LOG_DIR: Lazy<String> = Lazy::new(|| {
    match env::var("JOCKEY_LOG_DIR") {
        Ok(dir) => dir,
        Err(_) => dotenv::var("JOCKEY_LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string()),
    }
});

/// Worker idle poll interval in milliseconds.
pub static POLL_INTERVAL_MS: Lazy<u64> = Lazy::new(|| {
    env::var("JOCKEY_POLL_INTERVAL_MS")
        .or_else(|_| dotenv::var("JOCKEY_POLL_INTERVAL_MS"))
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
});

pub fn init_env() {
    dotenv::dotenv().ok();
}

/// Composition root: one store, one event-type registry, and the queue
/// and log views over them. The registry lives here, not in globals, so
/// isolated instances can be built freely.
pub struct Jockey {
    pub store: Arc<dyn Store>,
    pub registry: Arc<EventRegistry>,
    pub queue: TaskQueue,
    pub events: Arc<EventLog>,
}

impl Jockey {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let registry = Arc::new(EventRegistry::default());
        let queue = TaskQueue::new(store.clone());
        let events = Arc::new(EventLog::new(store.clone(), registry.clone()));
        Self {
            store,
            registry,
            queue,
            events,
        }
    }
}
