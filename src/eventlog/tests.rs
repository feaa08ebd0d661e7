use std::sync::Arc;

use chrono::{Duration, Utc};

use super::*;
use crate::config::DeploymentConfig;
use crate::event::{BuildFields, DeploymentFields, EventKind, EventStatus, RepositoryFields};
use crate::queue::TaskType;
use crate::store::MemoryStore;

struct TestEnv {
    store: Arc<MemoryStore>,
    queue: TaskQueue,
    log: EventLog,
}

async fn setup(task_type: TaskType, ports: Vec<u16>) -> (TestEnv, String) {
    let store = Arc::new(MemoryStore::new());
    let queue = TaskQueue::new(store.clone());
    let log = EventLog::new(store.clone(), Arc::new(EventRegistry::default()));

    let config = DeploymentConfig::builder("ns1", "p1")
        .with_ports(ports)
        .build();
    let task_id = queue
        .queue_task(task_type, &config, "p1", None, None)
        .await
        .unwrap();

    (TestEnv { store, queue, log }, task_id)
}

fn build_event(status: EventStatus, stream: &str) -> Event {
    Event::new(
        EventKind::Build(BuildFields {
            stream: Some(stream.to_string()),
        }),
        status,
    )
}

#[tokio::test]
async fn test_events_come_back_newest_first() {
    let (env, task_id) = setup(TaskType::Build, vec![]).await;
    let base = Utc::now();

    for (offset_ms, stream) in [(0, "one"), (10, "two"), (20, "three")] {
        env.log
            .store_event_at(
                &task_id,
                &build_event(EventStatus::Progress, stream),
                base + Duration::milliseconds(offset_ms),
            )
            .await
            .unwrap();
    }

    let events = env.log.get_task_events(&task_id, None).await.unwrap();
    let streams: Vec<_> = events
        .iter()
        .map(|e| match &e.kind {
            EventKind::Build(f) => f.stream.clone().unwrap(),
            _ => panic!("expected build events"),
        })
        .collect();
    assert_eq!(streams, vec!["three", "two", "one"]);
}

#[tokio::test]
async fn test_start_time_boundary_is_strictly_exclusive() {
    let (env, task_id) = setup(TaskType::Build, vec![]).await;
    let t = Utc::now();

    env.log
        .store_event_at(&task_id, &build_event(EventStatus::Started, "at-t"), t)
        .await
        .unwrap();
    env.log
        .store_event_at(
            &task_id,
            &build_event(EventStatus::Progress, "after-t"),
            t + Duration::milliseconds(1),
        )
        .await
        .unwrap();

    let events = env.log.get_task_events(&task_id, Some(t)).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Progress);
}

#[tokio::test]
async fn test_status_is_the_most_recent_event() {
    let (env, task_id) = setup(TaskType::Serve, vec![]).await;
    let base = Utc::now();

    env.log
        .store_event_at(
            &task_id,
            &Event::new(
                EventKind::Deployment(DeploymentFields::default()),
                EventStatus::Started,
            ),
            base,
        )
        .await
        .unwrap();
    env.log
        .store_event_at(
            &task_id,
            &Event::new(
                EventKind::Deployment(DeploymentFields::default()),
                EventStatus::Completed,
            ),
            base + Duration::milliseconds(5),
        )
        .await
        .unwrap();

    let status = env.log.get_task_status(&task_id).await.unwrap().unwrap();
    assert_eq!(status.status, EventStatus::Completed);
}

#[tokio::test]
async fn test_no_events_means_no_status() {
    let (env, task_id) = setup(TaskType::Serve, vec![]).await;
    assert!(env.log.get_task_status(&task_id).await.unwrap().is_none());
    assert!(env
        .log
        .get_task_events(&task_id, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_event_for_unknown_task_is_dropped() {
    let store = Arc::new(MemoryStore::new());
    let log = EventLog::new(store.clone(), Arc::new(EventRegistry::default()));

    log.store_event("vanished-task", &build_event(EventStatus::Started, "x"))
        .await
        .unwrap();

    assert!(log
        .get_task_events("vanished-task", None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_corrupt_entries_are_skipped_not_fatal() {
    let (env, task_id) = setup(TaskType::Build, vec![]).await;
    let base = Utc::now();

    env.log
        .store_event_at(&task_id, &build_event(EventStatus::Started, "good"), base)
        .await
        .unwrap();
    // raw garbage wedged into the log
    env.store
        .zset_add(
            &events_key(&task_id),
            (base + Duration::milliseconds(1)).timestamp_millis(),
            "{not json".to_string(),
        )
        .await
        .unwrap();
    // a well-formed entry for a type nobody registered
    let stray = LogEntry {
        namespace: "ns1".to_string(),
        project_id: "p1".to_string(),
        timestamp: base + Duration::milliseconds(2),
        event: crate::event::EventRecord {
            event_type: "retired_type".to_string(),
            status: EventStatus::Progress,
            message: "m".to_string(),
            payload: serde_json::Map::new(),
            kwargs: serde_json::Map::new(),
        },
    };
    env.store
        .zset_add(
            &events_key(&task_id),
            stray.timestamp.timestamp_millis(),
            serde_json::to_string(&stray).unwrap(),
        )
        .await
        .unwrap();
    env.log
        .store_event_at(
            &task_id,
            &build_event(EventStatus::Completed, "also good"),
            base + Duration::milliseconds(3),
        )
        .await
        .unwrap();

    let events = env.log.get_task_events(&task_id, None).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].status, EventStatus::Completed);
    assert_eq!(events[1].status, EventStatus::Started);

    // status must also skip past undecodable entries
    let status = env.log.get_task_status(&task_id).await.unwrap().unwrap();
    assert_eq!(status.status, EventStatus::Completed);
}

#[tokio::test]
async fn test_serve_task_lifecycle() {
    let (env, task_id) = setup(TaskType::Serve, vec![8080]).await;

    assert_eq!(env.queue.get_queue_length().await.unwrap(), 1);

    let claimed = env.queue.claim_next_task().await.unwrap().unwrap();
    assert_eq!(claimed.task_id, task_id);
    assert_eq!(env.queue.get_queue_length().await.unwrap(), 0);
    assert_eq!(claimed.config.ports, vec![8080]);

    let base = Utc::now();
    env.log
        .store_event_at(
            &task_id,
            &Event::new(
                EventKind::Repository(RepositoryFields {
                    step: "clone".to_string(),
                }),
                EventStatus::Started,
            ),
            base,
        )
        .await
        .unwrap();
    env.log
        .store_event_at(
            &task_id,
            &Event::new(
                EventKind::Deployment(DeploymentFields {
                    available_replicas: Some(1),
                    ready_replicas: Some(1),
                    desired_replicas: Some(1),
                    phase: Some("Available".to_string()),
                }),
                EventStatus::Completed,
            ),
            base + Duration::milliseconds(50),
        )
        .await
        .unwrap();

    let status = env.log.get_task_status(&task_id).await.unwrap().unwrap();
    assert_eq!(status.status, EventStatus::Completed);
    assert_eq!(env.log.get_task_events(&task_id, None).await.unwrap().len(), 2);
}
