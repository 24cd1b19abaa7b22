//! Behavioural coverage for the task synchronization service.

use std::sync::Arc;

use rstest::rstest;

use crate::domain::ports::{
    ChangeRecorderError, DocumentStoreError, MockChangeRecorder, MockDocumentStore, MockUpdateBus,
    TasksCommand, TasksQuery, UpdateBus, UpdateBusError,
};
use crate::domain::{
    ChangeAction, CreateTaskPayload, ErrorCode, TASK_UPDATES_TOPIC, TaskFilter, TaskId, TaskStatus,
    TaskSyncService, TaskUpdate, UpdateTaskPayload, UserId,
};
use crate::outbound::memory::{
    MemoryChangeRecorder, MemoryDocumentStore, MemorySearchIndex, MemoryUpdateBus,
};

struct Fixture {
    service: TaskSyncService,
    recorder: Arc<MemoryChangeRecorder>,
    bus: Arc<MemoryUpdateBus>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryDocumentStore::new());
    let index = Arc::new(MemorySearchIndex::new());
    let recorder = Arc::new(MemoryChangeRecorder::new());
    let bus = Arc::new(MemoryUpdateBus::new());
    let service = TaskSyncService::new(store, index, recorder.clone(), bus.clone());
    Fixture {
        service,
        recorder,
        bus,
    }
}

fn payload(title: &str, category: Option<&str>) -> CreateTaskPayload {
    CreateTaskPayload {
        title: title.to_owned(),
        description: None,
        category: category.map(str::to_owned),
    }
}

fn status_update(status: TaskStatus) -> UpdateTaskPayload {
    UpdateTaskPayload {
        status: Some(status),
        ..UpdateTaskPayload::default()
    }
}

#[rstest]
#[tokio::test]
async fn create_then_get_round_trips_for_the_owner() {
    let fx = fixture();
    let owner = UserId::random();

    let created = fx
        .service
        .create(&owner, payload("Buy milk", Some("Errands")))
        .await
        .expect("create must succeed");
    let fetched = fx
        .service
        .get(&owner, &created.id)
        .await
        .expect("owner must see the task");

    assert_eq!(fetched, created);
    assert!(!fetched.completed);
}

#[rstest]
#[tokio::test]
async fn list_is_scoped_to_the_owner() {
    let fx = fixture();
    let alice = UserId::random();
    let bob = UserId::random();

    let task = fx
        .service
        .create(&alice, payload("Buy milk", None))
        .await
        .expect("create must succeed");

    let for_alice = fx
        .service
        .list(&alice, &TaskFilter::default())
        .await
        .expect("list must succeed");
    let for_bob = fx
        .service
        .list(&bob, &TaskFilter::default())
        .await
        .expect("list must succeed");

    assert_eq!(for_alice.len(), 1);
    assert_eq!(for_alice[0].id, task.id);
    assert!(for_bob.is_empty());
}

#[rstest]
#[tokio::test]
async fn foreign_tasks_read_as_not_found() {
    let fx = fixture();
    let alice = UserId::random();
    let bob = UserId::random();
    let task = fx
        .service
        .create(&alice, payload("Buy milk", None))
        .await
        .expect("create must succeed");

    for error in [
        fx.service.get(&bob, &task.id).await.expect_err("foreign get"),
        fx.service
            .update(&bob, &task.id, status_update(TaskStatus::Done))
            .await
            .expect_err("foreign update"),
        fx.service
            .remove(&bob, &task.id)
            .await
            .expect_err("foreign remove"),
    ] {
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    // The owner still sees an untouched task.
    let current = fx
        .service
        .get(&alice, &task.id)
        .await
        .expect("owner must see the task");
    assert_eq!(current.status, TaskStatus::Open);
}

#[rstest]
#[case(TaskStatus::Done, true)]
#[case(TaskStatus::InProgress, false)]
#[case(TaskStatus::Open, false)]
#[tokio::test]
async fn updating_status_recomputes_completed(
    #[case] status: TaskStatus,
    #[case] expected: bool,
) {
    let fx = fixture();
    let owner = UserId::random();
    let task = fx
        .service
        .create(&owner, payload("Buy milk", None))
        .await
        .expect("create must succeed");

    let updated = fx
        .service
        .update(&owner, &task.id, status_update(status))
        .await
        .expect("update must succeed");

    assert_eq!(updated.completed, expected);
    assert!(updated.updated_at >= task.updated_at);
}

#[rstest]
#[tokio::test]
async fn removed_tasks_disappear_from_reads() {
    let fx = fixture();
    let owner = UserId::random();
    let task = fx
        .service
        .create(&owner, payload("Buy milk", None))
        .await
        .expect("create must succeed");

    fx.service
        .remove(&owner, &task.id)
        .await
        .expect("remove must succeed");

    let listed = fx
        .service
        .list(&owner, &TaskFilter::default())
        .await
        .expect("list must succeed");
    assert!(listed.is_empty());
    let error = fx
        .service
        .get(&owner, &task.id)
        .await
        .expect_err("deleted task must be gone");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn recently_updated_tasks_list_first() {
    let fx = fixture();
    let owner = UserId::random();
    let mut ids = Vec::new();
    for title in ["first", "second", "third"] {
        let task = fx
            .service
            .create(&owner, payload(title, None))
            .await
            .expect("create must succeed");
        ids.push(task.id);
        // Distinct update timestamps keep the ordering assertion exact.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    // Touching the oldest task moves it to the front of the list.
    fx.service
        .update(&owner, &ids[0], status_update(TaskStatus::InProgress))
        .await
        .expect("update must succeed");

    let titles: Vec<String> = fx
        .service
        .list(&owner, &TaskFilter::default())
        .await
        .expect("list must succeed")
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(titles, ["first", "third", "second"]);
}

#[rstest]
#[tokio::test]
async fn every_mutation_lands_in_the_change_log_and_on_the_bus() {
    let fx = fixture();
    let owner = UserId::random();
    let mut updates = fx
        .bus
        .subscribe(TASK_UPDATES_TOPIC)
        .await
        .expect("subscribe must succeed");

    let task = fx
        .service
        .create(&owner, payload("Buy milk", Some("Errands")))
        .await
        .expect("create must succeed");

    let recorded = fx.recorder.recorded().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].action, ChangeAction::Created);
    assert_eq!(recorded[0].task_id, task.id);
    assert_eq!(recorded[0].category, "Errands");

    let published = updates.recv().await.expect("a payload must be published");
    let update: TaskUpdate = serde_json::from_str(&published).expect("payload must parse");
    assert_eq!(update.action, ChangeAction::Created);
    assert_eq!(update.task.id, task.id);
    assert_eq!(update.user_id, Some(owner));
}

#[rstest]
#[tokio::test]
async fn recorder_failure_does_not_fail_the_mutation() {
    let store = Arc::new(MemoryDocumentStore::new());
    let index = Arc::new(MemorySearchIndex::new());
    let mut recorder = MockChangeRecorder::new();
    recorder
        .expect_append()
        .returning(|_| Err(ChangeRecorderError::append("stream unreachable")));
    let service = TaskSyncService::new(
        store,
        index,
        Arc::new(recorder),
        Arc::new(MemoryUpdateBus::new()),
    );

    let owner = UserId::random();
    let task = service
        .create(&owner, payload("Buy milk", None))
        .await
        .expect("create must survive a recorder outage");
    assert_eq!(
        service
            .get(&owner, &task.id)
            .await
            .expect("task must be readable")
            .id,
        task.id
    );
}

#[rstest]
#[tokio::test]
async fn bus_failure_does_not_fail_the_mutation() {
    let mut bus = MockUpdateBus::new();
    bus.expect_publish()
        .returning(|_, _| Err(UpdateBusError::publish("broker unreachable")));
    let service = TaskSyncService::new(
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(MemorySearchIndex::new()),
        Arc::new(MemoryChangeRecorder::new()),
        Arc::new(bus),
    );

    service
        .create(&UserId::random(), payload("Buy milk", None))
        .await
        .expect("create must survive a bus outage");
}

#[rstest]
#[tokio::test]
async fn store_failure_fails_the_request() {
    let mut store = MockDocumentStore::new();
    store
        .expect_put()
        .returning(|_, _, _| Err(DocumentStoreError::connection("store unreachable")));
    let service = TaskSyncService::new(
        Arc::new(store),
        Arc::new(MemorySearchIndex::new()),
        Arc::new(MemoryChangeRecorder::new()),
        Arc::new(MemoryUpdateBus::new()),
    );

    let error = service
        .create(&UserId::random(), payload("Buy milk", None))
        .await
        .expect_err("store outage must fail the request");
    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn unknown_ids_are_not_found() {
    let fx = fixture();
    let owner = UserId::random();
    let error = fx
        .service
        .update(&owner, &TaskId::random(), status_update(TaskStatus::Done))
        .await
        .expect_err("unknown id must be rejected");
    assert_eq!(error.code(), ErrorCode::NotFound);
}
