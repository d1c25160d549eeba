//! Integration tests for the todo flow.
//!
//! These run the real flow against the in-memory engine, which enforces the
//! same lifecycle rules as OpenSearch.

use std::sync::Arc;

use index_provisioner::demo::sample_todo;
use index_provisioner::{run_todo_demo, AppError};
use index_provisioner_repository::{
    EngineOperation, Fault, IndexLifecycleState, IndexLocks, IndexName, MockSearchEngine,
    ProvisionError, SearchIndexService,
};

fn todos() -> IndexName {
    IndexName::new("todos").unwrap()
}

fn setup() -> (Arc<MockSearchEngine>, SearchIndexService, IndexLocks) {
    let engine = Arc::new(MockSearchEngine::new());
    let service = SearchIndexService::new(engine.clone());
    (engine, service, IndexLocks::new())
}

#[tokio::test]
async fn test_demo_round_trip() {
    let (_engine, service, locks) = setup();

    let report = run_todo_demo(&service, &locks, todos(), true).await.unwrap();

    assert_eq!(report.stored, sample_todo());
    assert_eq!(
        report.stored.description,
        "Use new @nestjs/elasticsearch module and check if TypeScript type definitions are used correctly"
    );
    assert_eq!(report.fetched, report.stored);
    assert_eq!(report.matches, vec![sample_todo()]);
}

#[tokio::test]
async fn test_demo_runs_twice_with_reset() {
    let (engine, service, locks) = setup();

    run_todo_demo(&service, &locks, todos(), true).await.unwrap();
    engine.clear_calls().await;
    run_todo_demo(&service, &locks, todos(), true).await.unwrap();

    let calls = engine.calls().await;
    assert_eq!(
        &calls[..3],
        &[
            EngineOperation::Exists,
            EngineOperation::Delete,
            EngineOperation::Create
        ]
    );
    assert_eq!(engine.document_count("todos").await, 1);
}

#[tokio::test]
async fn test_demo_without_reset_keeps_index() {
    let (engine, service, locks) = setup();

    run_todo_demo(&service, &locks, todos(), false).await.unwrap();
    run_todo_demo(&service, &locks, todos(), false).await.unwrap();

    assert!(!engine.calls().await.contains(&EngineOperation::Delete));
    assert_eq!(engine.document_count("todos").await, 1);
}

#[tokio::test]
async fn test_demo_reports_partial_configuration() {
    let (engine, service, locks) = setup();
    engine
        .inject_fault(EngineOperation::Open, Fault::transport("connection reset"))
        .await;

    let err = run_todo_demo(&service, &locks, todos(), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::ProvisionError(ProvisionError::PartialConfiguration {
            operation: EngineOperation::Open,
            ..
        })
    ));
    assert_eq!(
        service.provisioner().status(&todos()).await.unwrap(),
        IndexLifecycleState::Closed
    );
    assert!(!engine.calls().await.contains(&EngineOperation::IndexDocument));
}
