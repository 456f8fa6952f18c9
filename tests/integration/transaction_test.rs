// tests/integration/transaction_test.rs

//! Integration tests for the transaction stage over the in-memory store:
//! staged writes become visible on commit and vanish on rollback.

use super::test_helpers::{init_tracing, test_registry};
use actiongate::config::PipelineConfig;
use actiongate::core::handler::{ActionHandler, Pipeline};
use actiongate::core::response::ActionResponse;
use actiongate::core::storage::MemoryStore;
use actiongate::core::PendingInvocation;
use anyhow::bail;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Writes two keys, then optionally fails.
struct WriteThenMaybeFail {
    store: MemoryStore,
    fail: bool,
}

#[async_trait]
impl ActionHandler for WriteThenMaybeFail {
    async fn call(&self, invocation: &PendingInvocation) -> anyhow::Result<ActionResponse> {
        let id = invocation.request_id();
        self.store.put(id, "a", json!(1))?;
        self.store.put(id, "b", json!(2))?;
        // The handler sees its own staged writes.
        assert_eq!(self.store.get(id, "a"), Some(json!(1)));
        if self.fail {
            bail!("db write failed");
        }
        Ok(ActionResponse::ok(json!({ "written": 2 })))
    }
}

fn pipeline(store: &MemoryStore, fail: bool) -> Pipeline {
    init_tracing();
    Pipeline::standard(
        Arc::new(WriteThenMaybeFail {
            store: store.clone(),
            fail,
        }),
        Arc::new(test_registry()),
        Arc::new(store.clone()),
        &PipelineConfig::default(),
    )
}

#[tokio::test]
async fn test_commit_publishes_staged_writes() {
    let store = MemoryStore::new();

    let response = pipeline(&store, false)
        .execute(PendingInvocation::new(1, "write"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(store.get_committed("a"), Some(json!(1)));
    assert_eq!(store.get_committed("b"), Some(json!(2)));
    assert_eq!(store.active_transactions(), 0);
}

#[tokio::test]
async fn test_rollback_discards_staged_writes() {
    let store = MemoryStore::new();

    let response = pipeline(&store, true)
        .execute(PendingInvocation::new(1, "write"))
        .await
        .unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(response.body["Message"], json!("db write failed"));
    assert!(store.is_empty());
    assert_eq!(store.active_transactions(), 0);
}

#[tokio::test]
async fn test_request_id_collision_surfaces_open_failure() {
    let store = MemoryStore::new();
    let factory: &dyn actiongate::core::unit_of_work::UnitOfWorkFactory = &store;
    let mut squatter = factory.create(9);
    squatter.begin_transaction().await.unwrap();

    let err = pipeline(&store, false)
        .execute(PendingInvocation::new(9, "write"))
        .await
        .unwrap_err();

    assert!(err.is_infrastructure());
    assert!(err.to_string().contains("open"));
    assert!(store.is_empty());
}
