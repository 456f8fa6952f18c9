// tests/integration/accounts_test.rs

//! Integration tests for the bundled accounts actions running on the in-memory store.

use super::test_helpers::init_tracing;
use actiongate::app;
use actiongate::config::PipelineConfig;
use actiongate::core::errors::{ActionGateError, StoreError, TransactionPhase};
use actiongate::core::handler::ActionRouter;
use actiongate::core::storage::MemoryStore;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

struct AccountsContext {
    store: MemoryStore,
    router: ActionRouter,
    next_id: AtomicU64,
}

impl AccountsContext {
    fn new() -> Self {
        init_tracing();
        let store = MemoryStore::new();
        let router = app::build_router(store.clone(), &PipelineConfig::default());
        Self {
            store,
            router,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, action: &str, body: Value) -> Result<(u16, Value), ActionGateError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let response = self.router.dispatch(id, action, &body).await?;
        Ok((response.status, response.body))
    }

    async fn open(&self, email: &str, name: &str) -> (u16, Value) {
        self.call(
            "open_account",
            json!({ "account": { "email": email, "display_name": name } }),
        )
        .await
        .unwrap()
    }
}

#[tokio::test]
async fn test_open_account_commits() {
    let ctx = AccountsContext::new();

    let (status, body) = ctx.open("ada@example.com", "Ada").await;

    assert_eq!(status, 201);
    assert_eq!(body["balance_cents"], json!(0));
    assert!(ctx.store.get_committed("account:ada@example.com").is_some());
    assert_eq!(ctx.store.active_transactions(), 0);
}

#[tokio::test]
async fn test_open_account_with_bad_email_is_rejected() {
    let ctx = AccountsContext::new();

    let (status, body) = ctx.open("bad", "Ada").await;

    assert_eq!(status, 400);
    assert_eq!(
        body["Payload"],
        json!({ "Errors": { "email": ["must contain @"] } })
    );
    assert!(ctx.store.is_empty());
}

#[tokio::test]
async fn test_duplicate_account_rolls_back() {
    let ctx = AccountsContext::new();
    ctx.open("ada@example.com", "Ada").await;

    let (status, body) = ctx.open("ADA@example.com", "Someone Else").await;

    assert_eq!(status, 500);
    assert_eq!(
        body["Message"],
        json!("account 'ADA@example.com' already exists")
    );
    let stored = ctx.store.get_committed("account:ada@example.com").unwrap();
    assert_eq!(stored["display_name"], json!("Ada"));
    assert_eq!(ctx.store.len(), 1);
    assert_eq!(ctx.store.active_transactions(), 0);
}

#[tokio::test]
async fn test_deposit_updates_balance() {
    let ctx = AccountsContext::new();
    ctx.open("ada@example.com", "Ada").await;

    let (status, body) = ctx
        .call(
            "deposit",
            json!({ "deposit": { "email": "ada@example.com", "amount_cents": 1250 } }),
        )
        .await
        .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["balance_cents"], json!(1250));

    let (status, body) = ctx
        .call("get_account", json!({ "email": "ada@example.com" }))
        .await
        .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["balance_cents"], json!(1250));
}

#[tokio::test]
async fn test_deposit_validation_reports_every_field() {
    let ctx = AccountsContext::new();

    let (status, body) = ctx
        .call(
            "deposit",
            json!({ "deposit": { "email": "nobody", "amount_cents": 0 } }),
        )
        .await
        .unwrap();

    assert_eq!(status, 400);
    assert_eq!(
        body["Payload"]["Errors"],
        json!({
            "email": ["must contain @"],
            "amount_cents": ["must be greater than 0"],
        })
    );
}

#[tokio::test]
async fn test_deposit_to_missing_account_is_a_fault() {
    let ctx = AccountsContext::new();

    let (status, body) = ctx
        .call(
            "deposit",
            json!({ "deposit": { "email": "ghost@example.com", "amount_cents": 5 } }),
        )
        .await
        .unwrap();

    assert_eq!(status, 500);
    assert_eq!(
        body["Message"],
        json!("account 'ghost@example.com' does not exist")
    );
    assert!(ctx.store.is_empty());
}

#[tokio::test]
async fn test_missing_argument_reaches_handler_as_absent() {
    let ctx = AccountsContext::new();

    let (status, body) = ctx.call("open_account", json!({})).await.unwrap();

    assert_eq!(status, 500);
    assert_eq!(body["Message"], json!("missing required argument 'account'"));
}

#[tokio::test]
async fn test_get_unknown_account_returns_not_found() {
    let ctx = AccountsContext::new();

    let (status, _) = ctx
        .call("get_account", json!({ "email": "ghost@example.com" }))
        .await
        .unwrap();

    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_unknown_action_is_an_error() {
    let ctx = AccountsContext::new();

    let err = ctx.call("close_account", json!({})).await.unwrap_err();

    assert_eq!(err, ActionGateError::UnknownAction("close_account".into()));
}

#[tokio::test]
async fn test_mistyped_argument_fails_binding() {
    let ctx = AccountsContext::new();

    let err = ctx
        .call("get_account", json!({ "email": 17 }))
        .await
        .unwrap_err();

    match err {
        ActionGateError::ArgumentBinding { name, .. } => assert_eq!(name, "email"),
        other => panic!("Expected ArgumentBinding error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_object_body_fails_binding() {
    let ctx = AccountsContext::new();

    let err = ctx.call("get_account", json!([1, 2])).await.unwrap_err();

    assert!(matches!(err, ActionGateError::ArgumentBinding { .. }));
}

#[tokio::test]
async fn test_concurrent_deposits_are_isolated() {
    let ctx = AccountsContext::new();
    for i in 0..8 {
        ctx.open(&format!("user{i}@example.com"), "User").await;
    }

    let calls = (0..8).map(|i| {
        ctx.call(
            "deposit",
            json!({ "deposit": { "email": format!("user{i}@example.com"), "amount_cents": 100 } }),
        )
    });
    let results = futures::future::join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap().0, 200);
    }
    assert_eq!(ctx.store.active_transactions(), 0);
    for i in 0..8 {
        let stored = ctx
            .store
            .get_committed(&format!("account:user{i}@example.com"))
            .unwrap();
        assert_eq!(stored["balance_cents"], json!(100));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_deposits_to_one_account_never_lose_writes() {
    let ctx = Arc::new(AccountsContext::new());
    ctx.open("shared@example.com", "Shared").await;

    let deposits = (0..500).map(|_| {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            ctx.call(
                "deposit",
                json!({ "deposit": { "email": "shared@example.com", "amount_cents": 1 } }),
            )
            .await
        })
    });
    let results = futures::future::join_all(deposits).await;

    let mut acknowledged = 0;
    for result in results {
        match result.unwrap() {
            Ok((status, _)) => {
                assert_eq!(status, 200);
                acknowledged += 1;
            }
            Err(e) => assert!(matches!(
                e,
                ActionGateError::Infrastructure {
                    phase: TransactionPhase::Commit,
                    source: StoreError::Conflict { .. },
                }
            )),
        }
    }

    assert!(acknowledged > 0);
    let stored = ctx
        .store
        .get_committed("account:shared@example.com")
        .unwrap();
    assert_eq!(stored["balance_cents"], json!(acknowledged));
    assert_eq!(ctx.store.active_transactions(), 0);
}

#[test]
fn test_router_lists_actions() {
    let ctx = AccountsContext::new();
    assert_eq!(
        ctx.router.action_names(),
        vec!["deposit", "get_account", "open_account"]
    );
}
