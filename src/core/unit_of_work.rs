// src/core/unit_of_work.rs

//! The transactional resource abstraction and the request-scoped handle that
//! enforces its lifecycle.

use crate::core::errors::{ActionGateError, StoreError, TransactionPhase};
use crate::core::metrics;
use async_trait::async_trait;
use strum_macros::Display;
use tracing::{debug, error, warn};

/// A transactional resource bound to one request's persistence context.
///
/// Every operation may fail; failures are never retried by the pipeline.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn begin_transaction(&mut self) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;

    /// Releases the resource. Called exactly once per created unit of work.
    async fn dispose(&mut self) -> Result<(), StoreError>;
}

/// Creates a fresh unit of work for a request.
pub trait UnitOfWorkFactory: Send + Sync {
    fn create(&self, request_id: u64) -> Box<dyn UnitOfWork>;
}

/// Lifecycle of a [`UnitOfWorkHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum UnitOfWorkState {
    Idle,
    Active,
    Committed,
    RolledBack,
    Released,
}

/// Owns one unit of work for the duration of a request and enforces
/// `Idle -> Active -> {Committed, RolledBack} -> Released`.
///
/// Dropping a handle that was never released (for example because the request
/// future was cancelled) schedules a rollback and dispose on the current runtime.
pub struct UnitOfWorkHandle {
    request_id: u64,
    state: UnitOfWorkState,
    inner: Option<Box<dyn UnitOfWork>>,
}

impl UnitOfWorkHandle {
    pub fn new(request_id: u64, inner: Box<dyn UnitOfWork>) -> Self {
        Self {
            request_id,
            state: UnitOfWorkState::Idle,
            inner: Some(inner),
        }
    }

    pub fn state(&self) -> UnitOfWorkState {
        self.state
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Opens the transaction: `Idle -> Active`.
    pub async fn begin(&mut self) -> Result<(), ActionGateError> {
        self.expect_state(UnitOfWorkState::Idle, "begin")?;
        self.resource("begin")?
            .begin_transaction()
            .await
            .map_err(|e| ActionGateError::infrastructure(TransactionPhase::Open, e))?;
        self.state = UnitOfWorkState::Active;
        debug!(request.id = self.request_id, "Transaction opened.");
        Ok(())
    }

    /// `Active -> Committed`.
    pub async fn commit(&mut self) -> Result<(), ActionGateError> {
        self.expect_state(UnitOfWorkState::Active, "commit")?;
        self.resource("commit")?
            .commit()
            .await
            .map_err(|e| ActionGateError::infrastructure(TransactionPhase::Commit, e))?;
        self.state = UnitOfWorkState::Committed;
        metrics::TRANSACTIONS_COMMITTED_TOTAL.inc();
        debug!(request.id = self.request_id, "Transaction committed.");
        Ok(())
    }

    /// `Active -> RolledBack`.
    pub async fn rollback(&mut self) -> Result<(), ActionGateError> {
        self.expect_state(UnitOfWorkState::Active, "rollback")?;
        self.resource("rollback")?
            .rollback()
            .await
            .map_err(|e| ActionGateError::infrastructure(TransactionPhase::Rollback, e))?;
        self.state = UnitOfWorkState::RolledBack;
        metrics::TRANSACTIONS_ROLLED_BACK_TOTAL.inc();
        debug!(request.id = self.request_id, "Transaction rolled back.");
        Ok(())
    }

    /// Disposes the resource from any state except `Released`.
    ///
    /// The handle is considered released even when dispose fails, so the
    /// resource is never disposed twice.
    pub async fn release(&mut self) -> Result<(), ActionGateError> {
        if self.state == UnitOfWorkState::Released {
            return Err(ActionGateError::InvalidTransition {
                operation: "release",
                state: self.state,
            });
        }
        let result = self.resource("release")?.dispose().await;
        self.state = UnitOfWorkState::Released;
        debug!(request.id = self.request_id, "Unit of work released.");
        result.map_err(|e| ActionGateError::infrastructure(TransactionPhase::Release, e))
    }

    fn expect_state(
        &self,
        expected: UnitOfWorkState,
        operation: &'static str,
    ) -> Result<(), ActionGateError> {
        if self.state != expected {
            return Err(ActionGateError::InvalidTransition {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn resource(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut Box<dyn UnitOfWork>, ActionGateError> {
        let state = self.state;
        self.inner
            .as_mut()
            .ok_or(ActionGateError::InvalidTransition { operation, state })
    }
}

impl Drop for UnitOfWorkHandle {
    fn drop(&mut self) {
        if self.state == UnitOfWorkState::Released {
            return;
        }
        let Some(mut inner) = self.inner.take() else {
            return;
        };

        let request_id = self.request_id;
        let was_active = self.state == UnitOfWorkState::Active;
        warn!(
            request.id = request_id,
            state = %self.state,
            "Unit of work dropped without release; scheduling cleanup."
        );

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if was_active {
                        match inner.rollback().await {
                            Ok(()) => metrics::TRANSACTIONS_ROLLED_BACK_TOTAL.inc(),
                            Err(e) => error!(
                                request.id = request_id,
                                "Rollback of abandoned unit of work failed: {}", e
                            ),
                        }
                    }
                    if let Err(e) = inner.dispose().await {
                        error!(
                            request.id = request_id,
                            "Dispose of abandoned unit of work failed: {}", e
                        );
                    }
                });
            }
            Err(_) => error!(
                request.id = request_id,
                "No async runtime available; abandoned unit of work was not cleaned up."
            ),
        }
    }
}
