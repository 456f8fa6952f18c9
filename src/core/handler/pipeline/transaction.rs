// src/core/handler/pipeline/transaction.rs

//! Pipeline stage that runs everything downstream inside one unit of work.

use crate::config::PipelineConfig;
use crate::core::errors::ActionGateError;
use crate::core::handler::outcome::{HandlerFailure, HandlerFault, PipelineOutcome};
use crate::core::handler::stage::{Next, Stage};
use crate::core::invocation::PendingInvocation;
use crate::core::metrics;
use crate::core::response::{FAULT_STATUS, ResponseBuilder};
use crate::core::unit_of_work::{UnitOfWorkFactory, UnitOfWorkHandle};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Opens a unit of work, runs the rest of the pipeline, then commits or rolls back.
///
/// * An unhandled handler failure is rolled back and turned into a fault response.
/// * Any other outcome is committed.
/// * The unit of work is released on every path, including failed commits and rollbacks.
/// * Failures of the unit of work itself propagate as errors.
pub struct TransactionStage {
    factory: Arc<dyn UnitOfWorkFactory>,
    responses: Arc<dyn ResponseBuilder>,
    handler_timeout: Option<Duration>,
    include_fault_detail: bool,
}

impl TransactionStage {
    pub fn new(factory: Arc<dyn UnitOfWorkFactory>, responses: Arc<dyn ResponseBuilder>) -> Self {
        Self {
            factory,
            responses,
            handler_timeout: None,
            include_fault_detail: true,
        }
    }

    pub fn from_config(
        factory: Arc<dyn UnitOfWorkFactory>,
        responses: Arc<dyn ResponseBuilder>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            handler_timeout: config.handler_timeout(),
            include_fault_detail: config.include_fault_detail,
            ..Self::new(factory, responses)
        }
    }

    /// Bounds the downstream call; expiry counts as an unhandled failure.
    pub fn with_handler_timeout(mut self, limit: Duration) -> Self {
        self.handler_timeout = Some(limit);
        self
    }

    pub fn with_fault_detail(mut self, include: bool) -> Self {
        self.include_fault_detail = include;
        self
    }

    async fn run_downstream(
        &self,
        invocation: &mut PendingInvocation,
        next: Next<'_>,
    ) -> Result<PipelineOutcome, ActionGateError> {
        let Some(limit) = self.handler_timeout else {
            return next.run(invocation).await;
        };
        match tokio::time::timeout(limit, next.run(invocation)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Action did not finish within {} ms; treating it as failed.",
                    limit.as_millis()
                );
                Ok(PipelineOutcome::HandlerFailure(HandlerFailure::Unhandled(
                    HandlerFault::cancelled(limit),
                )))
            }
        }
    }

    /// Commits or rolls back according to the downstream result.
    async fn settle(
        &self,
        handle: &mut UnitOfWorkHandle,
        downstream: Result<PipelineOutcome, ActionGateError>,
    ) -> Result<PipelineOutcome, ActionGateError> {
        match downstream {
            Ok(PipelineOutcome::HandlerFailure(HandlerFailure::Unhandled(fault))) => {
                handle.rollback().await?;
                metrics::HANDLER_FAULTS_TOTAL.inc();
                error!(
                    request.id = handle.request_id(),
                    "Action failed, transaction rolled back: {}", fault.message
                );
                let detail = if self.include_fault_detail {
                    fault.detail.as_str()
                } else {
                    ""
                };
                let response = self.responses.fault(&fault.message, detail, FAULT_STATUS);
                Ok(PipelineOutcome::HandlerFailure(HandlerFailure::Handled {
                    fault,
                    response,
                }))
            }
            Ok(outcome) => {
                handle.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = handle.rollback().await {
                    error!(
                        request.id = handle.request_id(),
                        "Rollback after downstream error failed: {}", rollback_err
                    );
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Stage for TransactionStage {
    fn name(&self) -> &'static str {
        "transaction"
    }

    async fn handle(
        &self,
        invocation: &mut PendingInvocation,
        next: Next<'_>,
    ) -> Result<PipelineOutcome, ActionGateError> {
        // A transaction is already open further up the pipeline; it owns the boundary.
        if invocation.is_transaction_open() {
            debug!(
                request.id = invocation.request_id(),
                "Transaction already open; not opening another."
            );
            return next.run(invocation).await;
        }

        let request_id = invocation.request_id();
        let mut handle = UnitOfWorkHandle::new(request_id, self.factory.create(request_id));

        if let Err(open_err) = handle.begin().await {
            if let Err(release_err) = handle.release().await {
                error!(
                    request.id = request_id,
                    "Release after failed open also failed: {}", release_err
                );
            }
            return Err(open_err);
        }

        invocation.set_transaction_open(true);
        let downstream = self.run_downstream(invocation, next).await;
        let settled = self.settle(&mut handle, downstream).await;
        invocation.set_transaction_open(false);

        let released = handle.release().await;
        match (settled, released) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                error!(
                    request.id = request_id,
                    "Release failed after an earlier unit of work error: {}", release_err
                );
                Err(e)
            }
        }
    }
}
