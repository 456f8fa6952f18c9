// src/core/handler/stage.rs

use super::outcome::{HandlerFailure, HandlerFault, PipelineOutcome};
use crate::core::errors::ActionGateError;
use crate::core::invocation::PendingInvocation;
use crate::core::response::ActionResponse;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::error;

/// The business logic behind one action.
///
/// Any error returned here is an unhandled failure: it is routed through the
/// transaction stage, which rolls back and translates it into a fault response.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn call(&self, invocation: &PendingInvocation) -> anyhow::Result<ActionResponse>;
}

/// One composable unit of the request pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Either delegates through `next` or terminates the pipeline with its own outcome.
    async fn handle(
        &self,
        invocation: &mut PendingInvocation,
        next: Next<'_>,
    ) -> Result<PipelineOutcome, ActionGateError>;
}

/// The remainder of the pipeline after the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    handler: &'a dyn ActionHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stages: &'a [Arc<dyn Stage>], handler: &'a dyn ActionHandler) -> Self {
        Self { stages, handler }
    }

    /// Runs the next stage, or the handler once all stages have been entered.
    ///
    /// A handler panic is caught and reported as an unhandled failure.
    pub async fn run(
        self,
        invocation: &mut PendingInvocation,
    ) -> Result<PipelineOutcome, ActionGateError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                stage
                    .handle(invocation, Next::new(rest, self.handler))
                    .await
            }
            None => {
                let called = AssertUnwindSafe(self.handler.call(invocation))
                    .catch_unwind()
                    .await;
                Ok(match called {
                    Ok(Ok(response)) => PipelineOutcome::Success(response),
                    Ok(Err(e)) => PipelineOutcome::HandlerFailure(HandlerFailure::Unhandled(e.into())),
                    Err(payload) => {
                        let fault = HandlerFault::from_panic(payload.as_ref());
                        error!("Action handler panicked: {}", fault.message);
                        PipelineOutcome::HandlerFailure(HandlerFailure::Unhandled(fault))
                    }
                })
            }
        }
    }
}
