// src/core/handler/executor.rs

//! The `Pipeline` ties an ordered list of stages to an action handler and turns
//! the resulting outcome into the response the caller receives.

use super::outcome::{HandlerFailure, PipelineOutcome};
use super::pipeline::{TransactionStage, ValidationStage};
use super::stage::{ActionHandler, Next, Stage};
use crate::config::PipelineConfig;
use crate::core::errors::ActionGateError;
use crate::core::invocation::PendingInvocation;
use crate::core::metrics;
use crate::core::response::{
    ActionResponse, FAULT_STATUS, JsonResponseBuilder, ResponseBuilder, VALIDATION_ERROR_CODE,
    VALIDATION_ERROR_MESSAGE,
};
use crate::core::unit_of_work::UnitOfWorkFactory;
use crate::core::validation::ValidatorResolver;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info_span};

/// An immutable, pre-composed stage chain for one action. Built once at
/// registration time and shared by every request for that action.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    handler: Arc<dyn ActionHandler>,
    responses: Arc<dyn ResponseBuilder>,
}

/// Assembles a [`Pipeline`] stage by stage. Stages run in insertion order.
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
    handler: Arc<dyn ActionHandler>,
    responses: Arc<dyn ResponseBuilder>,
}

impl PipelineBuilder {
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn shared_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Overrides the builder used for responses the pipeline itself produces.
    pub fn responses(mut self, responses: Arc<dyn ResponseBuilder>) -> Self {
        self.responses = responses;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
            handler: self.handler,
            responses: self.responses,
        }
    }
}

impl Pipeline {
    pub fn builder(handler: Arc<dyn ActionHandler>) -> PipelineBuilder {
        PipelineBuilder {
            stages: Vec::new(),
            handler,
            responses: Arc::new(JsonResponseBuilder),
        }
    }

    /// The standard composition: validation first, then the transaction boundary.
    pub fn standard(
        handler: Arc<dyn ActionHandler>,
        resolver: Arc<dyn ValidatorResolver>,
        factory: Arc<dyn UnitOfWorkFactory>,
        config: &PipelineConfig,
    ) -> Self {
        let responses: Arc<dyn ResponseBuilder> = Arc::new(JsonResponseBuilder);
        Pipeline::builder(handler)
            .stage(ValidationStage::new(resolver, responses.clone()))
            .stage(TransactionStage::from_config(
                factory,
                responses.clone(),
                config,
            ))
            .responses(responses)
            .build()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs the stage chain and returns the raw outcome.
    pub async fn run(
        &self,
        invocation: &mut PendingInvocation,
    ) -> Result<PipelineOutcome, ActionGateError> {
        Next::new(&self.stages, self.handler.as_ref())
            .run(invocation)
            .await
    }

    /// Runs the stage chain and resolves the outcome into the final response.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures are returned as errors; handler and validation
    /// failures always resolve to a response.
    pub async fn execute(
        &self,
        mut invocation: PendingInvocation,
    ) -> Result<ActionResponse, ActionGateError> {
        let span = info_span!(
            "action",
            name = %invocation.action(),
            request.id = %invocation.request_id(),
        );

        async move {
            let start_time = Instant::now();
            metrics::ACTIONS_TOTAL
                .with_label_values(&[invocation.action()])
                .inc();

            let result = self.run(&mut invocation).await;
            metrics::ACTION_LATENCY_SECONDS.observe(start_time.elapsed().as_secs_f64());

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    metrics::INFRASTRUCTURE_FAULTS_TOTAL.inc();
                    error!("Action '{}' aborted: {}", invocation.action(), e);
                    return Err(e);
                }
            };
            debug!("Action finished with outcome '{}'.", outcome.label());

            let response = match outcome {
                PipelineOutcome::Success(response) => response,
                PipelineOutcome::ValidationFailure(errors) => {
                    invocation.take_result().unwrap_or_else(|| {
                        self.responses.validation_error(
                            VALIDATION_ERROR_MESSAGE,
                            &errors,
                            VALIDATION_ERROR_CODE,
                        )
                    })
                }
                PipelineOutcome::HandlerFailure(HandlerFailure::Handled { response, .. }) => {
                    response
                }
                PipelineOutcome::HandlerFailure(HandlerFailure::Unhandled(fault)) => {
                    // Only reachable when the pipeline was assembled without a transaction stage.
                    metrics::HANDLER_FAULTS_TOTAL.inc();
                    error!(
                        "Action '{}' failed outside a transaction: {}",
                        invocation.action(),
                        fault.message
                    );
                    self.responses
                        .fault(&fault.message, &fault.detail, FAULT_STATUS)
                }
            };
            Ok(response)
        }
        .instrument(span)
        .await
    }
}
