// src/core/handler/pipeline/validation.rs

//! Pipeline stage that checks bound arguments against registered validators.

use crate::core::errors::ActionGateError;
use crate::core::handler::outcome::PipelineOutcome;
use crate::core::handler::stage::{Next, Stage};
use crate::core::invocation::PendingInvocation;
use crate::core::metrics;
use crate::core::response::{ResponseBuilder, VALIDATION_ERROR_CODE, VALIDATION_ERROR_MESSAGE};
use crate::core::validation::{AggregatedValidationError, ValidationVerdict, ValidatorResolver};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{trace, warn};

/// Validates every present argument and short-circuits when any check fails.
///
/// Absent arguments are skipped, as are arguments whose type has no validator.
/// Failures from all arguments are merged by property name, so two arguments
/// failing on `name` produce one `name` entry holding both messages.
pub struct ValidationStage {
    resolver: Arc<dyn ValidatorResolver>,
    responses: Arc<dyn ResponseBuilder>,
}

impl ValidationStage {
    pub fn new(resolver: Arc<dyn ValidatorResolver>, responses: Arc<dyn ResponseBuilder>) -> Self {
        Self {
            resolver,
            responses,
        }
    }

    /// Runs every applicable validator and returns the merged failures.
    ///
    /// # Errors
    ///
    /// Propagates resolver failures unchanged.
    pub fn validate(
        &self,
        invocation: &PendingInvocation,
    ) -> Result<AggregatedValidationError, ActionGateError> {
        let mut errors = AggregatedValidationError::new();
        for (name, argument) in invocation.present_arguments() {
            let Some(validator) = self.resolver.resolve(argument)? else {
                trace!(
                    "No validator registered for argument '{}' ({}).",
                    name,
                    argument.type_name()
                );
                continue;
            };
            if let Some(ValidationVerdict::Invalid(failures)) = validator.validate_argument(argument)
            {
                errors.extend(failures);
            }
        }
        Ok(errors)
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(
        &self,
        invocation: &mut PendingInvocation,
        next: Next<'_>,
    ) -> Result<PipelineOutcome, ActionGateError> {
        let errors = self.validate(invocation)?;
        if errors.is_empty() {
            return next.run(invocation).await;
        }

        metrics::VALIDATION_FAILURES_TOTAL.inc();
        warn!(
            request.id = invocation.request_id(),
            properties = ?errors.properties().collect::<Vec<_>>(),
            "Action '{}' rejected by validation.",
            invocation.action()
        );
        let response =
            self.responses
                .validation_error(VALIDATION_ERROR_MESSAGE, &errors, VALIDATION_ERROR_CODE);
        invocation.set_result(response);
        Ok(PipelineOutcome::ValidationFailure(errors))
    }
}
