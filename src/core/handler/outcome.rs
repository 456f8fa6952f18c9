// src/core/handler/outcome.rs

use crate::core::response::ActionResponse;
use crate::core::validation::AggregatedValidationError;
use std::any::Any;
use std::time::Duration;

/// A failure raised by an action handler, captured as message plus diagnostic detail.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerFault {
    pub message: String,
    pub detail: String,
}

impl HandlerFault {
    pub fn new(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// The fault recorded when a handler does not finish within its time limit.
    pub fn cancelled(after: Duration) -> Self {
        let message = format!("action cancelled after {} ms", after.as_millis());
        Self {
            detail: message.clone(),
            message,
        }
    }

    /// The fault recorded when a handler panics.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let reason = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        let message = format!("action panicked: {reason}");
        Self {
            detail: message.clone(),
            message,
        }
    }
}

impl From<anyhow::Error> for HandlerFault {
    fn from(e: anyhow::Error) -> Self {
        Self {
            message: e.to_string(),
            detail: format!("{e:?}"),
        }
    }
}

/// A handler failure, either still raw or already converted into a response.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerFailure {
    Unhandled(HandlerFault),
    Handled {
        fault: HandlerFault,
        response: ActionResponse,
    },
}

impl HandlerFailure {
    pub fn fault(&self) -> &HandlerFault {
        match self {
            HandlerFailure::Unhandled(fault) => fault,
            HandlerFailure::Handled { fault, .. } => fault,
        }
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, HandlerFailure::Handled { .. })
    }
}

/// What a stage hands back to the stage that called it.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Success(ActionResponse),
    HandlerFailure(HandlerFailure),
    ValidationFailure(AggregatedValidationError),
}

impl PipelineOutcome {
    /// A short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Success(_) => "success",
            PipelineOutcome::HandlerFailure(HandlerFailure::Unhandled(_)) => "handler-failure",
            PipelineOutcome::HandlerFailure(HandlerFailure::Handled { .. }) => "handled-failure",
            PipelineOutcome::ValidationFailure(_) => "validation-failure",
        }
    }
}
