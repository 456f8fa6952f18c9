// src/core/errors.rs

//! Defines the primary error types for the entire application.

use crate::core::unit_of_work::UnitOfWorkState;
use strum_macros::{Display, EnumIter};
use thiserror::Error;

/// The phase of the unit-of-work lifecycle in which an infrastructure failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum TransactionPhase {
    Open,
    Commit,
    Rollback,
    Release,
}

/// Failures reported by a unit-of-work backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("A transaction is already active for request {0}")]
    TransactionAlreadyActive(u64),

    #[error("No active transaction for request {0}")]
    NoActiveTransaction(u64),

    #[error("Key '{key}' was changed by another request after request {request_id} read it")]
    Conflict { request_id: u64, key: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// The main error enum for the pipeline.
///
/// Handler failures are never represented here: they travel up the pipeline as
/// `PipelineOutcome::HandlerFailure` and are translated into a response. Everything
/// in this enum is an infrastructure or host-level fault that propagates unmodified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionGateError {
    #[error("Unit of work {phase} failed: {source}")]
    Infrastructure {
        phase: TransactionPhase,
        #[source]
        source: StoreError,
    },

    #[error("Invalid unit of work transition: cannot {operation} while '{state}'")]
    InvalidTransition {
        operation: &'static str,
        state: UnitOfWorkState,
    },

    #[error("Validator resolution failed for type '{type_name}': {reason}")]
    ValidatorResolution { type_name: String, reason: String },

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Invalid argument '{name}': {reason}")]
    ArgumentBinding { name: String, reason: String },
}

impl ActionGateError {
    /// Wraps a backend failure with the lifecycle phase it happened in.
    pub fn infrastructure(phase: TransactionPhase, source: StoreError) -> Self {
        ActionGateError::Infrastructure { phase, source }
    }

    /// Returns true for failures of the transactional resource or validator resolution,
    /// which the pipeline never converts into a structured response.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ActionGateError::Infrastructure { .. }
                | ActionGateError::InvalidTransition { .. }
                | ActionGateError::ValidatorResolution { .. }
        )
    }
}
