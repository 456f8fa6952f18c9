// src/core/handler/pipeline/mod.rs

//! Contains the individual, reusable stages of the action pipeline.

pub mod transaction;
pub mod validation;

pub use transaction::TransactionStage;
pub use validation::ValidationStage;
