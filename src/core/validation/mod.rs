// src/core/validation/mod.rs

//! Validator registration and the verdict types produced by validators.

mod registry;
mod verdict;

pub use registry::{ErasedValidator, Validator, ValidatorRegistry, ValidatorResolver};
pub use verdict::{AggregatedValidationError, FieldFailure, ValidationVerdict};
