// src/core/handler/mod.rs

//! Pipeline composition: stages, the continuation that chains them, and the
//! router that binds requests to per-action pipelines.

mod outcome;
mod stage;

pub mod action_router;
pub mod executor;
pub mod pipeline;

pub use action_router::{ActionRoute, ActionRouter, ParamSpec};
pub use executor::{Pipeline, PipelineBuilder};
pub use outcome::{HandlerFailure, HandlerFault, PipelineOutcome};
pub use pipeline::{TransactionStage, ValidationStage};
pub use stage::{ActionHandler, Next, Stage};
