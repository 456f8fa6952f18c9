// src/core/mod.rs

//! The central module containing the request pipeline and its collaborators.

pub mod errors;
pub mod handler;
pub mod invocation;
pub mod metrics;
pub mod response;
pub mod storage;
pub mod unit_of_work;
pub mod validation;

pub use errors::{ActionGateError, StoreError, TransactionPhase};
pub use invocation::{Argument, PendingInvocation};
pub use response::ActionResponse;
