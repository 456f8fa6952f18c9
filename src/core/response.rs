// src/core/response.rs

//! The response value returned for every action, and the builder used to shape
//! pipeline-generated error responses.

use crate::core::validation::AggregatedValidationError;
use serde::Serialize;
use serde_json::{Value, json};

/// The error code attached to every validation short-circuit.
pub const VALIDATION_ERROR_CODE: &str = "ValidationError";
/// The message attached to every validation short-circuit.
pub const VALIDATION_ERROR_MESSAGE: &str = "One or more validation errors occurred.";
/// Status used for validation failures.
pub const VALIDATION_STATUS: u16 = 400;
/// Status used for translated handler faults.
pub const FAULT_STATUS: u16 = 500;

/// A status code and a JSON body, produced either by a handler or by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub status: u16,
    pub body: Value,
}

impl ActionResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shapes the wire-level body of pipeline-generated errors. The pipeline only
/// supplies the arguments.
pub trait ResponseBuilder: Send + Sync {
    fn validation_error(
        &self,
        message: &str,
        payload: &AggregatedValidationError,
        error_code: &str,
    ) -> ActionResponse;

    fn fault(&self, message: &str, detail: &str, status_code: u16) -> ActionResponse;
}

/// The default JSON envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseBuilder;

impl ResponseBuilder for JsonResponseBuilder {
    fn validation_error(
        &self,
        message: &str,
        payload: &AggregatedValidationError,
        error_code: &str,
    ) -> ActionResponse {
        ActionResponse::new(
            VALIDATION_STATUS,
            json!({
                "Error": true,
                "Message": message,
                "ErrorCode": error_code,
                "Payload": { "Errors": payload },
            }),
        )
    }

    fn fault(&self, message: &str, detail: &str, status_code: u16) -> ActionResponse {
        ActionResponse::new(
            status_code,
            json!({
                "Error": true,
                "Message": message,
                "Detail": detail,
                "StatusCode": status_code,
            }),
        )
    }
}
