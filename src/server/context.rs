// src/server/context.rs

use crate::core::handler::ActionRouter;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub router: ActionRouter,
    request_id_counter: AtomicU64,
}

impl AppState {
    pub fn new(router: ActionRouter) -> Self {
        Self {
            router,
            request_id_counter: AtomicU64::new(0),
        }
    }

    /// Allocates a process-unique request id.
    pub fn next_request_id(&self) -> u64 {
        self.request_id_counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
