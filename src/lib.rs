// src/lib.rs

pub mod app;
pub mod config;
pub mod core;
pub mod server;

// Re-export
pub use crate::core::handler::{ActionRouter, Pipeline};
