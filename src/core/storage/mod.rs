// src/core/storage/mod.rs

//! Storage backends that implement the unit-of-work interface.

pub mod memory;

pub use memory::{MemoryStore, MemoryUnitOfWork};
