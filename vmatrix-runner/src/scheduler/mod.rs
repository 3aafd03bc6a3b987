//! Scheduler layer for the runner
//!
//! This layer fans the per-version builds out over a bounded worker pool,
//! waits for every one of them, and collects the results in catalog order.

pub mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{BuildMatrixResult, BuildOrchestrator, MatrixEntry};
