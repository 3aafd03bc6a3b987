//! vmatrix Core
//!
//! Core types for the vmatrix version-matrix builder.
//!
//! This crate contains:
//! - Domain types: version identifiers and build job records
//!
//! Note: Catalog access lives in vmatrix-client, execution logic in vmatrix-runner.

pub mod domain;
