//! Core domain types
//!
//! This module contains the domain structures shared across vmatrix crates.
//! The client produces version identifiers, the runner turns them into build jobs.

pub mod job;
pub mod version;
