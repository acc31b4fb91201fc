//! # Workflows Module
//!
//! Top-level entry points that run the complete pipeline.
//!
//! - **Assembly Workflow** ([`assemble`]) - Validates the configuration against the
//!   species catalog, then builds every realization of the population: packing,
//!   partitioning, fluid-fluid filtering, merging onto the solid scaffold with
//!   fluid-solid filtering, and persisting the final structure.

pub mod assemble;
