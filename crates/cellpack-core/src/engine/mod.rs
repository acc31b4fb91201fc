//! # Engine Module
//!
//! The individual stages of the assembly pipeline, each usable on its own:
//!
//! - **Density Planning** ([`density`]) - Target mass density to molecule count
//! - **Packer Requests** ([`packer`]) - Packer input generation and subprocess invocation
//! - **Partitioning** ([`partition`]) - Re-slicing the packer's flat output into molecules
//! - **Overlap Filtering** ([`overlap`]) - Incremental, order-dependent acceptance of
//!   whole molecules under the minimum-image convention
//! - **Plans** ([`plan`]) - Per-species molecule index groups passed between stages
//! - **Stages** ([`stage`]) - Names of the per-realization pipeline states
//! - **Configuration** ([`config`]), **Errors** ([`error`]) and **Progress** ([`progress`])

pub mod config;
pub mod density;
pub mod error;
pub mod overlap;
pub mod packer;
pub mod partition;
pub mod plan;
pub mod progress;
pub mod stage;
