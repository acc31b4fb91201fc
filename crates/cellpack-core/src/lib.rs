//! # cellpack Core Library
//!
//! Assembles periodic simulation cells by combining a fixed solid scaffold with fluid
//! molecules packed at a target density by an external packing engine, then filtering
//! the packed molecules so that every pair of atoms respects a minimum separation under
//! periodic boundary conditions.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split throughout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Atom`, `Cell`, `AtomSet`,
//!   `Species`), the element mass table, the species catalog loader, and the
//!   structure-file formats used to talk to the packing engine and to persist results.
//!
//! - **[`engine`]: The Pipeline Pieces.** Density planning, packer input generation and
//!   invocation, re-slicing of the packer output into molecules, and the incremental
//!   overlap filter. Each stage takes a value and returns a new one, so every stage can
//!   be exercised in isolation.
//!
//! - **[`workflows`]: The Public API.** The `assemble` workflow drives the pipeline once
//!   per member of the requested population and reports the molecule counts actually
//!   achieved in each realization.

pub mod core;
pub mod engine;
pub mod workflows;
