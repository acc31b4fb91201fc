//! # Core Module
//!
//! Data models and file formats shared by every stage of the assembly pipeline.
//!
//! - **Structural Models** ([`models`]) - Atoms, periodic cells, atom sets and species
//! - **Species Catalog** ([`catalog`]) - Loading of the cell, solids and fluids from a source tree
//! - **File I/O** ([`io`]) - XYZ and POSCAR readers and writers behind a common trait
//! - **Utilities** ([`utils`]) - Element reference data

pub mod catalog;
pub mod io;
pub mod models;
pub mod utils;
