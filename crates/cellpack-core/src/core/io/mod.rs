//! Structure-file input and output.
//!
//! Two formats are supported: plain/extended XYZ ([`xyz`]), which is what the packing
//! engine reads and writes, and POSCAR ([`poscar`]), which carries the lattice and is
//! used for the cell, solid scaffolds and every assembled system. Both implement the
//! [`traits::StructureFile`] trait and exchange data through [`traits::Frame`].

pub mod error;
pub mod format;
pub mod poscar;
pub mod traits;
pub mod xyz;
