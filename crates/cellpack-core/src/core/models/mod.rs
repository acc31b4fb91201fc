//! Structural data models.
//!
//! An [`atom::Atom`] is an element symbol plus a Cartesian position. Atoms live in an
//! [`atom_set::AtomSet`], which always carries the periodic [`cell::Cell`] its
//! positions refer to. A [`species::Species`] is the immutable single-molecule template
//! for one solid or fluid source together with its derived physical quantities.

pub mod atom;
pub mod atom_set;
pub mod cell;
pub mod species;
