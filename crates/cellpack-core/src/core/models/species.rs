use super::atom::Atom;
use crate::core::utils::elements::atomic_mass;
use nalgebra::Point3;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Whether a species is part of the fixed scaffold or is packed as a fluid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeciesKind {
    /// Placed once, exactly as loaded, and never moved or removed.
    Solid,
    /// Replicated by the packing engine to reach a target density.
    Fluid,
}

impl fmt::Display for SpeciesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeciesKind::Solid => write!(f, "solid"),
            SpeciesKind::Fluid => write!(f, "fluid"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SpeciesError {
    #[error("Species '{name}' has an empty template")]
    EmptyTemplate { name: String },
    #[error("Species '{name}' contains unknown element '{element}'")]
    UnknownElement { name: String, element: String },
    #[error("Species '{name}' has non-positive molar mass {molar_mass}")]
    NonPositiveMass { name: String, molar_mass: f64 },
}

/// One solid or fluid source: the template geometry of a single instance plus the
/// quantities derived from it.
///
/// The template is immutable once constructed. `molar_mass` is the sum of the standard
/// atomic weights over the template and is always positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    name: String,
    kind: SpeciesKind,
    template: Vec<Atom>,
    molar_mass: f64,
}

impl Species {
    /// Creates a species and derives its molar mass from the template.
    ///
    /// # Errors
    ///
    /// Fails if the template is empty, contains an element without a reference mass, or
    /// sums to a non-positive mass.
    pub fn new(name: &str, kind: SpeciesKind, template: Vec<Atom>) -> Result<Self, SpeciesError> {
        if template.is_empty() {
            return Err(SpeciesError::EmptyTemplate {
                name: name.to_string(),
            });
        }
        let mut molar_mass = 0.0;
        for atom in &template {
            molar_mass += atomic_mass(&atom.element).ok_or_else(|| SpeciesError::UnknownElement {
                name: name.to_string(),
                element: atom.element.clone(),
            })?;
        }
        if !(molar_mass > 0.0) {
            return Err(SpeciesError::NonPositiveMass {
                name: name.to_string(),
                molar_mass,
            });
        }
        Ok(Self {
            name: name.to_string(),
            kind,
            template,
            molar_mass,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SpeciesKind {
        self.kind
    }

    pub fn template(&self) -> &[Atom] {
        &self.template
    }

    /// Molar mass in g/mol.
    pub fn molar_mass(&self) -> f64 {
        self.molar_mass
    }

    pub fn atoms_per_molecule(&self) -> usize {
        self.template.len()
    }

    /// Mass-weighted centre of the template.
    pub fn center_of_mass(&self) -> Point3<f64> {
        let weighted = self
            .template
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, atom| {
                acc + atom.position.coords * atomic_mass(&atom.element).unwrap_or(0.0)
            });
        Point3::from(weighted / self.molar_mass)
    }
}
