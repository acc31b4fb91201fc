//! Greedy removal of whole molecules that come too close to already accepted atoms.

use super::error::AssemblyError;
use super::plan::{PlacementPlan, SpeciesPlacement};
use crate::core::models::atom::Atom;
use crate::core::models::atom_set::AtomSet;
use tracing::{debug, info, instrument, warn};

/// Accepts candidate molecules one at a time, in plan order, against an accumulating
/// structure.
///
/// The accumulator starts as a fixed base (empty for fluid-fluid filtering, the solid
/// scaffold for fluid-solid filtering). Atoms of the base are checked with
/// `base_tolerance`, atoms accepted during this pass with `accepted_tolerance`. A
/// molecule is rejected as soon as one of its atoms has a minimum-image distance
/// strictly below the applicable tolerance to any accumulated atom; otherwise all of
/// its atoms are appended. Rejection is all-or-nothing and the base is never modified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapFilter {
    base_tolerance: f64,
    accepted_tolerance: f64,
}

/// The accumulated structure after a filter pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Base atoms followed by every accepted molecule, in acceptance order.
    pub atoms: AtomSet,
    /// Number of leading atoms in `atoms` that came from the base.
    pub base_len: usize,
    /// Accepted molecules, re-indexed into `atoms`. `requested` is carried over.
    pub plan: PlacementPlan,
}

impl FilterOutcome {
    /// Atoms accepted during the pass, without the base.
    pub fn accepted_atoms(&self) -> &[Atom] {
        &self.atoms.atoms()[self.base_len..]
    }
}

impl OverlapFilter {
    /// A single tolerance for every accumulated atom.
    pub fn new(tolerance: f64) -> Self {
        Self {
            base_tolerance: tolerance,
            accepted_tolerance: tolerance,
        }
    }

    /// Fluid-fluid pass: an empty base, so only the fluid tolerance ever applies.
    pub fn fluid_fluid(tolerance: f64) -> Self {
        Self::new(tolerance)
    }

    /// Fluid-solid pass: solid atoms with `solid_fluid_tolerance`, fluid atoms accepted
    /// earlier in the same pass with `fluid_tolerance`.
    pub fn fluid_solid(solid_fluid_tolerance: f64, fluid_tolerance: f64) -> Self {
        Self {
            base_tolerance: solid_fluid_tolerance,
            accepted_tolerance: fluid_tolerance,
        }
    }

    /// Filters the molecules of `plan`, taken from `candidates`, against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::PartitionMismatch`] if a plan group lies outside
    /// `candidates`.
    #[instrument(skip_all, name = "overlap_filter", fields(base_atoms = base.len(), candidates = plan.total_molecules()))]
    pub fn apply(
        &self,
        base: AtomSet,
        candidates: &AtomSet,
        plan: &PlacementPlan,
    ) -> Result<FilterOutcome, AssemblyError> {
        let base_len = base.len();
        let mut accumulated = base;
        let mut placements = Vec::with_capacity(plan.placements().len());

        for placement in plan.placements() {
            let mut groups = Vec::with_capacity(placement.groups.len());
            for (molecule, group) in placement.groups.iter().enumerate() {
                let atoms = candidates.slice(group.clone()).ok_or(
                    AssemblyError::PartitionMismatch {
                        expected: group.end,
                        found: candidates.len(),
                    },
                )?;

                match self.first_contact(&accumulated, base_len, atoms) {
                    Some(contact) => {
                        debug!(
                            species = %placement.species,
                            molecule,
                            contact,
                            against_base = contact < base_len,
                            "Rejected overlapping molecule."
                        );
                    }
                    None => groups.push(accumulated.extend_from_slice(atoms)),
                }
            }

            let kept = groups.len();
            if kept < placement.groups.len() {
                info!(
                    species = %placement.species,
                    kept,
                    rejected = placement.groups.len() - kept,
                    "Removed overlapping molecules."
                );
            }
            if kept == 0 && !placement.groups.is_empty() {
                warn!(species = %placement.species, "Every molecule of this species was rejected.");
            }
            placements.push(SpeciesPlacement {
                species: placement.species.clone(),
                atoms_per_molecule: placement.atoms_per_molecule,
                requested: placement.requested,
                groups,
            });
        }

        Ok(FilterOutcome {
            atoms: accumulated,
            base_len,
            plan: PlacementPlan::new(placements),
        })
    }

    fn first_contact(&self, accumulated: &AtomSet, base_len: usize, atoms: &[Atom]) -> Option<usize> {
        atoms.iter().find_map(|atom| {
            accumulated
                .first_contact_in(0..base_len, &atom.position, self.base_tolerance)
                .or_else(|| {
                    accumulated.first_contact_in(
                        base_len..accumulated.len(),
                        &atom.position,
                        self.accepted_tolerance,
                    )
                })
        })
    }
}
