//! Re-slicing a packer's flat output into per-species molecule groups.

use super::error::AssemblyError;
use super::plan::{PlacementPlan, SpeciesPlacement};
use tracing::instrument;

/// One species block of a packing request, in the order it was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub species: String,
    pub atoms_per_molecule: usize,
    pub molecule_count: usize,
}

impl ManifestEntry {
    pub fn atom_count(&self) -> usize {
        self.atoms_per_molecule * self.molecule_count
    }
}

/// Splits `flat_len` atoms into consecutive molecule groups following `manifest`.
///
/// Species are laid out in manifest order and each species' molecules are consecutive,
/// so the groups exactly cover `0..flat_len` with no gaps or overlaps. No geometry is
/// inspected.
///
/// # Errors
///
/// Returns [`AssemblyError::PartitionMismatch`] if `flat_len` differs from the total
/// implied by the manifest, or [`AssemblyError::InvalidSpecies`] for an entry with no
/// atoms per molecule.
#[instrument(skip_all, name = "partition")]
pub fn partition(flat_len: usize, manifest: &[ManifestEntry]) -> Result<PlacementPlan, AssemblyError> {
    if let Some(entry) = manifest.iter().find(|e| e.atoms_per_molecule == 0) {
        return Err(AssemblyError::InvalidSpecies {
            name: entry.species.clone(),
            reason: "molecules must contain at least one atom".to_string(),
        });
    }

    let expected: usize = manifest.iter().map(ManifestEntry::atom_count).sum();
    if expected != flat_len {
        return Err(AssemblyError::PartitionMismatch {
            expected,
            found: flat_len,
        });
    }

    let mut cursor = 0;
    let placements = manifest
        .iter()
        .map(|entry| {
            let groups = (0..entry.molecule_count)
                .map(|_| {
                    let group = cursor..cursor + entry.atoms_per_molecule;
                    cursor = group.end;
                    group
                })
                .collect();
            SpeciesPlacement {
                species: entry.species.clone(),
                atoms_per_molecule: entry.atoms_per_molecule,
                requested: entry.molecule_count,
                groups,
            }
        })
        .collect();
    Ok(PlacementPlan::new(placements))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(species: &str, atoms_per_molecule: usize, molecule_count: usize) -> ManifestEntry {
        ManifestEntry {
            species: species.to_string(),
            atoms_per_molecule,
            molecule_count,
        }
    }

    #[test]
    fn groups_follow_manifest_order() {
        let manifest = [entry("water", 3, 2), entry("argon", 1, 3)];
        let plan = partition(9, &manifest).unwrap();

        assert_eq!(plan.placements()[0].groups, vec![0..3, 3..6]);
        assert_eq!(plan.placements()[1].groups, vec![6..7, 7..8, 8..9]);
        assert_eq!(plan.placements()[1].requested, 3);
    }

    #[test]
    fn groups_cover_every_index_exactly_once() {
        let manifest = [entry("a", 4, 5), entry("b", 2, 0), entry("c", 7, 3)];
        let flat_len = 4 * 5 + 7 * 3;
        let plan = partition(flat_len, &manifest).unwrap();

        let mut covered = vec![0u32; flat_len];
        let mut last_end = 0;
        for (_, group) in plan.groups() {
            assert_eq!(group.start, last_end, "groups must be contiguous");
            last_end = group.end;
            for i in group.clone() {
                covered[i] += 1;
            }
        }
        assert_eq!(last_end, flat_len);
        assert!(covered.iter().all(|&c| c == 1));
        assert!(plan.get("b").unwrap().groups.is_empty());
    }

    #[test]
    fn length_mismatch_is_reported() {
        let result = partition(8, &[entry("water", 3, 3)]);
        assert!(matches!(
            result,
            Err(AssemblyError::PartitionMismatch { expected: 9, found: 8 })
        ));
    }

    #[test]
    fn empty_manifest_partitions_empty_output() {
        let plan = partition(0, &[]).unwrap();
        assert_eq!(plan.total_molecules(), 0);
        assert!(partition(1, &[]).is_err());
    }

    #[test]
    fn zero_atom_species_is_invalid() {
        assert!(matches!(
            partition(0, &[entry("ghost", 0, 4)]),
            Err(AssemblyError::InvalidSpecies { .. })
        ));
    }
}
