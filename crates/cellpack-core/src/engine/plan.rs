use std::ops::Range;

/// One species' molecules, each a contiguous atom index range into the structure the
/// plan describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesPlacement {
    pub species: String,
    pub atoms_per_molecule: usize,
    /// Molecules requested from the packer, before any filtering.
    pub requested: usize,
    pub groups: Vec<Range<usize>>,
}

impl SpeciesPlacement {
    pub fn molecule_count(&self) -> usize {
        self.groups.len()
    }
}

/// Per-species molecule index groups, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlacementPlan {
    placements: Vec<SpeciesPlacement>,
}

impl PlacementPlan {
    pub fn new(placements: Vec<SpeciesPlacement>) -> Self {
        Self { placements }
    }

    pub fn placements(&self) -> &[SpeciesPlacement] {
        &self.placements
    }

    pub fn get(&self, species: &str) -> Option<&SpeciesPlacement> {
        self.placements.iter().find(|p| p.species == species)
    }

    pub fn total_molecules(&self) -> usize {
        self.placements.iter().map(|p| p.groups.len()).sum()
    }

    pub fn total_atoms(&self) -> usize {
        self.placements
            .iter()
            .flat_map(|p| &p.groups)
            .map(|g| g.len())
            .sum()
    }

    /// Every group in plan order, tagged with its species' position in the plan.
    pub fn groups(&self) -> impl Iterator<Item = (usize, &Range<usize>)> {
        self.placements
            .iter()
            .enumerate()
            .flat_map(|(i, p)| p.groups.iter().map(move |g| (i, g)))
    }
}
