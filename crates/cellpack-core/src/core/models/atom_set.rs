use super::atom::Atom;
use super::cell::Cell;
use nalgebra::Point3;
use std::ops::Range;

/// An ordered collection of atoms together with the periodic cell they live in.
///
/// Atom order is significant: molecules are addressed as contiguous index ranges into
/// the set, so appending never reorders existing atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomSet {
    cell: Cell,
    atoms: Vec<Atom>,
}

impl AtomSet {
    /// Creates an empty set bound to `cell`.
    pub fn new(cell: Cell) -> Self {
        Self {
            cell,
            atoms: Vec::new(),
        }
    }

    pub fn from_atoms(cell: Cell, atoms: Vec<Atom>) -> Self {
        Self { cell, atoms }
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn push(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    /// Appends clones of `atoms` and returns the index range they occupy.
    pub fn extend_from_slice(&mut self, atoms: &[Atom]) -> Range<usize> {
        let start = self.atoms.len();
        self.atoms.extend_from_slice(atoms);
        start..self.atoms.len()
    }

    /// Returns the atoms in `range`, or `None` if the range is out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Option<&[Atom]> {
        self.atoms.get(range)
    }

    /// Wraps every atom into the cell.
    pub fn wrapped(mut self) -> Self {
        for atom in &mut self.atoms {
            atom.position = self.cell.wrap(&atom.position);
        }
        self
    }

    /// Returns the first atom index whose minimum-image distance to `position` is below
    /// `tolerance`, scanning in insertion order.
    pub fn first_contact(&self, position: &Point3<f64>, tolerance: f64) -> Option<usize> {
        self.first_contact_in(0..self.atoms.len(), position, tolerance)
    }

    /// Like [`AtomSet::first_contact`], restricted to the atoms in `range`.
    pub fn first_contact_in(
        &self,
        range: Range<usize>,
        position: &Point3<f64>,
        tolerance: f64,
    ) -> Option<usize> {
        let end = range.end.min(self.atoms.len());
        let start = range.start.min(end);
        self.atoms[start..end]
            .iter()
            .position(|atom| self.cell.distance(&atom.position, position) < tolerance)
            .map(|offset| start + offset)
    }

    /// Smallest minimum-image distance between any atom in `a` and any atom in `b`.
    ///
    /// Returns `None` when either range is empty.
    pub fn min_distance_between(&self, a: Range<usize>, b: Range<usize>) -> Option<f64> {
        let (atoms_a, atoms_b) = (self.slice(a)?, self.slice(b)?);
        atoms_a
            .iter()
            .flat_map(|x| {
                atoms_b
                    .iter()
                    .map(move |y| self.cell.distance(&x.position, &y.position))
            })
            .min_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(l: f64) -> Cell {
        Cell::orthogonal(l, l, l).unwrap()
    }

    #[test]
    fn extend_from_slice_reports_occupied_range() {
        let mut set = AtomSet::new(cubic(10.0));
        set.push(Atom::new("C", Point3::origin()));
        let range = set.extend_from_slice(&[
            Atom::new("H", Point3::new(1.0, 0.0, 0.0)),
            Atom::new("H", Point3::new(0.0, 1.0, 0.0)),
        ]);
        assert_eq!(range, 1..3);
        assert_eq!(set.len(), 3);
        assert_eq!(set.slice(range).unwrap()[1].element, "H");
    }

    #[test]
    fn slice_out_of_bounds_is_none() {
        let set = AtomSet::new(cubic(10.0));
        assert!(set.slice(0..1).is_none());
    }

    #[test]
    fn first_contact_finds_periodic_neighbours() {
        let mut set = AtomSet::new(cubic(10.0));
        set.push(Atom::new("O", Point3::new(5.0, 5.0, 5.0)));
        set.push(Atom::new("O", Point3::new(0.2, 5.0, 5.0)));

        assert_eq!(set.first_contact(&Point3::new(9.8, 5.0, 5.0), 1.0), Some(1));
        assert_eq!(set.first_contact(&Point3::new(2.5, 5.0, 5.0), 1.0), None);
    }

    #[test]
    fn first_contact_in_respects_range() {
        let mut set = AtomSet::new(cubic(10.0));
        set.push(Atom::new("O", Point3::new(1.0, 1.0, 1.0)));
        set.push(Atom::new("O", Point3::new(8.0, 8.0, 8.0)));

        let probe = Point3::new(1.2, 1.0, 1.0);
        assert_eq!(set.first_contact_in(1..2, &probe, 1.0), None);
        assert_eq!(set.first_contact_in(0..2, &probe, 1.0), Some(0));
    }

    #[test]
    fn contact_at_exactly_the_tolerance_is_not_a_violation() {
        let mut set = AtomSet::new(cubic(10.0));
        set.push(Atom::new("O", Point3::new(1.0, 1.0, 1.0)));
        assert_eq!(set.first_contact(&Point3::new(3.0, 1.0, 1.0), 2.0), None);
    }

    #[test]
    fn wrapped_moves_atoms_inside_without_reordering() {
        let set = AtomSet::from_atoms(
            cubic(10.0),
            vec![
                Atom::new("Na", Point3::new(-1.0, 0.0, 0.0)),
                Atom::new("Cl", Point3::new(11.0, 0.0, 0.0)),
            ],
        )
        .wrapped();
        assert_eq!(set.atoms()[0].element, "Na");
        assert!((set.atoms()[0].position.x - 9.0).abs() < 1e-9);
        assert!((set.atoms()[1].position.x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn min_distance_between_groups() {
        let set = AtomSet::from_atoms(
            cubic(10.0),
            vec![
                Atom::new("H", Point3::new(0.5, 0.0, 0.0)),
                Atom::new("H", Point3::new(1.5, 0.0, 0.0)),
                Atom::new("H", Point3::new(9.0, 0.0, 0.0)),
            ],
        );
        let d = set.min_distance_between(0..2, 2..3).unwrap();
        assert!((d - 1.5).abs() < 1e-9);
        assert!(set.min_distance_between(0..0, 2..3).is_none());
    }
}
