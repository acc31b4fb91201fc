use nalgebra::Point3;

/// A single atom: its element symbol and Cartesian position in Angstroms.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The element symbol as written in structure files (e.g. "O", "Cl").
    pub element: String,
    /// The Cartesian coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    pub fn new(element: &str, position: Point3<f64>) -> Self {
        Self {
            element: element.to_string(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_stores_element_and_position() {
        let atom = Atom::new("O", Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.element, "O");
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn atom_equality_and_clone_works() {
        let atom = Atom::new("H", Point3::origin());
        assert_eq!(atom.clone(), atom);
        assert_ne!(atom, Atom::new("He", Point3::origin()));
    }
}
