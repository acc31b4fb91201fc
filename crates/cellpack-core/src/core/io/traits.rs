use crate::core::models::atom::Atom;
use crate::core::models::atom_set::AtomSet;
use crate::core::models::cell::Cell;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// The format-neutral content of a structure file.
///
/// `cell` is `None` for formats that do not carry a lattice (plain XYZ).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub comment: String,
    pub cell: Option<Cell>,
    pub atoms: Vec<Atom>,
}

impl Frame {
    pub fn new(comment: &str, cell: Option<Cell>, atoms: Vec<Atom>) -> Self {
        Self {
            comment: comment.to_string(),
            cell,
            atoms,
        }
    }

    /// Snapshots an [`AtomSet`], carrying its cell along.
    pub fn from_atom_set(set: &AtomSet, comment: &str) -> Self {
        Self::new(comment, Some(set.cell().clone()), set.atoms().to_vec())
    }

    /// Binds the atoms to `cell`, ignoring any lattice stored in the file.
    pub fn into_atom_set(self, cell: Cell) -> AtomSet {
        AtomSet::from_atoms(cell, self.atoms)
    }
}

/// Defines the interface for reading and writing structure file formats.
///
/// Implementors handle format-specific parsing and serialization; the path-based
/// helpers are provided on top of the reader/writer methods.
pub trait StructureFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads one frame from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Frame, Self::Error>;

    /// Writes one frame to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be represented in the format or the writer
    /// fails.
    fn write_to(frame: &Frame, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads one frame from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Frame, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes one frame to a file path, creating or truncating the file.
    fn write_to_path<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(frame, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
