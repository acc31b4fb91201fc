use super::error::StructureError;
use super::poscar::PoscarFile;
use super::traits::{Frame, StructureFile};
use super::xyz::XyzFile;
use std::fmt;
use std::path::Path;

/// The structure formats recognised from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureFormat {
    Xyz,
    Poscar,
}

impl StructureFormat {
    /// Infers the format from the file name.
    ///
    /// `.xyz` is XYZ; `POSCAR`, `*_POSCAR`, `*.poscar` and `*.vasp` are POSCAR.
    pub fn detect(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".xyz") {
            Some(Self::Xyz)
        } else if file_name.ends_with("POSCAR")
            || lower.ends_with(".poscar")
            || lower.ends_with(".vasp")
        {
            Some(Self::Poscar)
        } else {
            None
        }
    }
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureFormat::Xyz => write!(f, "xyz"),
            StructureFormat::Poscar => write!(f, "poscar"),
        }
    }
}

/// Reads a structure file, choosing the reader from the file name.
///
/// # Errors
///
/// Returns [`StructureError::UnsupportedFormat`] when the name matches no known format,
/// or the reader's own error otherwise.
pub fn read_structure(path: &Path) -> Result<Frame, StructureError> {
    match StructureFormat::detect(path) {
        Some(StructureFormat::Xyz) => XyzFile::read_from_path(path),
        Some(StructureFormat::Poscar) => PoscarFile::read_from_path(path),
        None => Err(StructureError::UnsupportedFormat(
            path.display().to_string(),
        )),
    }
}
