use crate::core::io::error::StructureError;
use crate::core::io::format::read_structure;
use crate::core::models::atom_set::AtomSet;
use crate::core::models::cell::Cell;
use crate::core::models::species::{Species, SpeciesError, SpeciesKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File holding the simulation cell, relative to the source directory.
pub const CELL_FILE_NAME: &str = "cell_POSCAR";
/// Directory of solid scaffold structures, relative to the source directory.
pub const SOLID_DIR_NAME: &str = "solid";
/// Directory of fluid molecule templates, relative to the source directory.
pub const FLUID_DIR_NAME: &str = "fluid";
/// Prefix of generated packer inputs, which are never treated as sources.
pub const GENERATED_PREFIX: &str = "pinp_";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read structure '{path}': {source}")]
    Structure {
        path: PathBuf,
        source: StructureError,
    },
    #[error("Cell file '{0}' does not define a lattice")]
    MissingLattice(PathBuf),
    #[error(transparent)]
    Species(#[from] SpeciesError),
    #[error("Species name '{0}' is defined more than once")]
    DuplicateName(String),
}

/// The species name for a source file: the file name without a `_POSCAR` suffix, or
/// otherwise the file stem.
pub fn species_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if let Some(stripped) = file_name.strip_suffix("_POSCAR") {
        return Some(stripped.to_string());
    }
    path.file_stem()?.to_str().map(str::to_string)
}

/// The read-only inputs shared by every realization: the cell and every solid and
/// fluid species, each in file-name order.
#[derive(Debug, Clone)]
pub struct SpeciesCatalog {
    cell: Cell,
    solids: Vec<Species>,
    fluids: Vec<Species>,
}

impl SpeciesCatalog {
    /// Builds a catalog from already constructed species, keeping their relative order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateName`] if two species share a name.
    pub fn new(cell: Cell, species: Vec<Species>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for s in &species {
            if !seen.insert(s.name().to_string()) {
                return Err(CatalogError::DuplicateName(s.name().to_string()));
            }
        }
        let (solids, fluids) = species
            .into_iter()
            .partition(|s| s.kind() == SpeciesKind::Solid);
        Ok(Self {
            cell,
            solids,
            fluids,
        })
    }

    /// Loads `src_dir/cell_POSCAR`, `src_dir/solid/*` and `src_dir/fluid/*`.
    ///
    /// Hidden files and files starting with [`GENERATED_PREFIX`] are skipped. A missing
    /// `solid` or `fluid` directory is treated as empty.
    pub fn load(src_dir: &Path) -> Result<Self, CatalogError> {
        let cell_path = src_dir.join(CELL_FILE_NAME);
        let cell = read_structure(&cell_path)
            .map_err(|source| CatalogError::Structure {
                path: cell_path.clone(),
                source,
            })?
            .cell
            .ok_or(CatalogError::MissingLattice(cell_path))?;

        let mut species = Vec::new();
        for (dir_name, kind) in [
            (SOLID_DIR_NAME, SpeciesKind::Solid),
            (FLUID_DIR_NAME, SpeciesKind::Fluid),
        ] {
            for path in source_files(&src_dir.join(dir_name))? {
                species.push(load_species(&path, kind)?);
            }
        }

        let catalog = Self::new(cell, species)?;
        info!(
            solids = catalog.solids.len(),
            fluids = catalog.fluids.len(),
            volume = catalog.cell.volume(),
            "Species catalog loaded."
        );
        Ok(catalog)
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn solids(&self) -> &[Species] {
        &self.solids
    }

    pub fn fluids(&self) -> &[Species] {
        &self.fluids
    }

    pub fn get(&self, name: &str) -> Option<&Species> {
        self.solids
            .iter()
            .chain(&self.fluids)
            .find(|s| s.name() == name)
    }

    /// All solid atoms concatenated in catalog order, bound to the cell and wrapped
    /// into it.
    pub fn solid_scaffold(&self) -> AtomSet {
        let mut scaffold = AtomSet::new(self.cell.clone());
        for solid in &self.solids {
            scaffold.extend_from_slice(solid.template());
        }
        scaffold.wrapped()
    }
}

/// Species source files in `dir`, sorted by name, skipping hidden files and generated
/// packer templates. A missing directory yields no files.
pub fn source_files(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    if !dir.is_dir() {
        debug!("Source directory {:?} not present; treating as empty.", dir);
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let skip = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_none_or(|n| n.starts_with('.') || n.starts_with(GENERATED_PREFIX));
        if !skip && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_species(path: &Path, kind: SpeciesKind) -> Result<Species, CatalogError> {
    let frame = read_structure(path).map_err(|source| CatalogError::Structure {
        path: path.to_path_buf(),
        source,
    })?;
    let name = species_name(path).unwrap_or_else(|| path.display().to_string());
    let species = Species::new(&name, kind, frame.atoms)?;
    debug!(
        name = species.name(),
        %kind,
        atoms = species.atoms_per_molecule(),
        molar_mass = species.molar_mass(),
        "Loaded species."
    );
    Ok(species)
}
