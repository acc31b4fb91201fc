//! Packer input generation and invocation of the external packing engine.
//!
//! The engine reads a plain-text input from standard input: a header with the
//! tolerance, output format and seed, the output path, and one `structure ... end
//! structure` block per species. It writes every placed atom to a single XYZ file, in
//! block order and, within a block, in placement order.

use super::error::AssemblyError;
use super::partition::ManifestEntry;
use crate::core::io::traits::StructureFile;
use crate::core::io::xyz::XyzFile;
use crate::core::models::atom_set::AtomSet;
use crate::core::models::cell::Cell;
use crate::core::models::species::Species;
use nalgebra::{Point3, Vector3};
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Environment variable naming the packing engine executable.
pub const PACKER_ENV_VAR: &str = "PACKMOL";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// An axis-aligned box the packer must keep every atom of a species inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Region {
    /// The orthogonal cell `[0, L]` shrunk by `tolerance / 2` on every face.
    ///
    /// Atoms packed inside this region are at least `tolerance` apart from every atom
    /// across a periodic face as well as within the box.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::InvalidConfiguration`] if any edge is not longer than
    /// `tolerance`.
    pub fn periodic_safe(extent: &Vector3<f64>, tolerance: f64) -> Result<Self, AssemblyError> {
        if let Some(axis) = (0..3).find(|&i| extent[i] <= tolerance) {
            return Err(AssemblyError::InvalidConfiguration(format!(
                "cell edge {} ({} Å) must be longer than the tolerance ({} Å)",
                ["a", "b", "c"][axis],
                extent[axis],
                tolerance
            )));
        }
        let margin = Vector3::repeat(tolerance / 2.0);
        Ok(Self {
            min: Point3::from(margin),
            max: Point3::from(extent - margin),
        })
    }

    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }
}

/// One entry of a packer input, tagged by what it places.
#[derive(Debug, Clone, PartialEq)]
pub enum PackingBlock {
    /// The periodic cell. Places nothing; rendered as a comment for inspection.
    Cell { extent: Vector3<f64> },
    /// A single pre-positioned copy held fixed at `center`.
    Solid {
        species: String,
        template: PathBuf,
        atoms_per_molecule: usize,
        center: Point3<f64>,
    },
    /// `count` free copies inside `region`.
    Fluid {
        species: String,
        template: PathBuf,
        atoms_per_molecule: usize,
        count: usize,
        region: Region,
    },
}

impl PackingBlock {
    /// A fixed block placing `species` at its centre of mass.
    pub fn solid(species: &Species, template: PathBuf) -> Self {
        Self::Solid {
            species: species.name().to_string(),
            template,
            atoms_per_molecule: species.atoms_per_molecule(),
            center: species.center_of_mass(),
        }
    }

    pub fn fluid(species: &Species, template: PathBuf, count: usize, region: Region) -> Self {
        Self::Fluid {
            species: species.name().to_string(),
            template,
            atoms_per_molecule: species.atoms_per_molecule(),
            count,
            region,
        }
    }
}

/// Renders the packer text for one block. Fluid blocks with no molecules render as
/// nothing, since the engine rejects `number 0`.
pub fn render_block(block: &PackingBlock) -> String {
    match block {
        PackingBlock::Cell { extent } => {
            format!("# cell {:?} {:?} {:?}\n\n", extent.x, extent.y, extent.z)
        }
        PackingBlock::Solid {
            template, center, ..
        } => format!(
            "structure {}\n  number 1\n  center\n  fixed {:?} {:?} {:?} 0. 0. 0.\nend structure\n\n",
            template.display(),
            center.x,
            center.y,
            center.z
        ),
        PackingBlock::Fluid { count: 0, .. } => String::new(),
        PackingBlock::Fluid {
            template,
            count,
            region,
            ..
        } => format!(
            "structure {}\n  number {}\n  inside box {:?} {:?} {:?} {:?} {:?} {:?}\nend structure\n\n",
            template.display(),
            count,
            region.min.x,
            region.min.y,
            region.min.z,
            region.max.x,
            region.max.y,
            region.max.z
        ),
    }
}

/// The species block this entry contributes to the packer output, if any.
pub fn manifest_entry(block: &PackingBlock) -> Option<ManifestEntry> {
    match block {
        PackingBlock::Cell { .. } => None,
        PackingBlock::Solid {
            species,
            atoms_per_molecule,
            ..
        } => Some(ManifestEntry {
            species: species.clone(),
            atoms_per_molecule: *atoms_per_molecule,
            molecule_count: 1,
        }),
        PackingBlock::Fluid {
            species,
            atoms_per_molecule,
            count,
            ..
        } => Some(ManifestEntry {
            species: species.clone(),
            atoms_per_molecule: *atoms_per_molecule,
            molecule_count: *count,
        }),
    }
}

/// The header shared by every packer input.
pub fn render_header(tolerance: f64, seed: u64) -> String {
    format!("tolerance {:?}\nfiletype xyz\nseed {}\n\n", tolerance, seed)
}

/// A complete packer input: header, output path and blocks in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PackerInput {
    pub tolerance: f64,
    pub seed: u64,
    pub output: PathBuf,
    pub blocks: Vec<PackingBlock>,
}

impl PackerInput {
    pub fn render(&self) -> String {
        let mut text = render_header(self.tolerance, self.seed);
        text.push_str(&format!("output {}\n\n", self.output.display()));
        for block in &self.blocks {
            text.push_str(&render_block(block));
        }
        text
    }

    /// Species blocks in the order the engine writes them.
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        self.blocks.iter().filter_map(manifest_entry).collect()
    }

    pub fn total_molecules(&self) -> usize {
        self.manifest().iter().map(|e| e.molecule_count).sum()
    }
}

/// Something that can turn a packer input file into a packed XYZ file.
pub trait PackingEngine: Sync {
    /// Runs the engine on `input`, which names `output` as its output path, and captures
    /// its diagnostics in `log`.
    ///
    /// Returns the exit code, if the engine exited normally. A non-zero code is not an
    /// error by itself; the caller decides based on whether `output` was written.
    fn run(&self, input: &Path, output: &Path, log: &Path) -> Result<Option<i32>, AssemblyError>;
}

/// The packing engine as an external process reading its input from standard input.
#[derive(Debug, Clone)]
pub struct ExternalPacker {
    executable: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ExternalPacker {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            timeout,
        }
    }

    /// Resolves the executable from the [`PACKER_ENV_VAR`] environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::InvalidConfiguration`] if the variable is unset or empty.
    pub fn from_env(timeout: Duration) -> Result<Self, AssemblyError> {
        match std::env::var_os(PACKER_ENV_VAR) {
            Some(path) if !path.is_empty() => Ok(Self::new(path, timeout)),
            _ => Err(AssemblyError::InvalidConfiguration(format!(
                "the {} environment variable does not name a packing engine",
                PACKER_ENV_VAR
            ))),
        }
    }

    /// Adds an argument passed before the engine reads standard input.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl PackingEngine for ExternalPacker {
    fn run(&self, input: &Path, _output: &Path, log: &Path) -> Result<Option<i32>, AssemblyError> {
        let stdin = File::open(input).map_err(|e| AssemblyError::io(input, e))?;
        let stdout = File::create(log).map_err(|e| AssemblyError::io(log, e))?;
        let stderr = stdout.try_clone().map_err(|e| AssemblyError::io(log, e))?;

        let mut child = Command::new(&self.executable)
            .args(&self.args)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| {
                AssemblyError::PackingFailure(format!(
                    "failed to start '{}': {}",
                    self.executable.display(),
                    e
                ))
            })?;
        debug!(pid = child.id(), executable = %self.executable.display(), "Packing engine started.");

        let started = Instant::now();
        loop {
            let status = child
                .try_wait()
                .map_err(|e| AssemblyError::io(&self.executable, e))?;
            if let Some(status) = status {
                return Ok(status.code());
            }
            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                if let Err(e) = child.kill().and_then(|_| child.wait()) {
                    warn!("Failed to stop timed-out packing engine: {}", e);
                }
                return Err(AssemblyError::PackingTimeout {
                    timeout: self.timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL.min(self.timeout - elapsed));
        }
    }
}

/// Writes `input` to `input_path`, runs `engine` and reads the packed atoms back,
/// bound to `cell`.
///
/// Any stale output from an earlier run is removed first, so an output file is only
/// accepted if this invocation produced it.
///
/// # Errors
///
/// Propagates engine errors such as [`AssemblyError::PackingTimeout`], and returns
/// [`AssemblyError::PackingFailure`] when the engine leaves no output file.
#[instrument(skip_all, name = "packer", fields(seed = input.seed))]
pub fn run_packer<E: PackingEngine + ?Sized>(
    engine: &E,
    input: &PackerInput,
    input_path: &Path,
    log_path: &Path,
    cell: &Cell,
) -> Result<AtomSet, AssemblyError> {
    fs::write(input_path, input.render()).map_err(|e| AssemblyError::io(input_path, e))?;
    match fs::remove_file(&input.output) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            return Err(AssemblyError::io(&input.output, e));
        }
        _ => {}
    }

    let exit_code = engine.run(input_path, &input.output, log_path)?;
    if !input.output.is_file() {
        return Err(AssemblyError::PackingFailure(format!(
            "'{}' was not written (exit code {:?}, see '{}')",
            input.output.display(),
            exit_code,
            log_path.display()
        )));
    }
    if exit_code != Some(0) {
        warn!(
            ?exit_code,
            log = %log_path.display(),
            "Packing engine exited abnormally but produced an output file; using it."
        );
    }

    let frame = XyzFile::read_from_path(&input.output)
        .map_err(|e| AssemblyError::structure(&input.output, e))?;
    info!(atoms = frame.atoms.len(), "Packed structure read back.");
    Ok(frame.into_atom_set(cell.clone()))
}
