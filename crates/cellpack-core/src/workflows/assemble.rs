use crate::core::catalog::SpeciesCatalog;
use crate::core::io::poscar::PoscarFile;
use crate::core::io::traits::{Frame, StructureFile};
use crate::core::io::xyz::XyzFile;
use crate::core::models::atom_set::AtomSet;
use crate::engine::config::AssemblyConfig;
use crate::engine::density::plan_species;
use crate::engine::error::AssemblyError;
use crate::engine::overlap::{FilterOutcome, OverlapFilter};
use crate::engine::packer::{PackerInput, PackingBlock, PackingEngine, Region, run_packer};
use crate::engine::partition::partition;
use crate::engine::plan::PlacementPlan;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::stage::PipelineStage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Directory under `out_dir` holding the single-molecule packer templates.
pub const TEMPLATE_DIR_NAME: &str = "templates";
/// File under `out_dir` holding the merged, wrapped solid scaffold.
pub const SCAFFOLD_FILE_NAME: &str = "solid_scaffold.xyz";

/// Requested and achieved molecule counts for one fluid species in one realization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesCount {
    pub species: String,
    pub requested: usize,
    /// Molecules left after fluid-fluid filtering.
    pub after_fluid_filter: usize,
    /// Molecules in the final structure.
    pub accepted: usize,
    /// Molecules were requested but none survived filtering.
    pub exhausted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealizationReport {
    pub index: usize,
    pub seed: u64,
    pub output: PathBuf,
    pub solid_atoms: usize,
    pub fluid_atoms: usize,
    pub counts: Vec<SpeciesCount>,
}

impl RealizationReport {
    pub fn accepted_molecules(&self) -> usize {
        self.counts.iter().map(|c| c.accepted).sum()
    }

    pub fn requested_molecules(&self) -> usize {
        self.counts.iter().map(|c| c.requested).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealizationFailure {
    pub index: usize,
    pub stage: PipelineStage,
    pub message: String,
}

/// Outcome of a whole run, one entry per realization index in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssemblyReport {
    pub realizations: Vec<RealizationReport>,
    pub failures: Vec<RealizationFailure>,
}

impl AssemblyReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builds `config.population` realizations of the catalog's cell.
///
/// Configuration and species problems are detected before the packing engine is
/// invoked and abort the run. A failing realization is logged and recorded in the
/// report, and the run continues, unless `config.fail_fast` is set.
///
/// # Errors
///
/// Returns [`AssemblyError::InvalidConfiguration`] or [`AssemblyError::InvalidSpecies`]
/// for validation failures, I/O errors for the shared artifacts, and, with
/// `fail_fast`, the first [`AssemblyError::Realization`] error.
#[instrument(skip_all, name = "assembly_workflow")]
pub fn run<E: PackingEngine>(
    catalog: &SpeciesCatalog,
    config: &AssemblyConfig,
    engine: &E,
    reporter: &ProgressReporter,
) -> Result<AssemblyReport, AssemblyError> {
    // === Phase 0: Validation and shared artifacts ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let assembly = Assembly::prepare(catalog, config, engine, reporter)?;
    assembly.write_shared_artifacts()?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Realizations ===
    reporter.report(Progress::PhaseStart {
        name: "Assembling Realizations",
    });
    reporter.report(Progress::TaskStart {
        total_steps: config.population as u64,
    });

    let mut report = AssemblyReport::default();

    #[cfg(not(feature = "parallel"))]
    for index in 0..config.population {
        let outcome = assembly.realize_reported(index);
        assembly.record(&mut report, index, outcome)?;
    }

    #[cfg(feature = "parallel")]
    {
        let outcomes: Vec<_> = (0..config.population)
            .into_par_iter()
            .map(|index| assembly.realize_reported(index))
            .collect();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            assembly.record(&mut report, index, outcome)?;
        }
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    info!(
        completed = report.realizations.len(),
        failed = report.failures.len(),
        "Assembly workflow complete."
    );
    Ok(report)
}

/// Read-only state shared by every realization.
struct Assembly<'a, 'r, E> {
    catalog: &'a SpeciesCatalog,
    config: &'a AssemblyConfig,
    engine: &'a E,
    reporter: &'a ProgressReporter<'r>,
    blocks: Vec<PackingBlock>,
    scaffold: AtomSet,
}

struct RealizationPaths {
    packer_input: PathBuf,
    packer_output: PathBuf,
    packer_log: PathBuf,
    fluid_filtered: PathBuf,
    system: PathBuf,
    system_partial: PathBuf,
}

impl RealizationPaths {
    fn new(out_dir: &Path, index: usize) -> Self {
        Self {
            packer_input: out_dir.join(format!("fluid_packmol_{:02}.inp", index)),
            packer_output: out_dir.join(format!("fluid_packmol_{:02}.xyz", index)),
            packer_log: out_dir.join(format!("fluid_packmol_{:02}.log", index)),
            fluid_filtered: out_dir.join(format!("fluid_non_duplicate_{:02}_POSCAR", index)),
            system: out_dir.join(format!("system_{:02}_POSCAR", index)),
            system_partial: out_dir.join(format!("system_{:02}_POSCAR.partial", index)),
        }
    }
}

fn remove_if_present(path: &Path) -> Result<(), AssemblyError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(AssemblyError::io(path, e)),
        _ => Ok(()),
    }
}

impl<'a, 'r, E: PackingEngine> Assembly<'a, 'r, E> {
    fn prepare(
        catalog: &'a SpeciesCatalog,
        config: &'a AssemblyConfig,
        engine: &'a E,
        reporter: &'a ProgressReporter<'r>,
    ) -> Result<Self, AssemblyError> {
        let cell = catalog.cell();
        let extent = cell.orthogonal_extent().ok_or_else(|| {
            AssemblyError::InvalidConfiguration(
                "the packing cell must be orthogonal with positive edges".to_string(),
            )
        })?;
        let region = Region::periodic_safe(&extent, config.tolerance)?;

        let unknown: Vec<&str> = config
            .densities
            .keys()
            .filter(|name| !catalog.fluids().iter().any(|f| f.name() == name.as_str()))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(AssemblyError::InvalidConfiguration(format!(
                "densities given for unknown fluid species: {}",
                unknown.join(", ")
            )));
        }

        let template_dir = config.out_dir.join(TEMPLATE_DIR_NAME);
        let mut blocks = vec![PackingBlock::Cell { extent }];
        for fluid in catalog.fluids() {
            let density = *config.densities.get(fluid.name()).ok_or_else(|| {
                AssemblyError::InvalidConfiguration(format!(
                    "no density configured for fluid species '{}'",
                    fluid.name()
                ))
            })?;
            let count = plan_species(fluid, density, cell.volume())?;
            let template = template_dir.join(format!("pinp_{}.xyz", fluid.name()));
            blocks.push(PackingBlock::fluid(fluid, template, count, region));
        }

        let assembly = Self {
            catalog,
            config,
            engine,
            reporter,
            blocks,
            scaffold: catalog.solid_scaffold(),
        };
        info!(
            population = config.population,
            fluids = catalog.fluids().len(),
            solid_atoms = assembly.scaffold.len(),
            "Assembly prepared."
        );
        Ok(assembly)
    }

    fn write_shared_artifacts(&self) -> Result<(), AssemblyError> {
        let template_dir = self.config.out_dir.join(TEMPLATE_DIR_NAME);
        fs::create_dir_all(&template_dir).map_err(|e| AssemblyError::io(&template_dir, e))?;

        for fluid in self.catalog.fluids() {
            let path = template_dir.join(format!("pinp_{}.xyz", fluid.name()));
            let frame = Frame::new(fluid.name(), None, fluid.template().to_vec());
            XyzFile::write_to_path(&frame, &path).map_err(|e| AssemblyError::structure(&path, e))?;
        }

        let path = self.config.out_dir.join(SCAFFOLD_FILE_NAME);
        let frame = Frame::from_atom_set(&self.scaffold, "solid scaffold");
        XyzFile::write_to_path(&frame, &path).map_err(|e| AssemblyError::structure(&path, e))?;
        debug!(out_dir = %self.config.out_dir.display(), "Shared artifacts written.");
        Ok(())
    }

    fn realize_reported(&self, index: usize) -> Result<RealizationReport, AssemblyError> {
        let outcome = self.realize(index);
        match &outcome {
            Ok(report) => self.reporter.report(Progress::RealizationDone {
                index,
                fluid_molecules: report.accepted_molecules(),
            }),
            Err(e) => self.reporter.report(Progress::RealizationFailed {
                index,
                stage: e.stage().unwrap_or(PipelineStage::Init),
            }),
        }
        self.reporter.report(Progress::TaskIncrement);
        outcome
    }

    fn record(
        &self,
        report: &mut AssemblyReport,
        index: usize,
        outcome: Result<RealizationReport, AssemblyError>,
    ) -> Result<(), AssemblyError> {
        match outcome {
            Ok(realization) => report.realizations.push(realization),
            Err(e) => {
                error!(index, "{}", e);
                if self.config.fail_fast {
                    return Err(e);
                }
                report.failures.push(RealizationFailure {
                    index,
                    stage: e.stage().unwrap_or(PipelineStage::Init),
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }

    #[instrument(skip(self), name = "realization")]
    fn realize(&self, index: usize) -> Result<RealizationReport, AssemblyError> {
        let at =
            move |stage: PipelineStage| move |e: AssemblyError| e.in_realization(index, stage);
        let cell = self.catalog.cell();
        let paths = RealizationPaths::new(&self.config.out_dir, index);

        remove_if_present(&paths.system).map_err(at(PipelineStage::Init))?;
        remove_if_present(&paths.system_partial).map_err(at(PipelineStage::Init))?;

        let seed = self.config.realization_seed(index);
        let input = PackerInput {
            tolerance: self.config.tolerance,
            seed,
            output: paths.packer_output.clone(),
            blocks: self.blocks.clone(),
        };
        let manifest = input.manifest();

        let packed = if input.total_molecules() == 0 {
            info!("No fluid molecules requested; skipping the packing engine.");
            self.reporter.report(Progress::Message(format!(
                "system {:02}: no fluid molecules requested, packing skipped",
                index
            )));
            AtomSet::new(cell.clone())
        } else {
            run_packer(
                self.engine,
                &input,
                &paths.packer_input,
                &paths.packer_log,
                cell,
            )
            .map_err(at(PipelineStage::InvokePacker))?
        };

        let raw_plan =
            partition(packed.len(), &manifest).map_err(at(PipelineStage::PartitionResult))?;

        let fluid = OverlapFilter::fluid_fluid(self.config.tolerance)
            .apply(AtomSet::new(cell.clone()), &packed, &raw_plan)
            .map_err(at(PipelineStage::FilterFluidFluid))?;
        let frame = Frame::from_atom_set(&fluid.atoms, "");
        PoscarFile::write_to_path(&frame, &paths.fluid_filtered)
            .map_err(|e| AssemblyError::structure(&paths.fluid_filtered, e))
            .map_err(at(PipelineStage::FilterFluidFluid))?;

        let base = self.scaffold.clone();
        debug!(
            solid_atoms = base.len(),
            fluid_atoms = fluid.atoms.len(),
            "Merging fluid onto the solid scaffold."
        );

        let filter =
            OverlapFilter::fluid_solid(self.config.solid_fluid_tolerance, self.config.tolerance);
        let system = filter
            .apply(base, &fluid.atoms, &fluid.plan)
            .map_err(at(PipelineStage::FilterFluidSolid))?;

        self.persist(&system, &paths).map_err(at(PipelineStage::Persist))?;

        let counts = species_counts(&raw_plan, &fluid, &system);
        for count in counts.iter().filter(|c| c.exhausted) {
            warn!(
                species = %count.species,
                requested = count.requested,
                "No molecules of this species survived filtering."
            );
        }
        let report = RealizationReport {
            index,
            seed,
            output: paths.system,
            solid_atoms: system.base_len,
            fluid_atoms: system.atoms.len() - system.base_len,
            counts,
        };
        info!(
            seed,
            requested = report.requested_molecules(),
            accepted = report.accepted_molecules(),
            "Realization complete."
        );
        Ok(report)
    }

    fn persist(&self, system: &FilterOutcome, paths: &RealizationPaths) -> Result<(), AssemblyError> {
        let frame = Frame::from_atom_set(&system.atoms, "");
        PoscarFile::write_to_path(&frame, &paths.system_partial)
            .map_err(|e| AssemblyError::structure(&paths.system_partial, e))?;
        fs::rename(&paths.system_partial, &paths.system)
            .map_err(|e| AssemblyError::io(&paths.system, e))
    }
}

fn species_counts(
    raw: &PlacementPlan,
    fluid: &FilterOutcome,
    system: &FilterOutcome,
) -> Vec<SpeciesCount> {
    raw.placements()
        .iter()
        .zip(fluid.plan.placements())
        .zip(system.plan.placements())
        .map(|((raw, fluid), system)| SpeciesCount {
            species: raw.species.clone(),
            requested: raw.requested,
            after_fluid_filter: fluid.molecule_count(),
            accepted: system.molecule_count(),
            exhausted: raw.requested > 0 && system.molecule_count() == 0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::cell::Cell;
    use crate::core::models::species::{Species, SpeciesKind};
    use crate::engine::config::AssemblyConfigBuilder;
    use crate::engine::density::AVOGADRO;
    use itertools::Itertools;
    use nalgebra::{Matrix3, Point3, Vector3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Reads the packer input like the real engine does and drops translated template
    /// copies at random points of each box, without avoiding contacts.
    #[derive(Default)]
    struct RandomPacker {
        calls: AtomicUsize,
    }

    impl PackingEngine for RandomPacker {
        fn run(&self, input: &Path, _: &Path, _: &Path) -> Result<Option<i32>, AssemblyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = fs::read_to_string(input).map_err(|e| AssemblyError::io(input, e))?;
            let mut seed = 0;
            let mut output = PathBuf::new();
            let mut template = PathBuf::new();
            let mut number = 0;
            let mut atoms = Vec::new();
            let mut rng = None;

            for line in text.lines() {
                let fields: Vec<&str> = line.split_whitespace().collect();
                match fields.as_slice() {
                    ["seed", value] => seed = value.parse().unwrap(),
                    ["output", path] => output = PathBuf::from(path),
                    ["structure", path] => template = PathBuf::from(path),
                    ["number", n] => number = n.parse().unwrap(),
                    ["inside", "box", bounds @ ..] => {
                        let b: Vec<f64> = bounds.iter().map(|v| v.parse().unwrap()).collect();
                        let rng = rng.get_or_insert_with(|| StdRng::seed_from_u64(seed));
                        let molecule = XyzFile::read_from_path(&template).unwrap().atoms;
                        let centroid = molecule
                            .iter()
                            .fold(Vector3::zeros(), |acc, a| acc + a.position.coords)
                            / molecule.len() as f64;
                        for _ in 0..number {
                            let target = Vector3::new(
                                rng.gen_range(b[0]..b[3]),
                                rng.gen_range(b[1]..b[4]),
                                rng.gen_range(b[2]..b[5]),
                            );
                            for atom in &molecule {
                                atoms.push(Atom::new(
                                    &atom.element,
                                    atom.position - centroid + target,
                                ));
                            }
                        }
                    }
                    _ => {}
                }
            }

            XyzFile::write_to_path(&Frame::new("random", None, atoms), &output).unwrap();
            Ok(Some(0))
        }
    }

    struct FailingPacker;

    impl PackingEngine for FailingPacker {
        fn run(&self, _: &Path, _: &Path, _: &Path) -> Result<Option<i32>, AssemblyError> {
            Err(AssemblyError::PackingTimeout {
                timeout: std::time::Duration::from_secs(30),
            })
        }
    }

    fn dimer() -> Species {
        Species::new(
            "n2",
            SpeciesKind::Fluid,
            vec![
                Atom::new("N", Point3::origin()),
                Atom::new("N", Point3::new(1.1, 0.0, 0.0)),
            ],
        )
        .unwrap()
    }

    fn slab() -> Species {
        Species::new(
            "slab",
            SpeciesKind::Solid,
            vec![
                Atom::new("Si", Point3::new(5.0, 5.0, 0.5)),
                Atom::new("Si", Point3::new(10.5, 0.5, 0.5)),
            ],
        )
        .unwrap()
    }

    /// Density that requests `count` molecules of `species` in `volume` Å³.
    fn density_for(species: &Species, count: usize, volume: f64) -> f64 {
        (count as f64 + 0.5) * species.molar_mass() / (AVOGADRO * 1e-24 * volume)
    }

    fn config(out_dir: &Path, density: f64) -> AssemblyConfigBuilder {
        AssemblyConfigBuilder::new()
            .out_dir(out_dir.to_path_buf())
            .tolerance(2.0)
            .solid_fluid_tolerance(3.0)
            .seed(42)
            .population(1)
            .density("n2", density)
    }

    fn assert_fluid_separated(atoms: &AtomSet, first_fluid: usize, tolerance: f64) {
        let molecules: Vec<_> = (first_fluid..atoms.len()).step_by(2).map(|s| s..s + 2).collect();
        for (a, b) in molecules.iter().tuple_combinations() {
            let d = atoms.min_distance_between(a.clone(), b.clone()).unwrap();
            assert!(d >= tolerance - 1e-9, "molecules {:?} and {:?} are {} Å apart", a, b, d);
        }
    }

    #[test]
    fn small_box_scenario_keeps_fluid_apart_and_the_cell_unchanged() {
        let dir = tempdir().unwrap();
        let cell = Cell::orthogonal(10.0, 10.0, 10.0).unwrap();
        let n2 = dimer();
        let density = density_for(&n2, 5, cell.volume());
        let catalog = SpeciesCatalog::new(cell.clone(), vec![n2]).unwrap();
        let config = config(dir.path(), density).build().unwrap();
        let packer = RandomPacker::default();

        let report = run(&catalog, &config, &packer, &ProgressReporter::new()).unwrap();

        assert!(report.is_complete());
        let realization = &report.realizations[0];
        assert_eq!(realization.counts[0].requested, 5);
        assert!(realization.accepted_molecules() <= 5);
        assert!(realization.fluid_atoms <= 10);

        let frame = PoscarFile::read_from_path(&realization.output).unwrap();
        let written = frame.cell.clone().unwrap();
        assert!((written.matrix() - cell.matrix()).norm() < 1e-9);
        assert_eq!(frame.atoms.len(), realization.fluid_atoms);
        assert_fluid_separated(&frame.into_atom_set(cell), 0, 2.0);

        assert!(dir.path().join("templates/pinp_n2.xyz").is_file());
        assert!(dir.path().join("fluid_packmol_00.inp").is_file());
        assert!(dir.path().join("fluid_non_duplicate_00_POSCAR").is_file());
        assert!(!dir.path().join("system_00_POSCAR.partial").exists());
    }

    #[test]
    fn solid_atoms_are_unchanged_and_fluid_keeps_its_distance() {
        let dir = tempdir().unwrap();
        let cell = Cell::orthogonal(12.0, 12.0, 12.0).unwrap();
        let n2 = dimer();
        let density = density_for(&n2, 30, cell.volume());
        let catalog = SpeciesCatalog::new(cell.clone(), vec![slab(), n2]).unwrap();
        let config = config(dir.path(), density).population(3).build().unwrap();

        let packer = RandomPacker::default();
        let report = run(&catalog, &config, &packer, &ProgressReporter::new()).unwrap();
        assert_eq!(report.realizations.len(), 3);
        assert_eq!(packer.calls.load(Ordering::SeqCst), 3);

        let scaffold = catalog.solid_scaffold();
        for realization in &report.realizations {
            assert_eq!(realization.solid_atoms, 2);
            let atoms = PoscarFile::read_from_path(&realization.output)
                .unwrap()
                .into_atom_set(cell.clone());
            for (written, solid) in atoms.atoms()[..2].iter().zip(scaffold.atoms()) {
                assert_eq!(written.element, solid.element);
                assert!((written.position - solid.position).norm() < 1e-12);
            }
            for i in (2..atoms.len()).step_by(2) {
                let d = atoms.min_distance_between(0..2, i..i + 2).unwrap();
                assert!(d >= 3.0 - 1e-9, "fluid molecule at {} is {} Å from the solid", i, d);
            }
            assert_fluid_separated(&atoms, 2, 2.0);
        }
        let seeds: Vec<u64> = report.realizations.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![42, 43, 44]);
    }

    #[test]
    fn missing_density_fails_before_packing() {
        let dir = tempdir().unwrap();
        let cell = Cell::orthogonal(10.0, 10.0, 10.0).unwrap();
        let catalog = SpeciesCatalog::new(cell, vec![dimer()]).unwrap();
        let config = AssemblyConfigBuilder::new()
            .out_dir(dir.path().to_path_buf())
            .tolerance(2.0)
            .seed(1)
            .population(2)
            .build()
            .unwrap();
        let packer = RandomPacker::default();

        let result = run(&catalog, &config, &packer, &ProgressReporter::new());

        assert!(matches!(result, Err(AssemblyError::InvalidConfiguration(msg)) if msg.contains("n2")));
        assert_eq!(packer.calls.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("templates").exists());
    }

    #[test]
    fn density_for_unknown_species_is_rejected() {
        let dir = tempdir().unwrap();
        let cell = Cell::orthogonal(10.0, 10.0, 10.0).unwrap();
        let catalog = SpeciesCatalog::new(cell, vec![dimer()]).unwrap();
        let config = config(dir.path(), 0.1).density("water", 1.0).build().unwrap();
        let result = run(&catalog, &config, &RandomPacker::default(), &ProgressReporter::new());
        assert!(matches!(result, Err(AssemblyError::InvalidConfiguration(msg)) if msg.contains("water")));
    }

    #[test]
    fn non_orthogonal_cell_is_rejected() {
        let dir = tempdir().unwrap();
        let cell = Cell::new(Matrix3::new(10.0, 0.0, 0.0, 3.0, 10.0, 0.0, 0.0, 0.0, 10.0)).unwrap();
        let catalog = SpeciesCatalog::new(cell, vec![dimer()]).unwrap();
        let config = config(dir.path(), 0.1).build().unwrap();
        let result = run(&catalog, &config, &RandomPacker::default(), &ProgressReporter::new());
        assert!(matches!(result, Err(AssemblyError::InvalidConfiguration(_))));
    }

    #[test]
    fn zero_requested_molecules_skip_the_packer() {
        let dir = tempdir().unwrap();
        let cell = Cell::orthogonal(12.0, 12.0, 12.0).unwrap();
        let catalog = SpeciesCatalog::new(cell, vec![slab(), dimer()]).unwrap();
        let config = config(dir.path(), 0.0).build().unwrap();
        let packer = RandomPacker::default();
        let messages = std::sync::Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::Message(text) = event {
                messages.lock().unwrap().push(text);
            }
        }));

        let report = run(&catalog, &config, &packer, &reporter).unwrap();
        drop(reporter);

        assert_eq!(packer.calls.load(Ordering::SeqCst), 0);
        let realization = &report.realizations[0];
        assert_eq!(realization.fluid_atoms, 0);
        assert!(!realization.counts[0].exhausted);
        let frame = PoscarFile::read_from_path(&realization.output).unwrap();
        assert_eq!(frame.atoms.len(), 2);
        let messages = messages.into_inner().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("system 00"));
    }

    #[test]
    fn realization_without_any_atoms_reads_back_empty() {
        let dir = tempdir().unwrap();
        let cell = Cell::orthogonal(10.0, 10.0, 10.0).unwrap();
        let catalog = SpeciesCatalog::new(cell.clone(), vec![dimer()]).unwrap();
        let config = config(dir.path(), 0.0).build().unwrap();

        let report = run(&catalog, &config, &FailingPacker, &ProgressReporter::new()).unwrap();

        let realization = &report.realizations[0];
        assert_eq!(realization.solid_atoms + realization.fluid_atoms, 0);
        let system = PoscarFile::read_from_path(&realization.output).unwrap();
        assert!(system.atoms.is_empty());
        assert_eq!(system.cell, Some(cell));
        let fluid = PoscarFile::read_from_path(dir.path().join("fluid_non_duplicate_00_POSCAR"))
            .unwrap();
        assert!(fluid.atoms.is_empty());
    }

    /// Writes one atom fewer than the request asks for.
    struct ShortPacker;

    impl PackingEngine for ShortPacker {
        fn run(&self, input: &Path, output: &Path, _: &Path) -> Result<Option<i32>, AssemblyError> {
            let requested: usize = fs::read_to_string(input)
                .unwrap()
                .lines()
                .filter_map(|line| line.trim().strip_prefix("number "))
                .map(|n| n.trim().parse::<usize>().unwrap() * 2)
                .sum();
            let atoms = (0..requested - 1)
                .map(|i| Atom::new("N", Point3::new(i as f64, 0.0, 0.0)))
                .collect();
            XyzFile::write_to_path(&Frame::new("short", None, atoms), output).unwrap();
            Ok(Some(0))
        }
    }

    #[test]
    fn short_packer_output_fails_at_partitioning() {
        let dir = tempdir().unwrap();
        let cell = Cell::orthogonal(10.0, 10.0, 10.0).unwrap();
        let n2 = dimer();
        let density = density_for(&n2, 3, cell.volume());
        let catalog = SpeciesCatalog::new(cell, vec![n2]).unwrap();
        let config = config(dir.path(), density).build().unwrap();

        let report = run(&catalog, &config, &ShortPacker, &ProgressReporter::new()).unwrap();

        assert!(report.realizations.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, PipelineStage::PartitionResult);
        assert!(report.failures[0].message.contains("expects 6"));
        assert!(!dir.path().join("system_00_POSCAR").exists());
    }

    #[test]
    fn failed_realizations_are_recorded_and_leave_no_output() {
        let dir = tempdir().unwrap();
        let cell = Cell::orthogonal(10.0, 10.0, 10.0).unwrap();
        let n2 = dimer();
        let density = density_for(&n2, 3, cell.volume());
        let catalog = SpeciesCatalog::new(cell, vec![n2]).unwrap();
        let config = config(dir.path(), density).population(2).build().unwrap();
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(dir.path().join("system_01_POSCAR"), "stale").unwrap();

        let failures = std::sync::Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::RealizationFailed { index, stage } = event {
                failures.lock().unwrap().push((index, stage));
            }
        }));
        let report = run(&catalog, &config, &FailingPacker, &reporter).unwrap();
        drop(reporter);

        assert!(report.realizations.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[1].index, 1);
        assert_eq!(report.failures[1].stage, PipelineStage::InvokePacker);
        assert!(!dir.path().join("system_00_POSCAR").exists());
        assert!(!dir.path().join("system_01_POSCAR").exists());
        assert_eq!(failures.into_inner().unwrap().len(), 2);
    }

    #[test]
    fn fail_fast_returns_the_first_realization_error() {
        let dir = tempdir().unwrap();
        let cell = Cell::orthogonal(10.0, 10.0, 10.0).unwrap();
        let n2 = dimer();
        let density = density_for(&n2, 3, cell.volume());
        let catalog = SpeciesCatalog::new(cell, vec![n2]).unwrap();
        let config = config(dir.path(), density)
            .population(3)
            .fail_fast(true)
            .build()
            .unwrap();

        let result = run(&catalog, &config, &FailingPacker, &ProgressReporter::new());

        match result {
            Err(AssemblyError::Realization { index, stage, source }) => {
                assert_eq!(index, 0);
                assert_eq!(stage, PipelineStage::InvokePacker);
                assert!(matches!(*source, AssemblyError::PackingTimeout { .. }));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
