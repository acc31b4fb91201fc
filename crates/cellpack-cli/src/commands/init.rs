use crate::cli::InitArgs;
use crate::config::DefaultsConfig;
use crate::error::{CliError, Result};
use cellpack::core::catalog::{
    CELL_FILE_NAME, FLUID_DIR_NAME, SOLID_DIR_NAME, source_files, species_name,
};
use cellpack::core::io::poscar::PoscarFile;
use cellpack::core::io::traits::{Frame, StructureFile};
use cellpack::core::models::atom::Atom;
use cellpack::core::models::cell::Cell;
use nalgebra::Point3;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Edge length of the cubic cell written when a project has none.
pub const DEFAULT_CELL_EDGE: f64 = 50.0;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug)]
pub struct InitSummary {
    pub config_path: PathBuf,
    pub cell_created: bool,
    pub fluids: Vec<String>,
}

pub async fn run(args: InitArgs) -> Result<()> {
    let summary = initialize(&args.root, args.force)?;
    if summary.cell_created {
        println!(
            "Created a {0} x {0} x {0} Å cell in {1}.",
            DEFAULT_CELL_EDGE,
            args.root.join("src").join(CELL_FILE_NAME).display()
        );
    }
    println!("Wrote {}.", summary.config_path.display());
    if summary.fluids.is_empty() {
        println!(
            "Add fluid molecules to {} and a [fluid.<name>] density for each.",
            args.root.join("src").join(FLUID_DIR_NAME).display()
        );
    } else {
        println!(
            "Set a density for each fluid in the config: {}",
            summary.fluids.join(", ")
        );
    }
    Ok(())
}

/// Creates `root/src/{solid,fluid}`, a default cell if none exists, and a config file
/// listing every fluid already present.
pub fn initialize(root: &Path, force: bool) -> Result<InitSummary> {
    let src_dir = root.join("src");
    for dir in [src_dir.join(SOLID_DIR_NAME), src_dir.join(FLUID_DIR_NAME)] {
        fs::create_dir_all(&dir)?;
    }

    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        return Err(CliError::Config(format!(
            "'{}' already exists; pass --force to overwrite it",
            config_path.display()
        )));
    }

    let cell_path = src_dir.join(CELL_FILE_NAME);
    let cell_created = !cell_path.exists();
    if cell_created {
        write_default_cell(&cell_path)?;
        info!("Wrote default cell to {:?}", cell_path);
    }

    let fluids: Vec<String> = source_files(&src_dir.join(FLUID_DIR_NAME))?
        .iter()
        .filter_map(|path| species_name(path))
        .collect();
    fs::write(&config_path, render_config(&fluids))?;
    info!(fluids = fluids.len(), "Wrote configuration to {:?}", config_path);

    Ok(InitSummary {
        config_path,
        cell_created,
        fluids,
    })
}

fn write_default_cell(path: &Path) -> Result<()> {
    let cell = Cell::orthogonal(DEFAULT_CELL_EDGE, DEFAULT_CELL_EDGE, DEFAULT_CELL_EDGE)
        .map_err(|e| CliError::Other(e.into()))?;
    // Only the lattice is used; POSCAR needs at least one atom.
    let frame = Frame::new("cell", Some(cell), vec![Atom::new("H", Point3::origin())]);
    PoscarFile::write_to_path(&frame, path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn render_config(fluids: &[String]) -> String {
    let defaults = DefaultsConfig::default();
    let mut text = format!(
        "# cellpack assembly configuration\n\
         src-dir = {:?}\n\
         out-dir = {:?}\n\
         tolerance = {:?}\n\
         solid-fluid-tolerance = {:?}\n\
         seed = {}\n\
         population = {}\n\
         packer-timeout-secs = {}\n\
         fail-fast = {}\n",
        defaults.src_dir,
        defaults.out_dir,
        defaults.tolerance,
        defaults.solid_fluid_tolerance,
        defaults.seed,
        defaults.population,
        defaults.packer_timeout_secs,
        defaults.fail_fast,
    );
    for name in fluids {
        text.push_str(&format!("\n[fluid.{:?}]\n# density = 1.0  # g/cm^3\n", name));
    }
    text
}
