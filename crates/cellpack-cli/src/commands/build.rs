use crate::cli::BuildArgs;
use crate::config::PartialAssemblyConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use cellpack::{
    core::catalog::SpeciesCatalog,
    engine::{packer::ExternalPacker, progress::ProgressReporter},
    workflows::{self, assemble::AssemblyReport},
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SUMMARY_FILE_NAME: &str = "summary.toml";

pub async fn run(args: BuildArgs) -> Result<()> {
    let partial_config = PartialAssemblyConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let app = partial_config.merge_with_cli(&args)?;
    let config = &app.core_config;

    let packer = match &app.packer {
        Some(path) => ExternalPacker::new(path, config.packer_timeout),
        None => ExternalPacker::from_env(config.packer_timeout)?,
    };
    info!("Using packing engine {:?}", packer.executable());

    info!("Loading species catalog from {:?}", &app.src_dir);
    let catalog = SpeciesCatalog::load(&app.src_dir)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Assembling {} realization(s) into {}...",
        config.population,
        config.out_dir.display()
    );
    info!("Invoking the core assembly workflow...");

    let report = tokio::task::block_in_place(|| {
        workflows::assemble::run(&catalog, config, &packer, &reporter)
    })?;

    for realization in &report.realizations {
        let counts: Vec<String> = realization
            .counts
            .iter()
            .map(|c| format!("{} {}/{}", c.species, c.accepted, c.requested))
            .collect();
        println!(
            "✓ {} ({})",
            realization.output.display(),
            if counts.is_empty() {
                "solid only".to_string()
            } else {
                counts.join(", ")
            }
        );
    }
    for failure in &report.failures {
        println!(
            "✗ realization {:02} failed during {}: {}",
            failure.index, failure.stage, failure.message
        );
    }

    let summary_path = write_summary(&config.out_dir, &report)?;
    println!("Summary written to: {}", summary_path.display());

    if report.realizations.is_empty() && !report.failures.is_empty() {
        return Err(CliError::Other(anyhow::anyhow!(
            "all {} realization(s) failed",
            report.failures.len()
        )));
    }
    if !report.is_complete() {
        warn!(
            failed = report.failures.len(),
            "Some realizations failed; see the summary for details."
        );
    }
    Ok(())
}

fn write_summary(out_dir: &Path, report: &AssemblyReport) -> Result<PathBuf> {
    let path = out_dir.join(SUMMARY_FILE_NAME);
    let text = toml::to_string(report).map_err(|e| CliError::Other(e.into()))?;
    std::fs::write(&path, text)?;
    Ok(path)
}
