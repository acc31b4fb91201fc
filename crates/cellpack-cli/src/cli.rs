use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "CCEL",
    version,
    about = "cellpack - assemble periodic simulation cells from a solid scaffold and fluid molecules packed at a target density.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of realizations assembled concurrently.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a project skeleton: source directories, a default cell and a config file.
    Init(InitArgs),
    /// Assemble every realization described by a configuration file.
    Build(BuildArgs),
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project directory to initialize.
    #[arg(default_value = ".", value_name = "ROOT")]
    pub root: PathBuf,

    /// Overwrite an existing config.toml.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to the assembly configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the fluid-fluid minimum distance in Å.
    #[arg(short, long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,

    /// Override the solid-fluid minimum distance in Å.
    #[arg(long, value_name = "FLOAT")]
    pub solid_fluid_tolerance: Option<f64>,

    /// Override the base random seed; realization i uses seed + i.
    #[arg(short, long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Override the number of realizations to assemble.
    #[arg(short = 'n', long, value_name = "INT")]
    pub population: Option<usize>,

    /// Override the output directory.
    #[arg(short, long, value_name = "PATH")]
    pub out_dir: Option<PathBuf>,

    /// Packing engine executable. Defaults to the PACKMOL environment variable.
    #[arg(long, value_name = "PATH")]
    pub packer: Option<PathBuf>,

    /// Override the packing engine timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Abort the whole run at the first failed realization.
    #[arg(long)]
    pub fail_fast: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S fluid.water.density=0.997
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
