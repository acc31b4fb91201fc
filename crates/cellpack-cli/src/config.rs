mod defaults;

pub use defaults::DefaultsConfig;

use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use cellpack::engine::config::{self as core_config, AssemblyConfigBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialFluidConfig {
    density: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialAssemblyConfig {
    src_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    tolerance: Option<f64>,
    solid_fluid_tolerance: Option<f64>,
    seed: Option<u64>,
    population: Option<usize>,
    packer_timeout_secs: Option<u64>,
    fail_fast: Option<bool>,
    #[serde(default)]
    fluid: BTreeMap<String, PartialFluidConfig>,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// The fully resolved inputs of a `build` run.
#[derive(Debug)]
pub struct AppConfig {
    pub src_dir: PathBuf,
    pub packer: Option<PathBuf>,
    pub core_config: core_config::AssemblyConfig,
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid value for {}: '{}'", key, value))
    })
}

impl PartialAssemblyConfig {
    /// Reads a config file; relative paths in it resolve against its directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    pub fn merge_with_cli(mut self, args: &BuildArgs) -> Result<AppConfig> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let src_dir = self.resolve(self.src_dir.clone().unwrap_or_else(|| defaults.src_dir.into()));
        let out_dir = match &args.out_dir {
            Some(path) => path.clone(),
            None => self.resolve(self.out_dir.clone().unwrap_or_else(|| defaults.out_dir.into())),
        };

        let mut densities = BTreeMap::new();
        for (name, fluid) in &self.fluid {
            match fluid.density {
                Some(density) => {
                    densities.insert(name.clone(), density);
                }
                None => debug!("Fluid '{}' has no density set; leaving it unconfigured.", name),
            }
        }

        let timeout_secs = args
            .timeout
            .or(self.packer_timeout_secs)
            .unwrap_or(defaults.packer_timeout_secs);

        let core_config = AssemblyConfigBuilder::new()
            .out_dir(out_dir)
            .tolerance(args.tolerance.or(self.tolerance).unwrap_or(defaults.tolerance))
            .solid_fluid_tolerance(
                args.solid_fluid_tolerance
                    .or(self.solid_fluid_tolerance)
                    .unwrap_or(defaults.solid_fluid_tolerance),
            )
            .seed(args.seed.or(self.seed).unwrap_or(defaults.seed))
            .population(args.population.or(self.population).unwrap_or(defaults.population))
            .densities(densities)
            .packer_timeout(Duration::from_secs(timeout_secs))
            .fail_fast(args.fail_fast || self.fail_fast.unwrap_or(defaults.fail_fast))
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(AppConfig {
            src_dir,
            packer: args.packer.clone(),
            core_config,
        })
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        if set_values.is_empty() {
            return Ok(());
        }
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "src-dir" => self.src_dir = Some(PathBuf::from(value_str)),
                "out-dir" => self.out_dir = Some(PathBuf::from(value_str)),
                "tolerance" => self.tolerance = Some(parse_value(key, value_str)?),
                "solid-fluid-tolerance" => {
                    self.solid_fluid_tolerance = Some(parse_value(key, value_str)?)
                }
                "seed" => self.seed = Some(parse_value(key, value_str)?),
                "population" => self.population = Some(parse_value(key, value_str)?),
                "packer-timeout-secs" => {
                    self.packer_timeout_secs = Some(parse_value(key, value_str)?)
                }
                "fail-fast" => self.fail_fast = Some(parse_value(key, value_str)?),
                _ => match key
                    .strip_prefix("fluid.")
                    .and_then(|rest| rest.strip_suffix(".density"))
                {
                    Some(name) if !name.is_empty() => {
                        self.fluid.entry(name.to_string()).or_default().density =
                            Some(parse_value(key, value_str)?);
                    }
                    _ => {
                        return Err(CliError::Config(format!(
                            "Unsupported configuration key for --set: '{}'",
                            key
                        )));
                    }
                },
            }
        }
        Ok(())
    }
}
