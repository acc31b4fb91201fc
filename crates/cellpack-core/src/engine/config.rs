use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TOLERANCE: f64 = 2.0;
pub const DEFAULT_SOLID_FLUID_TOLERANCE: f64 = 3.0;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_POPULATION: usize = 5;
pub const DEFAULT_PACKER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// Everything the assembler needs besides the species catalog.
///
/// `densities` maps fluid species names to target densities in g/cm³. Tolerances are
/// minimum interatomic distances in Å.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyConfig {
    pub out_dir: PathBuf,
    pub tolerance: f64,
    pub solid_fluid_tolerance: f64,
    pub seed: u64,
    pub population: usize,
    pub densities: BTreeMap<String, f64>,
    pub packer_timeout: Duration,
    pub fail_fast: bool,
}

impl AssemblyConfig {
    /// Seed for realization `index`; successive realizations use successive seeds.
    pub fn realization_seed(&self, index: usize) -> u64 {
        self.seed.wrapping_add(index as u64)
    }
}

#[derive(Default)]
pub struct AssemblyConfigBuilder {
    out_dir: Option<PathBuf>,
    tolerance: Option<f64>,
    solid_fluid_tolerance: Option<f64>,
    seed: Option<u64>,
    population: Option<usize>,
    densities: BTreeMap<String, f64>,
    packer_timeout: Option<Duration>,
    fail_fast: bool,
}

impl AssemblyConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn out_dir(mut self, path: PathBuf) -> Self {
        self.out_dir = Some(path);
        self
    }
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
    pub fn solid_fluid_tolerance(mut self, tolerance: f64) -> Self {
        self.solid_fluid_tolerance = Some(tolerance);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn population(mut self, population: usize) -> Self {
        self.population = Some(population);
        self
    }
    pub fn density(mut self, species: &str, g_per_cm3: f64) -> Self {
        self.densities.insert(species.to_string(), g_per_cm3);
        self
    }
    pub fn densities(mut self, densities: BTreeMap<String, f64>) -> Self {
        self.densities.extend(densities);
        self
    }
    pub fn packer_timeout(mut self, timeout: Duration) -> Self {
        self.packer_timeout = Some(timeout);
        self
    }
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn build(self) -> Result<AssemblyConfig, ConfigError> {
        let config = AssemblyConfig {
            out_dir: self.out_dir.ok_or(ConfigError::MissingParameter("out_dir"))?,
            tolerance: self
                .tolerance
                .ok_or(ConfigError::MissingParameter("tolerance"))?,
            solid_fluid_tolerance: self
                .solid_fluid_tolerance
                .unwrap_or(DEFAULT_SOLID_FLUID_TOLERANCE),
            seed: self.seed.ok_or(ConfigError::MissingParameter("seed"))?,
            population: self
                .population
                .ok_or(ConfigError::MissingParameter("population"))?,
            densities: self.densities,
            packer_timeout: self.packer_timeout.unwrap_or(DEFAULT_PACKER_TIMEOUT),
            fail_fast: self.fail_fast,
        };

        positive("tolerance", config.tolerance)?;
        positive("solid_fluid_tolerance", config.solid_fluid_tolerance)?;
        if config.population == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "population",
                reason: "at least one realization is required".to_string(),
            });
        }
        if config.packer_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                parameter: "packer_timeout",
                reason: "must be longer than zero".to_string(),
            });
        }
        for (name, &density) in &config.densities {
            if !density.is_finite() || density < 0.0 {
                return Err(ConfigError::InvalidValue {
                    parameter: "densities",
                    reason: format!("density of '{}' must be a non-negative number, got {}", name, density),
                });
            }
        }
        Ok(config)
    }
}

fn positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            parameter,
            reason: format!("must be a positive distance, got {}", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> AssemblyConfigBuilder {
        AssemblyConfigBuilder::new()
            .out_dir(PathBuf::from("out"))
            .tolerance(2.0)
            .seed(7)
            .population(3)
    }

    #[test]
    fn build_applies_defaults() {
        let config = minimal().density("water", 1.0).build().unwrap();
        assert_eq!(config.solid_fluid_tolerance, DEFAULT_SOLID_FLUID_TOLERANCE);
        assert_eq!(config.packer_timeout, DEFAULT_PACKER_TIMEOUT);
        assert!(!config.fail_fast);
        assert_eq!(config.densities.get("water"), Some(&1.0));
    }

    #[test]
    fn build_reports_missing_parameters() {
        let result = AssemblyConfigBuilder::new().tolerance(2.0).build();
        assert_eq!(result, Err(ConfigError::MissingParameter("out_dir")));

        let result = AssemblyConfigBuilder::new()
            .out_dir(PathBuf::from("out"))
            .tolerance(2.0)
            .population(1)
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("seed")));
    }

    #[test]
    fn build_rejects_non_positive_tolerances() {
        let result = minimal().tolerance(0.0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { parameter: "tolerance", .. })
        ));
        let result = minimal().solid_fluid_tolerance(f64::NAN).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { parameter: "solid_fluid_tolerance", .. })
        ));
    }

    #[test]
    fn build_rejects_negative_density_and_empty_population() {
        assert!(minimal().density("water", -0.1).build().is_err());
        assert!(minimal().population(0).build().is_err());
        assert!(minimal().density("water", 0.0).build().is_ok());
    }

    #[test]
    fn realization_seeds_are_consecutive_and_wrap() {
        let config = minimal().seed(u64::MAX).build().unwrap();
        assert_eq!(config.realization_seed(0), u64::MAX);
        assert_eq!(config.realization_seed(1), 0);
        let config = minimal().build().unwrap();
        assert_eq!(config.realization_seed(2), 9);
    }
}
