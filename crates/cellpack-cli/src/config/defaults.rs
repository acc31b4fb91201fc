use cellpack::engine::config as core_config;

pub struct DefaultsConfig {
    pub src_dir: &'static str,
    pub out_dir: &'static str,
    pub tolerance: f64,
    pub solid_fluid_tolerance: f64,
    pub seed: u64,
    pub population: usize,
    pub packer_timeout_secs: u64,
    pub fail_fast: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            src_dir: "src",
            out_dir: "out",
            tolerance: core_config::DEFAULT_TOLERANCE,
            solid_fluid_tolerance: core_config::DEFAULT_SOLID_FLUID_TOLERANCE,
            seed: core_config::DEFAULT_SEED,
            population: core_config::DEFAULT_POPULATION,
            packer_timeout_secs: core_config::DEFAULT_PACKER_TIMEOUT.as_secs(),
            fail_fast: false,
        }
    }
}
