use pepflow::engine::config::{
    DEFAULT_CONTACT_CUTOFF, DEFAULT_MAX_DRIFT, DEFAULT_RELATIVE_ENERGY_THRESHOLD,
    DEFAULT_REPLICATES, DEFAULT_STABLE_STAGES, Environment, StageSpec,
};
use std::path::PathBuf;

pub struct DefaultsConfig {
    pub search_program: PathBuf,
    pub minimizer_program: PathBuf,
    pub protonator_program: PathBuf,
    pub replicates: usize,
    pub runs: usize,
    pub steps: u64,
    pub workers: usize,
    pub contact_cutoff: f64,
    pub strict_ties: bool,
    pub stages: Vec<StageSpec>,
    pub relative_energy_threshold: f64,
    pub max_drift: f64,
    pub stable_stages: usize,
    pub candidate_poses: usize,
    pub keep_parameters: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            search_program: PathBuf::from("adcp"),
            minimizer_program: PathBuf::from("omm_minimize"),
            protonator_program: PathBuf::from("reduce"),
            replicates: DEFAULT_REPLICATES,
            runs: 20,
            steps: 2_500_000,
            workers: 4,
            contact_cutoff: DEFAULT_CONTACT_CUTOFF,
            strict_ties: false,
            stages: vec![
                StageSpec::new(1000, Environment::Vacuum),
                StageSpec::new(5000, Environment::Vacuum),
                StageSpec::new(5000, Environment::Implicit),
                StageSpec::new(20000, Environment::Implicit),
            ],
            relative_energy_threshold: DEFAULT_RELATIVE_ENERGY_THRESHOLD,
            max_drift: DEFAULT_MAX_DRIFT,
            stable_stages: DEFAULT_STABLE_STAGES,
            candidate_poses: 1,
            keep_parameters: false,
        }
    }
}
