use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_CONTACT_CUTOFF: f64 = 0.8;
pub const DEFAULT_REPLICATES: usize = 2;
pub const DEFAULT_RELATIVE_ENERGY_THRESHOLD: f64 = 0.01;
pub const DEFAULT_MAX_DRIFT: f64 = 2.0;
pub const DEFAULT_STABLE_STAGES: usize = 2;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter,
        reason: reason.into(),
    }
}

/// Minimization environment, ordered from lowest to highest fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Environment {
    Vacuum,
    Implicit,
}

impl Environment {
    pub fn flag(self) -> &'static str {
        match self {
            Self::Vacuum => "vacuum",
            Self::Implicit => "implicit",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// How the search tool clusters and ranks the poses of a replicate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "mode")]
pub enum ClusteringMode {
    /// Score-based clustering with RMSD to the reference.
    Rmsd,
    /// Contact-fraction clustering with a fixed occupancy cutoff.
    Contact { cutoff: f64 },
}

impl fmt::Display for ClusteringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rmsd => f.write_str("rmsd"),
            Self::Contact { cutoff } => write!(f, "contact (cutoff {:.2})", cutoff),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub iterations: u32,
    pub environment: Environment,
}

impl StageSpec {
    pub fn new(iterations: u32, environment: Environment) -> Self {
        Self {
            iterations,
            environment,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetConfig {
    pub name: String,
    pub preparation_file: PathBuf,
    pub sequence: String,
    pub working_directory: PathBuf,
    /// Protonated receptor used to write the selected pose as a full complex.
    pub receptor_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Replicates run with score-based clustering before the contact run.
    pub replicates: usize,
    pub runs: usize,
    pub steps: u64,
    pub workers: usize,
    pub seed_structure: Option<PathBuf>,
    pub contact_cutoff: f64,
    pub strict_ties: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizationConfig {
    pub stages: Vec<StageSpec>,
    pub relative_energy_threshold: f64,
    pub max_drift: f64,
    /// Consecutive stable stage-to-stage comparisons required to stop.
    pub stable_stages: usize,
    pub candidate_poses: usize,
    pub keep_parameters: bool,
}

impl MinimizationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(invalid("stages", "at least one stage is required"));
        }
        if let Some(i) = self.stages.iter().position(|s| s.iterations == 0) {
            return Err(invalid("stages", format!("stage {} has zero iterations", i + 1)));
        }
        if self
            .stages
            .windows(2)
            .any(|w| w[1].environment < w[0].environment)
        {
            return Err(invalid(
                "stages",
                "environments must not decrease in fidelity (vacuum before implicit)",
            ));
        }
        if !(self.relative_energy_threshold > 0.0) {
            return Err(invalid("relative_energy_threshold", "must be positive"));
        }
        if !(self.max_drift > 0.0) {
            return Err(invalid("max_drift", "must be positive"));
        }
        if self.stable_stages == 0 {
            return Err(invalid("stable_stages", "must be at least 1"));
        }
        if self.candidate_poses == 0 {
            return Err(invalid("candidate_poses", "must be at least 1"));
        }
        Ok(())
    }

    pub fn total_iterations(&self) -> u64 {
        self.stages.iter().map(|s| s.iterations as u64).sum()
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replicates < 2 {
            return Err(invalid(
                "replicates",
                "at least two replicates are needed to select a reference",
            ));
        }
        if self.runs == 0 {
            return Err(invalid("runs", "must be at least 1"));
        }
        if self.steps == 0 {
            return Err(invalid("steps", "must be at least 1"));
        }
        if self.workers == 0 {
            return Err(invalid("workers", "must be at least 1"));
        }
        if !(self.contact_cutoff > 0.0 && self.contact_cutoff <= 1.0) {
            return Err(invalid("contact_cutoff", "must lie in (0, 1]"));
        }
        Ok(())
    }

    pub fn contact_mode(&self) -> ClusteringMode {
        ClusteringMode::Contact {
            cutoff: self.contact_cutoff,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockingConfig {
    pub target: TargetConfig,
    pub search: SearchConfig,
    pub minimization: MinimizationConfig,
}

#[derive(Default)]
pub struct MinimizationConfigBuilder {
    stages: Option<Vec<StageSpec>>,
    relative_energy_threshold: Option<f64>,
    max_drift: Option<f64>,
    stable_stages: Option<usize>,
    candidate_poses: Option<usize>,
    keep_parameters: bool,
}

impl MinimizationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(mut self, stages: Vec<StageSpec>) -> Self {
        self.stages = Some(stages);
        self
    }
    pub fn relative_energy_threshold(mut self, threshold: f64) -> Self {
        self.relative_energy_threshold = Some(threshold);
        self
    }
    pub fn max_drift(mut self, angstroms: f64) -> Self {
        self.max_drift = Some(angstroms);
        self
    }
    pub fn stable_stages(mut self, n: usize) -> Self {
        self.stable_stages = Some(n);
        self
    }
    pub fn candidate_poses(mut self, n: usize) -> Self {
        self.candidate_poses = Some(n);
        self
    }
    pub fn keep_parameters(mut self, keep: bool) -> Self {
        self.keep_parameters = keep;
        self
    }

    pub fn build(self) -> Result<MinimizationConfig, ConfigError> {
        let config = MinimizationConfig {
            stages: self.stages.ok_or(ConfigError::MissingParameter("stages"))?,
            relative_energy_threshold: self
                .relative_energy_threshold
                .unwrap_or(DEFAULT_RELATIVE_ENERGY_THRESHOLD),
            max_drift: self.max_drift.unwrap_or(DEFAULT_MAX_DRIFT),
            stable_stages: self.stable_stages.unwrap_or(DEFAULT_STABLE_STAGES),
            candidate_poses: self.candidate_poses.unwrap_or(1),
            keep_parameters: self.keep_parameters,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Default)]
pub struct DockingConfigBuilder {
    name: Option<String>,
    preparation_file: Option<PathBuf>,
    sequence: Option<String>,
    working_directory: Option<PathBuf>,
    receptor_path: Option<PathBuf>,
    replicates: Option<usize>,
    runs: Option<usize>,
    steps: Option<u64>,
    workers: Option<usize>,
    seed_structure: Option<PathBuf>,
    contact_cutoff: Option<f64>,
    strict_ties: bool,
    minimization: Option<MinimizationConfig>,
}

impl DockingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    pub fn preparation_file(mut self, path: PathBuf) -> Self {
        self.preparation_file = Some(path);
        self
    }
    pub fn sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }
    pub fn working_directory(mut self, path: PathBuf) -> Self {
        self.working_directory = Some(path);
        self
    }
    pub fn receptor_path(mut self, path: Option<PathBuf>) -> Self {
        self.receptor_path = path;
        self
    }
    pub fn replicates(mut self, n: usize) -> Self {
        self.replicates = Some(n);
        self
    }
    pub fn runs(mut self, n: usize) -> Self {
        self.runs = Some(n);
        self
    }
    pub fn steps(mut self, n: u64) -> Self {
        self.steps = Some(n);
        self
    }
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = Some(n);
        self
    }
    pub fn seed_structure(mut self, path: Option<PathBuf>) -> Self {
        self.seed_structure = path;
        self
    }
    pub fn contact_cutoff(mut self, cutoff: f64) -> Self {
        self.contact_cutoff = Some(cutoff);
        self
    }
    pub fn strict_ties(mut self, strict: bool) -> Self {
        self.strict_ties = strict;
        self
    }
    pub fn minimization(mut self, config: MinimizationConfig) -> Self {
        self.minimization = Some(config);
        self
    }

    pub fn build(self) -> Result<DockingConfig, ConfigError> {
        let sequence = self.sequence.ok_or(ConfigError::MissingParameter("sequence"))?;
        if sequence.trim().is_empty() {
            return Err(invalid("sequence", "must not be empty"));
        }
        let name = self.name.ok_or(ConfigError::MissingParameter("name"))?;
        if name.trim().is_empty() {
            return Err(invalid("name", "must not be empty"));
        }

        let target = TargetConfig {
            name,
            preparation_file: self
                .preparation_file
                .ok_or(ConfigError::MissingParameter("preparation_file"))?,
            sequence,
            working_directory: self
                .working_directory
                .ok_or(ConfigError::MissingParameter("working_directory"))?,
            receptor_path: self.receptor_path,
        };
        let search = SearchConfig {
            replicates: self.replicates.unwrap_or(DEFAULT_REPLICATES),
            runs: self.runs.ok_or(ConfigError::MissingParameter("runs"))?,
            steps: self.steps.ok_or(ConfigError::MissingParameter("steps"))?,
            workers: self.workers.ok_or(ConfigError::MissingParameter("workers"))?,
            seed_structure: self.seed_structure,
            contact_cutoff: self.contact_cutoff.unwrap_or(DEFAULT_CONTACT_CUTOFF),
            strict_ties: self.strict_ties,
        };
        search.validate()?;

        let minimization = self
            .minimization
            .ok_or(ConfigError::MissingParameter("minimization"))?;
        minimization.validate()?;

        Ok(DockingConfig {
            target,
            search,
            minimization,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn minimization_config(stages: Vec<StageSpec>) -> MinimizationConfig {
        MinimizationConfigBuilder::new().stages(stages).build().unwrap()
    }

    pub(crate) fn docking_config(
        working_directory: &std::path::Path,
        stages: Vec<StageSpec>,
    ) -> DockingConfig {
        DockingConfigBuilder::new()
            .name("target")
            .preparation_file(PathBuf::from("target.trg"))
            .sequence("ACDEFGHIK")
            .working_directory(working_directory.to_path_buf())
            .runs(4)
            .steps(1000)
            .workers(2)
            .minimization(minimization_config(stages))
            .build()
            .unwrap()
    }

    fn complete_builder() -> DockingConfigBuilder {
        DockingConfigBuilder::new()
            .name("1abc")
            .preparation_file(PathBuf::from("1abc.trg"))
            .sequence("SSWWAHVEMGPPDPILGVTEAYKRDTNSKK")
            .working_directory(PathBuf::from("runs/1abc"))
            .runs(20)
            .steps(1_000_000)
            .workers(4)
            .minimization(minimization_config(vec![StageSpec::new(500, Environment::Vacuum)]))
    }

    #[test]
    fn build_applies_defaults() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.search.replicates, DEFAULT_REPLICATES);
        assert_eq!(config.search.contact_cutoff, DEFAULT_CONTACT_CUTOFF);
        assert!(!config.search.strict_ties);
        assert_eq!(config.minimization.stable_stages, DEFAULT_STABLE_STAGES);
        assert_eq!(config.minimization.candidate_poses, 1);
        assert_eq!(
            config.search.contact_mode(),
            ClusteringMode::Contact { cutoff: 0.8 }
        );
    }

    #[test]
    fn build_reports_missing_parameters() {
        let err = DockingConfigBuilder::new()
            .name("x")
            .sequence("AAA")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("preparation_file"));

        let err = DockingConfigBuilder::new().name("x").build().unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("sequence"));
    }

    #[test]
    fn build_rejects_single_replicate() {
        let err = complete_builder().replicates(1).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                parameter: "replicates",
                ..
            }
        ));
    }

    #[test]
    fn build_rejects_out_of_range_cutoff() {
        for cutoff in [0.0, 1.5, f64::NAN] {
            let err = complete_builder().contact_cutoff(cutoff).build().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidParameter {
                    parameter: "contact_cutoff",
                    ..
                }
            ));
        }
    }

    #[test]
    fn minimization_rejects_decreasing_fidelity() {
        let err = MinimizationConfigBuilder::new()
            .stages(vec![
                StageSpec::new(500, Environment::Implicit),
                StageSpec::new(500, Environment::Vacuum),
            ])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { parameter: "stages", .. }));
    }

    #[test]
    fn minimization_rejects_empty_and_zero_stages() {
        assert!(MinimizationConfigBuilder::new().stages(vec![]).build().is_err());
        assert!(
            MinimizationConfigBuilder::new()
                .stages(vec![StageSpec::new(0, Environment::Vacuum)])
                .build()
                .is_err()
        );
        assert_eq!(
            MinimizationConfigBuilder::new().build().unwrap_err(),
            ConfigError::MissingParameter("stages")
        );
    }

    #[test]
    fn total_iterations_sums_stage_budgets() {
        let config = minimization_config(vec![
            StageSpec::new(100, Environment::Vacuum),
            StageSpec::new(2500, Environment::Implicit),
        ]);
        assert_eq!(config.total_iterations(), 2600);
    }

    #[test]
    fn environments_are_ordered_by_fidelity() {
        assert!(Environment::Vacuum < Environment::Implicit);
        assert_eq!(Environment::Implicit.to_string(), "implicit");
    }
}
