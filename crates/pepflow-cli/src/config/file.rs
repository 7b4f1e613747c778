use crate::error::{CliError, Result};
use pepflow::engine::config::{Environment, StageSpec};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Paths of the external programs. Bare names are looked up on `PATH`.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileToolsConfig {
    pub search: Option<PathBuf>,
    pub minimizer: Option<PathBuf>,
    pub protonator: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSearchConfig {
    pub replicates: Option<usize>,
    pub runs: Option<usize>,
    pub steps: Option<u64>,
    pub workers: Option<usize>,
    pub contact_cutoff: Option<f64>,
    pub strict_ties: Option<bool>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct FileStageSpec {
    pub iterations: u32,
    pub environment: Environment,
}

impl From<FileStageSpec> for StageSpec {
    fn from(p: FileStageSpec) -> Self {
        StageSpec::new(p.iterations, p.environment)
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileMinimizationConfig {
    pub stages: Option<Vec<FileStageSpec>>,
    pub relative_energy_threshold: Option<f64>,
    pub max_drift: Option<f64>,
    pub stable_stages: Option<usize>,
    pub candidate_poses: Option<usize>,
    pub keep_parameters: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileTargetConfig {
    pub name: String,
    pub preparation_file: PathBuf,
    pub sequence: String,
    pub working_directory: PathBuf,
    /// Protonated receptor used to build the final complex.
    pub receptor: Option<PathBuf>,
    /// Reference for the first replicate.
    pub seed_structure: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub tools: Option<FileToolsConfig>,
    pub search: Option<FileSearchConfig>,
    pub minimization: Option<FileMinimizationConfig>,
    #[serde(default)]
    pub targets: Vec<FileTargetConfig>,
}

impl FileConfig {
    /// Reads a TOML configuration file.
    ///
    /// Relative paths inside the file are resolved against the file's own
    /// directory, so a configuration can be used from any working directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        if let Some(tools) = &mut self.tools {
            for program in [&mut tools.search, &mut tools.minimizer, &mut tools.protonator]
                .into_iter()
                .flatten()
            {
                // Bare program names stay as they are for a PATH lookup.
                if program.components().count() > 1 {
                    rebase_always(base, program);
                }
            }
        }
        for target in &mut self.targets {
            rebase_always(base, &mut target.preparation_file);
            rebase_always(base, &mut target.working_directory);
            if let Some(p) = &mut target.receptor {
                rebase_always(base, p);
            }
            if let Some(p) = &mut target.seed_structure {
                rebase_always(base, p);
            }
        }
    }

    pub fn target(&self, name: &str) -> Option<&FileTargetConfig> {
        self.targets.iter().find(|t| t.name == name)
    }
}

fn rebase_always(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}
