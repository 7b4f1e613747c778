use crate::core::io::assembly::assemble;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::{ConfigError, DockingConfig};
use crate::engine::context::TargetContext;
use crate::engine::error::EngineError;
use crate::engine::minimization::{self, CandidateOutcome};
use crate::engine::progress::ProgressReporter;
use crate::engine::replicate::{self, ReplicateOutcome};
use crate::engine::state::MinimizationOutcome;
use crate::engine::tools::{Minimizer, SearchTool};
use crate::engine::workspace::Workspace;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

pub const SELECTED_COMPLEX_FILE: &str = "selected_complex.pdb";

/// The external collaborators a docking run needs.
#[derive(Clone, Copy)]
pub struct DockingTools<'a> {
    pub search: &'a dyn SearchTool,
    pub minimizer: &'a dyn Minimizer,
}

#[derive(Debug, Clone)]
pub struct DockingResult {
    pub target: String,
    pub replicates: ReplicateOutcome,
    pub candidates: Vec<CandidateOutcome>,
    /// Receptor plus the final pose of the first candidate, when a receptor is configured.
    pub complex_path: Option<PathBuf>,
}

impl DockingResult {
    pub fn non_convergent(&self) -> impl Iterator<Item = &CandidateOutcome> {
        self.candidates
            .iter()
            .filter(|c| !c.outcome.convergence.is_converged())
    }
}

/// Replicate orchestration followed by staged minimization for one target.
#[instrument(skip_all, name = "docking_workflow", fields(target = %config.target.name))]
pub fn run(
    config: &DockingConfig,
    tools: &DockingTools,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<DockingResult, EngineError> {
    let mut workspace = Workspace::open(&config.target.working_directory, &config.target.name)?;
    let ctx = TargetContext::new(config, reporter, cancel);

    let replicates = replicate::run(&ctx, &mut workspace, tools.search)?;
    let candidates =
        minimization::run(&ctx, &mut workspace, tools.minimizer, &replicates.contact.poses_path)?;

    let complex_path = match (&config.target.receptor_path, candidates.first()) {
        (Some(receptor), Some(best)) => match best.outcome.final_stage() {
            Some(stage) => Some(write_complex(receptor, &stage.output, workspace.root())?),
            None => None,
        },
        _ => None,
    };

    let result = DockingResult {
        target: config.target.name.clone(),
        replicates,
        candidates,
        complex_path,
    };
    let flagged = result.non_convergent().count();
    if flagged > 0 {
        warn!(candidates = flagged, "Some candidate poses did not converge.");
    }
    info!(
        affinity = result.replicates.selected.pose.affinity,
        contact_fraction = result.replicates.selected.contact_fraction,
        "Docking finished."
    );
    Ok(result)
}

/// Runs only the staged minimization on a given pose of a configured target.
#[instrument(skip_all, name = "minimize_workflow", fields(target = %config.target.name))]
pub fn minimize(
    config: &DockingConfig,
    minimizer: &dyn Minimizer,
    pose: &Path,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<MinimizationOutcome, EngineError> {
    let mut workspace = Workspace::open(&config.target.working_directory, &config.target.name)?;
    let ctx = TargetContext::new(config, reporter, cancel);
    let stem = pose
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pose".to_string());
    let label = format!("{}/manual_{}", minimization::MINIMIZATION_DIR, stem);
    minimization::minimize_pose(&ctx, &mut workspace, minimizer, &label, pose)
}

/// Docks independent targets in parallel, one result per target in input order.
///
/// Targets must not share a working directory. Each target runs with a silent
/// progress reporter; the shared `cancel` token stops all of them.
pub fn run_batch(
    configs: &[DockingConfig],
    tools: &DockingTools,
    cancel: &CancellationToken,
) -> Result<Vec<(String, Result<DockingResult, EngineError>)>, EngineError> {
    let mut seen = HashSet::new();
    for config in configs {
        if !seen.insert(&config.target.working_directory) {
            return Err(ConfigError::InvalidParameter {
                parameter: "working_directory",
                reason: format!(
                    "'{}' is used by more than one target",
                    config.target.working_directory.display()
                ),
            }
            .into());
        }
    }

    info!(targets = configs.len(), "Starting batch docking.");
    Ok(configs
        .par_iter()
        .map(|config| {
            let reporter = ProgressReporter::new();
            let result = run(config, tools, &reporter, cancel);
            if let Err(e) = &result {
                error!(target = %config.target.name, error = %e, "Target failed.");
            }
            (config.target.name.clone(), result)
        })
        .collect())
}

fn write_complex(receptor: &Path, pose: &Path, root: &Path) -> Result<PathBuf, EngineError> {
    let complex = assemble(&fs::read_to_string(receptor)?, &fs::read_to_string(pose)?)?;
    let path = root.join(SELECTED_COMPLEX_FILE);
    fs::write(&path, complex.to_pdb_string())?;
    Ok(path)
}
