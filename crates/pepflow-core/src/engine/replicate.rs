use super::config::ClusteringMode;
use super::context::TargetContext;
use super::error::EngineError;
use super::state::{ReferenceSelection, ReplicateResult, ReplicateStage, SelectedPose};
use super::tools::{SearchRequest, SearchTool};
use super::workspace::{StepDir, Workspace};
use crate::core::io::models::top_pose;
use crate::core::io::summary::parse_summary;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const SUMMARY_FILE: &str = "summary.txt";
pub const TOP_POSE_FILE: &str = "top_pose.pdb";
pub const CONTACT_REFINE_LABEL: &str = "contact_refine";

pub fn replicate_label(index: usize) -> String {
    format!("replicate_{:02}", index)
}

/// Everything the controller produced for one target.
#[derive(Debug, Clone)]
pub struct ReplicateOutcome {
    /// Replicates run with score-based clustering, in order.
    pub replicates: Vec<ReplicateResult>,
    /// 1-based index of the replicate chosen by [`select_best`].
    pub best: usize,
    pub contact: ReplicateResult,
    pub selected: SelectedPose,
}

/// Picks the replicate whose top pose has the lowest affinity.
///
/// Only a strictly lower affinity displaces the current best, so an exact tie
/// goes to the earlier replicate. With `strict_ties` a tie with the winning
/// affinity is an [`EngineError::AmbiguousTie`] instead.
pub fn select_best(
    results: &[ReplicateResult],
    strict_ties: bool,
) -> Result<&ReplicateResult, EngineError> {
    let mut scored = results
        .iter()
        .filter_map(|r| r.top().map(|top| (r, top.affinity)));
    let (mut best, mut best_affinity) = scored
        .next()
        .ok_or_else(|| EngineError::Ledger("no completed replicate to select from".into()))?;
    let mut tied_with: Option<usize> = None;

    for (candidate, affinity) in scored {
        if affinity < best_affinity {
            best = candidate;
            best_affinity = affinity;
            tied_with = None;
        } else if affinity == best_affinity && tied_with.is_none() {
            tied_with = Some(candidate.index);
        }
    }

    if let Some(second) = tied_with {
        if strict_ties {
            return Err(EngineError::AmbiguousTie {
                first: best.index,
                second,
                affinity: best_affinity,
            });
        }
        info!(
            chosen = best.index,
            tied = second,
            affinity = best_affinity,
            "Affinity tie resolved in favour of the earlier replicate."
        );
    }
    Ok(best)
}

/// Runs the score-clustered replicates, selects the best one and finishes with
/// a contact-clustered replicate referenced on the winner.
///
/// Sealed replicates recorded in the workspace ledger are reused when their
/// reference and clustering mode match what this run would use.
#[instrument(skip_all, name = "replicate_controller", fields(target = %ctx.config.target.name))]
pub fn run(
    ctx: &TargetContext,
    workspace: &mut Workspace,
    search: &dyn SearchTool,
) -> Result<ReplicateOutcome, EngineError> {
    let config = &ctx.config.search;
    let mut results: Vec<ReplicateResult> = Vec::with_capacity(config.replicates);
    let mut reference = config.seed_structure.clone();

    for index in 1..=config.replicates {
        let stage = if index == 1 {
            ReplicateStage::Init
        } else {
            ReplicateStage::Refine { replicate: index }
        };
        let result = run_replicate(
            ctx,
            workspace,
            search,
            stage,
            index,
            &replicate_label(index),
            reference.as_deref(),
            ClusteringMode::Rmsd,
        )?;

        workspace.set_reference(ReferenceSelection {
            replicate: index,
            pose_path: result.top_pose_path.clone(),
            clustering: ClusteringMode::Rmsd,
        })?;
        reference = Some(result.top_pose_path.clone());
        results.push(result);
    }

    let best = select_best(&results, config.strict_ties)
        .map_err(|e| e.in_step(ReplicateStage::SelectBest.to_string(), workspace.last_sealed()))?
        .clone();
    let contact_mode = config.contact_mode();
    info!(
        replicate = best.index,
        affinity = best.top().map(|p| p.affinity),
        "Selected reference for contact refinement."
    );
    workspace.set_reference(ReferenceSelection {
        replicate: best.index,
        pose_path: best.top_pose_path.clone(),
        clustering: contact_mode,
    })?;

    let contact = run_replicate(
        ctx,
        workspace,
        search,
        ReplicateStage::ContactRefine,
        config.replicates + 1,
        CONTACT_REFINE_LABEL,
        Some(&best.top_pose_path),
        contact_mode,
    )?;

    let selected = selected_pose(&contact)
        .map_err(|e| e.in_step(ReplicateStage::Selected.to_string(), workspace.last_sealed()))?;
    info!(
        affinity = selected.pose.affinity,
        contact_fraction = selected.contact_fraction,
        pose = %selected.pose_path.display(),
        "Replicate orchestration finished."
    );

    Ok(ReplicateOutcome {
        replicates: results,
        best: best.index,
        contact,
        selected,
    })
}

fn selected_pose(contact: &ReplicateResult) -> Result<SelectedPose, EngineError> {
    let summary_path = contact
        .top_pose_path
        .parent()
        .map(|dir| dir.join(SUMMARY_FILE))
        .unwrap_or_else(|| PathBuf::from(SUMMARY_FILE));
    let report_error = |reason: &str| EngineError::Report {
        what: "ranked-pose summary",
        path: summary_path.clone(),
        reason: reason.to_string(),
    };
    let top = contact.top().ok_or_else(|| report_error("no poses listed"))?;
    let contact_fraction = top
        .contact_fraction
        .ok_or_else(|| report_error("top pose has no contact fraction"))?;
    Ok(SelectedPose {
        replicate: contact.index,
        pose: top.clone(),
        pose_path: contact.top_pose_path.clone(),
        contact_fraction,
    })
}

#[allow(clippy::too_many_arguments)]
fn run_replicate(
    ctx: &TargetContext,
    workspace: &mut Workspace,
    search: &dyn SearchTool,
    stage: ReplicateStage,
    index: usize,
    label: &str,
    reference: Option<&Path>,
    clustering: ClusteringMode,
) -> Result<ReplicateResult, EngineError> {
    if let Some(done) = workspace.replicate(index) {
        if done.clustering == clustering && done.reference.as_deref() == reference {
            info!(replicate = index, step = label, "Reusing sealed replicate.");
            ctx.reporter
                .message(format!("{}: reusing sealed results", label));
            return Ok(done.clone());
        }
        warn!(
            replicate = index,
            "Sealed replicate used a different reference or clustering; running it again."
        );
    }

    let last_sealed = workspace.last_sealed();
    ctx.check_cancelled()
        .map_err(|e| e.in_step(label, last_sealed.clone()))?;
    ctx.reporter.phase(format!("{} ({})", stage, clustering));
    info!(
        replicate = index,
        step = label,
        clustering = %clustering,
        reference = ?reference,
        "Starting search replicate."
    );

    let step = workspace
        .begin(label)
        .map_err(|e| e.in_step(label, last_sealed.clone()))?;
    let result = match execute_replicate(ctx, search, &step, index, reference, clustering) {
        Ok(result) => result,
        Err(e) => {
            if e.is_cancelled() {
                workspace.discard(step);
            } else {
                warn!(step = label, path = %step.path().display(), "Keeping failed replicate directory for inspection.");
            }
            return Err(e.in_step(label, last_sealed));
        }
    };

    workspace
        .seal(step)
        .and_then(|_| workspace.record_replicate(result.clone()))
        .map_err(|e| e.in_step(label, last_sealed))?;
    ctx.reporter.report(super::progress::Progress::PhaseFinish);

    if let Some(top) = result.top() {
        info!(
            replicate = index,
            affinity = top.affinity,
            reference_rmsd = top.reference_rmsd,
            contact_fraction = top.contact_fraction,
            "Replicate sealed."
        );
    }
    Ok(result)
}

fn execute_replicate(
    ctx: &TargetContext,
    search: &dyn SearchTool,
    step: &StepDir,
    index: usize,
    reference: Option<&Path>,
    clustering: ClusteringMode,
) -> Result<ReplicateResult, EngineError> {
    let config = ctx.config;
    let request = SearchRequest {
        preparation_file: &config.target.preparation_file,
        sequence: &config.target.sequence,
        runs: config.search.runs,
        steps: config.search.steps,
        workers: config.search.workers,
        reference,
        clustering,
        job_name: step.label(),
        directory: step.path(),
    };
    let output = search.search(&request, ctx.cancel)?;

    let summary_path = step.path().join(SUMMARY_FILE);
    fs::write(&summary_path, &output.summary)?;
    let poses = parse_summary(&output.summary).map_err(|e| EngineError::Report {
        what: "ranked-pose summary",
        path: summary_path,
        reason: e.to_string(),
    })?;

    let poses_text = fs::read_to_string(&output.poses_path)?;
    let top = top_pose(&poses_text).ok_or_else(|| EngineError::Report {
        what: "pose file",
        path: output.poses_path.clone(),
        reason: "contains no coordinate records".to_string(),
    })?;
    fs::write(step.path().join(TOP_POSE_FILE), top)?;

    let poses_file = output
        .poses_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}_out.pdb", step.label())));

    Ok(ReplicateResult {
        index,
        label: step.label().to_string(),
        clustering,
        reference: reference.map(Path::to_path_buf),
        poses_path: step.sealed_path(poses_file),
        top_pose_path: step.sealed_path(TOP_POSE_FILE),
        poses,
    })
}
