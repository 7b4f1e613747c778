use super::config::{ClusteringMode, StageSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use crate::core::io::summary::PoseSummary;
pub use crate::core::models::energy::EnergyVector;

/// Position of the replicate controller in its stage sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicateStage {
    Init,
    Refine { replicate: usize },
    SelectBest,
    ContactRefine,
    Selected,
}

impl fmt::Display for ReplicateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("replicate 1"),
            Self::Refine { replicate } => write!(f, "replicate {}", replicate),
            Self::SelectBest => f.write_str("best-replicate selection"),
            Self::ContactRefine => f.write_str("contact refinement"),
            Self::Selected => f.write_str("selected"),
        }
    }
}

/// Outcome of one completed search replicate. Paths point into its sealed directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReplicateResult {
    pub index: usize,
    pub label: String,
    pub clustering: ClusteringMode,
    pub reference: Option<PathBuf>,
    pub poses_path: PathBuf,
    pub top_pose_path: PathBuf,
    pub poses: Vec<PoseSummary>,
}

impl ReplicateResult {
    /// The top-ranked pose; the summary parser never yields an empty list.
    pub fn top(&self) -> Option<&PoseSummary> {
        self.poses.iter().min_by_key(|p| p.rank)
    }
}

/// The pose (and clustering mode) fed as reference into the next replicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReferenceSelection {
    pub replicate: usize,
    pub pose_path: PathBuf,
    pub clustering: ClusteringMode,
}

/// One sealed minimization stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MinimizationStage {
    pub label: String,
    pub spec: StageSpec,
    pub input: PathBuf,
    pub output: PathBuf,
    pub energies: EnergyVector,
    pub drift: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum NonConvergence {
    /// The coordinate drift limit was exceeded with no higher-fidelity stage left.
    ExcessiveDrift { stage: usize, drift: f64 },
    /// Every configured stage ran without the peptide energy settling.
    Exhausted { stages: usize },
}

impl fmt::Display for NonConvergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExcessiveDrift { stage, drift } => write!(
                f,
                "stage {} moved the pose by {:.2} Å with no higher-fidelity stage left",
                stage, drift
            ),
            Self::Exhausted { stages } => write!(
                f,
                "peptide energy still changing after all {} stages",
                stages
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "status")]
pub enum Convergence {
    /// `stage` is the 1-based index of the accepted stage.
    Converged { stage: usize },
    NonConvergent { reason: NonConvergence },
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// The staged refinement of one candidate pose.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizationOutcome {
    pub stages: Vec<MinimizationStage>,
    pub convergence: Convergence,
}

impl MinimizationOutcome {
    /// The accepted stage, or for a non-convergent run the last stage that ran.
    pub fn final_stage(&self) -> Option<&MinimizationStage> {
        match self.convergence {
            Convergence::Converged { stage } => self.stages.get(stage - 1),
            Convergence::NonConvergent { .. } => self.stages.last(),
        }
    }
}

/// The orchestrator's output: the top pose of the contact-refinement replicate.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPose {
    pub replicate: usize,
    pub pose: PoseSummary,
    pub pose_path: PathBuf,
    pub contact_fraction: f64,
}
