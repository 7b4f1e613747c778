//! Adapters for the external programs the pipeline drives.
//!
//! Each collaborator is a trait so that the replicate controller and the
//! minimization driver can be run against scripted implementations. The
//! command-line implementations share one cancellable subprocess runner
//! ([`command::ToolCommand`]).

pub mod command;
pub mod minimizer;
pub mod protonator;
pub mod search;

use super::cancel::CancellationToken;
use super::config::{ClusteringMode, Environment};
use super::error::EngineError;
use std::path::{Path, PathBuf};

pub use minimizer::CommandMinimizer;
pub use protonator::CommandProtonator;
pub use search::CommandSearchTool;

/// File name of the minimized pose inside a stage directory.
pub const MINIMIZED_POSE_FILE: &str = "minimized.pdb";

#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub preparation_file: &'a Path,
    pub sequence: &'a str,
    pub runs: usize,
    pub steps: u64,
    pub workers: usize,
    pub reference: Option<&'a Path>,
    pub clustering: ClusteringMode,
    pub job_name: &'a str,
    pub directory: &'a Path,
}

impl SearchRequest<'_> {
    pub fn poses_path(&self) -> PathBuf {
        self.directory.join(format!("{}_out.pdb", self.job_name))
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutput {
    /// The ranked-pose summary table printed by the tool.
    pub summary: String,
    pub poses_path: PathBuf,
}

pub trait SearchTool: Send + Sync {
    fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchOutput, EngineError>;
}

#[derive(Debug, Clone)]
pub struct MinimizeRequest<'a> {
    pub preparation_file: &'a Path,
    pub input: &'a Path,
    pub iterations: u32,
    pub environment: Environment,
    pub directory: &'a Path,
    pub keep_parameters: bool,
}

impl MinimizeRequest<'_> {
    pub fn output_path(&self) -> PathBuf {
        self.directory.join(MINIMIZED_POSE_FILE)
    }
}

#[derive(Debug, Clone)]
pub struct MinimizeOutput {
    /// The energy report printed by the tool.
    pub report: String,
    pub pose_path: PathBuf,
}

pub trait Minimizer: Send + Sync {
    fn minimize(
        &self,
        request: &MinimizeRequest,
        cancel: &CancellationToken,
    ) -> Result<MinimizeOutput, EngineError>;
}

#[derive(Debug, Clone)]
pub struct ProtonateRequest<'a> {
    pub input: &'a Path,
    /// `Some(true)` allows side-chain flips, `Some(false)` forbids them.
    pub flip: Option<bool>,
    pub directory: &'a Path,
}

pub trait Protonator: Send + Sync {
    /// Returns the protonated coordinate text.
    fn protonate(
        &self,
        request: &ProtonateRequest,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError>;
}
