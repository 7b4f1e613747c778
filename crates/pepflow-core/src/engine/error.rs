use super::config::ConfigError;
use crate::core::io::pdb::PdbError;
use crate::core::protonation::assigner::ProtonationError;
use std::path::PathBuf;
use thiserror::Error;

/// Why an external tool invocation was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    Launch(String),
    ExitStatus(Option<i32>),
    MissingArtifact(PathBuf),
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launch(reason) => write!(f, "could not be started ({})", reason),
            Self::ExitStatus(Some(code)) => write!(f, "exited with status {}", code),
            Self::ExitStatus(None) => write!(f, "was terminated by a signal"),
            Self::MissingArtifact(path) => {
                write!(f, "did not produce expected output {}", path.display())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Malformed coordinate data: {0}")]
    Structure(#[from] PdbError),

    #[error("Protonation assignment failed: {0}")]
    Protonation(#[from] ProtonationError),

    #[error("External tool '{tool}' {reason}{}", format_output(output))]
    ExternalTool {
        tool: String,
        reason: ToolFailure,
        output: String,
    },

    #[error(
        "Replicates {first} and {second} tie at affinity {affinity:.3} and strict tie-breaking is enabled"
    )]
    AmbiguousTie {
        first: usize,
        second: usize,
        affinity: f64,
    },

    #[error("Unreadable {what} '{path}': {reason}", path = path.display())]
    Report {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("Pose '{path}' has no atoms in common with its input pose", path = path.display())]
    PoseMismatch { path: PathBuf },

    #[error(
        "Target '{target}' is locked by another run (remove '{path}' if no run is active)",
        path = path.display()
    )]
    TargetLocked { target: String, path: PathBuf },

    #[error("Cancelled")]
    Cancelled,

    #[error("Run ledger error: {0}")]
    Ledger(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "Step '{step}' failed (last sealed artifact: {}): {source}",
        last_sealed.as_ref().map_or_else(|| "none".to_string(), |p| p.display().to_string())
    )]
    Step {
        step: String,
        last_sealed: Option<PathBuf>,
        #[source]
        source: Box<EngineError>,
    },
}

fn format_output(output: &str) -> String {
    if output.trim().is_empty() {
        String::new()
    } else {
        format!("\n--- captured output ---\n{}", output.trim_end())
    }
}

impl EngineError {
    /// Attaches the failing step and the last sealed artifact to an error.
    ///
    /// Errors that already carry step context are returned unchanged.
    pub fn in_step(self, step: impl Into<String>, last_sealed: Option<PathBuf>) -> Self {
        match self {
            Self::Step { .. } => self,
            other => Self::Step {
                step: step.into(),
                last_sealed,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with step context removed.
    pub fn root(&self) -> &EngineError {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}
