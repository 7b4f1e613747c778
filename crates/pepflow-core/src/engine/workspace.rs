use super::error::EngineError;
use super::state::{MinimizationStage, ReferenceSelection, ReplicateResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const LEDGER_FILE: &str = "ledger.toml";
pub const LOCK_FILE: &str = ".lock";
const PARTIAL_EXTENSION: &str = "partial";

/// A sealed step directory recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedArtifact {
    pub label: String,
    pub path: PathBuf,
}

/// Persisted orchestration state of one target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Ledger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceSelection>,
    #[serde(default)]
    pub artifacts: Vec<SealedArtifact>,
    #[serde(default)]
    pub replicates: Vec<ReplicateResult>,
    #[serde(default)]
    pub stages: Vec<MinimizationStage>,
}

/// An unsealed step directory. Dropped steps are not removed automatically;
/// call [`Workspace::discard`] or let the next run clean them up.
#[derive(Debug)]
pub struct StepDir {
    label: String,
    partial: PathBuf,
    sealed: PathBuf,
}

impl StepDir {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Directory the step writes into while running.
    pub fn path(&self) -> &Path {
        &self.partial
    }

    /// Where `file_name` will live once the step is sealed.
    pub fn sealed_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.sealed.join(file_name)
    }
}

#[derive(Debug)]
struct TargetLock {
    path: PathBuf,
}

impl TargetLock {
    fn acquire(root: &Path, target: &str) -> Result<Self, EngineError> {
        let path = root.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                Ok(Self { path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(EngineError::TargetLocked {
                target: target.to_string(),
                path,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for TargetLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release target lock.");
        }
    }
}

/// Exclusively owned working directory of one target.
///
/// Steps run in `<label>.partial/` and become visible as `<label>/` only when
/// sealed. The ledger is rewritten after every change so that a later run in
/// the same directory can reuse everything sealed so far.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    target: String,
    ledger: Ledger,
    _lock: TargetLock,
}

impl Workspace {
    pub fn open(root: &Path, target: &str) -> Result<Self, EngineError> {
        fs::create_dir_all(root)?;
        let lock = TargetLock::acquire(root, target)?;

        let ledger_path = root.join(LEDGER_FILE);
        let mut ledger = if ledger_path.exists() {
            let text = fs::read_to_string(&ledger_path)?;
            toml::from_str::<Ledger>(&text).map_err(|e| {
                EngineError::Ledger(format!("'{}': {}", ledger_path.display(), e))
            })?
        } else {
            Ledger::default()
        };

        // Drop entries whose directories were removed by hand.
        ledger.artifacts.retain(|a| a.path.is_dir());
        let sealed = |path: &Path| ledger.artifacts.iter().any(|a| path.starts_with(&a.path));
        let replicates = ledger
            .replicates
            .iter()
            .filter(|r| sealed(&r.poses_path))
            .cloned()
            .collect();
        let stages = ledger
            .stages
            .iter()
            .filter(|s| sealed(&s.output))
            .cloned()
            .collect();
        ledger.replicates = replicates;
        ledger.stages = stages;

        let workspace = Self {
            root: root.to_path_buf(),
            target: target.to_string(),
            ledger,
            _lock: lock,
        };
        workspace.remove_partials(&workspace.root)?;
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Starts a fresh step, replacing any leftover partial directory.
    pub fn begin(&self, label: &str) -> Result<StepDir, EngineError> {
        let sealed = self.root.join(label);
        let partial = sealed.with_extension(PARTIAL_EXTENSION);
        if partial.exists() {
            fs::remove_dir_all(&partial)?;
        }
        fs::create_dir_all(&partial)?;
        debug!(step = label, path = %partial.display(), "Started step directory.");
        Ok(StepDir {
            label: label.to_string(),
            partial,
            sealed,
        })
    }

    /// Promotes a finished step to its final directory and records it.
    pub fn seal(&mut self, step: StepDir) -> Result<PathBuf, EngineError> {
        if step.sealed.exists() {
            fs::remove_dir_all(&step.sealed)?;
        }
        fs::rename(&step.partial, &step.sealed)?;
        self.ledger.artifacts.retain(|a| a.label != step.label);
        self.ledger.artifacts.push(SealedArtifact {
            label: step.label.clone(),
            path: step.sealed.clone(),
        });
        self.save()?;
        debug!(step = %step.label, path = %step.sealed.display(), "Sealed step.");
        Ok(step.sealed)
    }

    /// Deletes the partial directory of an abandoned step.
    pub fn discard(&self, step: StepDir) {
        if let Err(e) = fs::remove_dir_all(&step.partial) {
            warn!(step = %step.label, error = %e, "Failed to remove partial step directory.");
        }
    }

    pub fn is_sealed(&self, label: &str) -> bool {
        self.ledger.artifacts.iter().any(|a| a.label == label)
    }

    pub fn last_sealed(&self) -> Option<PathBuf> {
        self.ledger.artifacts.last().map(|a| a.path.clone())
    }

    pub fn replicate(&self, index: usize) -> Option<&ReplicateResult> {
        self.ledger
            .replicates
            .iter()
            .find(|r| r.index == index && self.is_sealed(&r.label))
    }

    pub fn record_replicate(&mut self, result: ReplicateResult) -> Result<(), EngineError> {
        self.ledger.replicates.retain(|r| r.index != result.index);
        self.ledger.replicates.push(result);
        self.save()
    }

    pub fn reference(&self) -> Option<&ReferenceSelection> {
        self.ledger.reference.as_ref()
    }

    pub fn set_reference(&mut self, reference: ReferenceSelection) -> Result<(), EngineError> {
        self.ledger.reference = Some(reference);
        self.save()
    }

    pub fn stage(&self, label: &str) -> Option<&MinimizationStage> {
        self.ledger
            .stages
            .iter()
            .find(|s| s.label == label && self.is_sealed(label))
    }

    pub fn record_stage(&mut self, stage: MinimizationStage) -> Result<(), EngineError> {
        self.ledger.stages.retain(|s| s.label != stage.label);
        self.ledger.stages.push(stage);
        self.save()
    }

    /// Forgets every sealed step whose label starts with `prefix` and deletes
    /// its directory, so that dependent work runs again.
    pub fn invalidate(&mut self, prefix: &str) -> Result<usize, EngineError> {
        let (stale, kept): (Vec<_>, Vec<_>) = self
            .ledger
            .artifacts
            .drain(..)
            .partition(|a| a.label.starts_with(prefix));
        self.ledger.artifacts = kept;
        self.ledger.stages.retain(|s| !s.label.starts_with(prefix));
        self.ledger.replicates.retain(|r| !r.label.starts_with(prefix));
        self.save()?;

        for artifact in &stale {
            if artifact.path.exists() {
                fs::remove_dir_all(&artifact.path)?;
            }
            debug!(step = %artifact.label, "Invalidated sealed step.");
        }
        Ok(stale.len())
    }

    fn save(&self) -> Result<(), EngineError> {
        let text = toml::to_string(&self.ledger)
            .map_err(|e| EngineError::Ledger(format!("cannot serialize ledger: {}", e)))?;
        let tmp = self.root.join(format!("{}.tmp", LEDGER_FILE));
        fs::write(&tmp, text)?;
        fs::rename(&tmp, self.root.join(LEDGER_FILE))?;
        Ok(())
    }

    fn remove_partials(&self, dir: &Path) -> Result<(), EngineError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            if path.extension().is_some_and(|ext| ext == PARTIAL_EXTENSION) {
                warn!(path = %path.display(), "Discarding unsealed step from a previous run.");
                fs::remove_dir_all(&path)?;
            } else {
                self.remove_partials(&path)?;
            }
        }
        Ok(())
    }
}
