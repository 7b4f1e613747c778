use super::config::{Environment, MinimizationConfig, StageSpec};
use super::context::TargetContext;
use super::error::EngineError;
use super::progress::Progress;
use super::state::{Convergence, EnergyVector, MinimizationOutcome, MinimizationStage, NonConvergence};
use super::tools::{MINIMIZED_POSE_FILE, MinimizeRequest, Minimizer};
use super::workspace::{StepDir, Workspace};
use crate::core::io::energy::parse_energy_report;
use crate::core::io::models::extract_poses;
use crate::core::io::pdb;
use crate::core::models::atom::AtomRecord;
use crate::core::utils::geometry::coordinate_drift;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const MINIMIZATION_DIR: &str = "minimization";
pub const CANDIDATES_LABEL: &str = "minimization/candidates";
pub const ENERGIES_FILE: &str = "energies.csv";
pub const ENERGY_REPORT_FILE: &str = "energy_report.txt";

pub fn pose_label(rank: usize) -> String {
    format!("{}/pose_{:02}", MINIMIZATION_DIR, rank)
}

pub fn stage_label(pose_label: &str, stage: usize, environment: Environment) -> String {
    format!("{}/stage_{:02}_{}", pose_label, stage, environment)
}

/// Staged refinement of one candidate pose taken from the contact replicate.
#[derive(Debug, Clone)]
pub struct CandidateOutcome {
    pub rank: usize,
    pub input: PathBuf,
    pub outcome: MinimizationOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Decision {
    /// Run the stage at this position of the configured list next.
    Next(usize),
    Accept,
    Drifted(f64),
    Exhausted,
}

/// Tracks consecutive stage results against the stopping heuristic.
struct StageMonitor<'a> {
    config: &'a MinimizationConfig,
    previous: Option<EnergyVector>,
    stable: usize,
}

impl<'a> StageMonitor<'a> {
    fn new(config: &'a MinimizationConfig) -> Self {
        Self {
            config,
            previous: None,
            stable: 0,
        }
    }

    fn next_higher_fidelity(&self, position: usize) -> Option<usize> {
        let current = self.config.stages[position].environment;
        self.config
            .stages
            .iter()
            .enumerate()
            .skip(position + 1)
            .find(|(_, s)| s.environment > current)
            .map(|(i, _)| i)
    }

    fn following(&self, position: usize) -> Decision {
        if position + 1 < self.config.stages.len() {
            Decision::Next(position + 1)
        } else {
            Decision::Exhausted
        }
    }

    fn observe(&mut self, position: usize, energies: EnergyVector, drift: f64) -> Decision {
        let previous = self.previous.replace(energies);

        if drift > self.config.max_drift {
            self.stable = 0;
            return match self.next_higher_fidelity(position) {
                Some(next) => Decision::Next(next),
                None => Decision::Drifted(drift),
            };
        }

        let Some(previous) = previous else {
            return self.following(position);
        };
        if energies.relative_peptide_decrease(&previous) > self.config.relative_energy_threshold {
            self.stable = 0;
            return self.following(position);
        }

        self.stable += 1;
        if self.stable >= self.config.stable_stages {
            return Decision::Accept;
        }
        match self.next_higher_fidelity(position) {
            Some(next) => Decision::Next(next),
            None => self.following(position),
        }
    }
}

/// Writes the candidate poses and minimizes each of them in its own directory.
#[instrument(skip_all, name = "minimization_driver", fields(target = %ctx.config.target.name))]
pub fn run(
    ctx: &TargetContext,
    workspace: &mut Workspace,
    minimizer: &dyn Minimizer,
    poses_file: &Path,
) -> Result<Vec<CandidateOutcome>, EngineError> {
    let candidates = write_candidates(ctx, workspace, poses_file)?;
    ctx.reporter.report(Progress::TaskStart {
        total_steps: candidates.len() as u64,
    });

    let mut outcomes = Vec::with_capacity(candidates.len());
    for (i, input) in candidates.into_iter().enumerate() {
        let rank = i + 1;
        let outcome = minimize_pose(ctx, workspace, minimizer, &pose_label(rank), &input)?;
        ctx.reporter.report(Progress::TaskIncrement);
        outcomes.push(CandidateOutcome {
            rank,
            input,
            outcome,
        });
    }
    ctx.reporter.report(Progress::TaskFinish);
    Ok(outcomes)
}

fn write_candidates(
    ctx: &TargetContext,
    workspace: &mut Workspace,
    poses_file: &Path,
) -> Result<Vec<PathBuf>, EngineError> {
    let count = ctx.config.minimization.candidate_poses;
    let sealed_dir = workspace.root().join(CANDIDATES_LABEL);

    let last_sealed = workspace.last_sealed();
    let in_step = |e: EngineError| e.in_step(CANDIDATES_LABEL, last_sealed.clone());
    let text = fs::read_to_string(poses_file)
        .map_err(EngineError::from)
        .map_err(in_step)?;
    let poses = extract_poses(&text, count);
    if poses.is_empty() {
        return Err(in_step(EngineError::Report {
            what: "pose file",
            path: poses_file.to_path_buf(),
            reason: "contains no coordinate records".to_string(),
        }));
    }
    if poses.len() < count {
        warn!(
            requested = count,
            available = poses.len(),
            "Fewer poses than requested candidates."
        );
    }

    if workspace.is_sealed(CANDIDATES_LABEL) && sealed_candidates_match(&sealed_dir, &poses) {
        info!(count = poses.len(), "Reusing sealed candidate poses.");
        return Ok((1..=poses.len())
            .map(|rank| sealed_dir.join(candidate_file(rank)))
            .collect());
    }

    // Stages minimized from earlier candidates no longer apply.
    let dropped = workspace
        .invalidate(&format!("{}/pose_", MINIMIZATION_DIR))
        .map_err(in_step)?;
    remove_pose_dirs(&workspace.root().join(MINIMIZATION_DIR)).map_err(in_step)?;
    if dropped > 0 {
        info!(
            stages = dropped,
            "Candidate poses changed; discarding their minimization stages."
        );
    }

    let step = workspace.begin(CANDIDATES_LABEL).map_err(in_step)?;
    let mut paths = Vec::with_capacity(poses.len());
    for (i, pose) in poses.iter().enumerate() {
        let name = candidate_file(i + 1);
        fs::write(step.path().join(&name), pose).map_err(|e| in_step(e.into()))?;
        paths.push(step.sealed_path(name));
    }
    workspace.seal(step).map_err(in_step)?;
    Ok(paths)
}

fn candidate_file(rank: usize) -> String {
    format!("pose_{:02}.pdb", rank)
}

// The sealed set must hold exactly these poses, no more and no fewer.
fn sealed_candidates_match(dir: &Path, poses: &[String]) -> bool {
    let same = poses.iter().enumerate().all(|(i, pose)| {
        fs::read_to_string(dir.join(candidate_file(i + 1))).is_ok_and(|text| text == *pose)
    });
    same && !dir.join(candidate_file(poses.len() + 1)).exists()
}

fn remove_pose_dirs(dir: &Path) -> Result<(), EngineError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pose = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("pose_"));
        if is_pose && path.is_dir() {
            fs::remove_dir_all(&path)?;
        }
    }
    Ok(())
}

/// Runs the configured stages on one pose until the stopping heuristic decides.
///
/// Each stage consumes the previous stage's sealed output. Stages already
/// sealed for the same input and settings are reused. The per-stage energies
/// are written to `energies.csv` under `pose_label`.
#[instrument(skip_all, name = "minimize_pose", fields(pose = pose_label))]
pub fn minimize_pose(
    ctx: &TargetContext,
    workspace: &mut Workspace,
    minimizer: &dyn Minimizer,
    pose_label: &str,
    input: &Path,
) -> Result<MinimizationOutcome, EngineError> {
    let config = &ctx.config.minimization;
    let mut monitor = StageMonitor::new(config);
    let mut stages: Vec<MinimizationStage> = Vec::new();
    let mut current = input.to_path_buf();
    let mut position = 0;

    let convergence = loop {
        let spec = config.stages[position];
        let label = stage_label(pose_label, position + 1, spec.environment);
        let stage = run_stage(ctx, workspace, minimizer, &label, spec, &current)?;
        info!(
            stage = %label,
            peptide = stage.energies.peptide,
            interaction = stage.energies.interaction,
            drift = stage.drift,
            "Stage sealed."
        );

        let decision = monitor.observe(position, stage.energies, stage.drift);
        current = stage.output.clone();
        stages.push(stage);
        match decision {
            Decision::Next(next) => position = next,
            Decision::Accept => {
                break Convergence::Converged {
                    stage: stages.len(),
                };
            }
            Decision::Drifted(drift) => {
                break Convergence::NonConvergent {
                    reason: NonConvergence::ExcessiveDrift {
                        stage: stages.len(),
                        drift,
                    },
                };
            }
            Decision::Exhausted => {
                break Convergence::NonConvergent {
                    reason: NonConvergence::Exhausted {
                        stages: stages.len(),
                    },
                };
            }
        }
    };

    match &convergence {
        Convergence::Converged { stage } => {
            info!(accepted = stage, "Peptide energy converged.")
        }
        Convergence::NonConvergent { reason } => {
            warn!(%reason, "Pose flagged as non-convergent; keeping the last stage as best effort.")
        }
    }

    let table = workspace.root().join(pose_label).join(ENERGIES_FILE);
    write_energy_table(&table, &stages)?;

    Ok(MinimizationOutcome {
        stages,
        convergence,
    })
}

fn run_stage(
    ctx: &TargetContext,
    workspace: &mut Workspace,
    minimizer: &dyn Minimizer,
    label: &str,
    spec: StageSpec,
    input: &Path,
) -> Result<MinimizationStage, EngineError> {
    if let Some(done) = workspace.stage(label) {
        if done.spec == spec && done.input == input {
            info!(stage = label, "Reusing sealed stage.");
            ctx.reporter.message(format!("{}: reusing sealed results", label));
            return Ok(done.clone());
        }
    }

    let last_sealed = workspace.last_sealed();
    ctx.check_cancelled()
        .map_err(|e| e.in_step(label, last_sealed.clone()))?;
    ctx.reporter.phase(label);

    let step = workspace
        .begin(label)
        .map_err(|e| e.in_step(label, last_sealed.clone()))?;
    let stage = match execute_stage(ctx, minimizer, &step, spec, input) {
        Ok(stage) => stage,
        Err(e) => {
            if e.is_cancelled() {
                workspace.discard(step);
            } else {
                warn!(stage = label, path = %step.path().display(), "Keeping failed stage directory for inspection.");
            }
            return Err(e.in_step(label, last_sealed));
        }
    };

    workspace
        .seal(step)
        .and_then(|_| workspace.record_stage(stage.clone()))
        .map_err(|e| e.in_step(label, last_sealed))?;
    ctx.reporter.report(Progress::PhaseFinish);
    Ok(stage)
}

fn execute_stage(
    ctx: &TargetContext,
    minimizer: &dyn Minimizer,
    step: &StepDir,
    spec: StageSpec,
    input: &Path,
) -> Result<MinimizationStage, EngineError> {
    let config = ctx.config;
    let request = MinimizeRequest {
        preparation_file: &config.target.preparation_file,
        input,
        iterations: spec.iterations,
        environment: spec.environment,
        directory: step.path(),
        keep_parameters: config.minimization.keep_parameters,
    };
    let output = minimizer.minimize(&request, ctx.cancel)?;

    let report_path = step.path().join(ENERGY_REPORT_FILE);
    fs::write(&report_path, &output.report)?;
    let energies = parse_energy_report(&output.report).map_err(|e| EngineError::Report {
        what: "energy report",
        path: report_path,
        reason: e.to_string(),
    })?;

    let before = read_atoms(input)?;
    let after = read_atoms(&output.pose_path)?;
    let drift = coordinate_drift(&before, &after).ok_or_else(|| EngineError::PoseMismatch {
        path: output.pose_path.clone(),
    })?;

    Ok(MinimizationStage {
        label: step.label().to_string(),
        spec,
        input: input.to_path_buf(),
        output: step.sealed_path(MINIMIZED_POSE_FILE),
        energies,
        drift,
    })
}

// Records are kept in file order; chains that restart numbering at the same
// residue stay distinct atoms.
fn read_atoms(path: &Path) -> Result<Vec<AtomRecord>, EngineError> {
    let text = fs::read_to_string(path)?;
    let atoms = text
        .lines()
        .enumerate()
        .filter(|(_, line)| pdb::is_coordinate_record(line))
        .enumerate()
        .map(|(index, (line_number, line))| pdb::parse_atom_line(line, line_number + 1, index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(atoms)
}

#[derive(Serialize)]
struct EnergyRow<'a> {
    stage: &'a str,
    iterations: u32,
    environment: Environment,
    complex: f64,
    receptor: f64,
    peptide: f64,
    interaction: f64,
    complex_minus_receptor: f64,
    drift: f64,
    // Change from the previous stage; empty on the first row.
    delta_complex: Option<f64>,
    delta_peptide: Option<f64>,
    delta_interaction: Option<f64>,
}

fn write_energy_table(path: &Path, stages: &[MinimizationStage]) -> Result<(), EngineError> {
    let mut writer = csv::Writer::from_path(path).map_err(std::io::Error::from)?;
    let mut previous: Option<EnergyVector> = None;
    for stage in stages {
        let e = &stage.energies;
        let delta = previous.map(|p| *e - p);
        writer
            .serialize(EnergyRow {
                stage: &stage.label,
                iterations: stage.spec.iterations,
                environment: stage.spec.environment,
                complex: e.complex,
                receptor: e.receptor,
                peptide: e.peptide,
                interaction: e.interaction,
                complex_minus_receptor: e.complex_minus_receptor,
                drift: stage.drift,
                delta_complex: delta.map(|d| d.complex),
                delta_peptide: delta.map(|d| d.peptide),
                delta_interaction: delta.map(|d| d.interaction),
            })
            .map_err(std::io::Error::from)?;
        previous = Some(*e);
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdb::tests::atom_line;
    use crate::engine::cancel::CancellationToken;
    use crate::engine::config::tests::{docking_config, minimization_config};
    use crate::engine::config::DockingConfig;
    use crate::engine::progress::ProgressReporter;
    use crate::engine::tools::fakes::ScriptedMinimizer;
    use tempfile::{TempDir, tempdir};

    const V: Environment = Environment::Vacuum;
    const I: Environment = Environment::Implicit;

    fn peptide(value: f64) -> EnergyVector {
        EnergyVector::new(-1000.0 + value, -1000.0, value, -20.0, value - 20.0)
    }

    fn stages(envs: &[Environment]) -> Vec<StageSpec> {
        envs.iter().map(|&env| StageSpec::new(500, env)).collect()
    }

    fn atoms_text() -> String {
        format!(
            "{}\n{}\n{}\n",
            atom_line(1, "N", "ALA", 1),
            atom_line(2, "CA", "ALA", 1),
            atom_line(3, "N", "GLY", 2)
        )
    }

    fn pose_text() -> String {
        format!("{}END\n", atoms_text())
    }

    fn setup(envs: &[Environment]) -> (TempDir, DockingConfig, PathBuf) {
        let dir = tempdir().unwrap();
        let config = docking_config(dir.path(), stages(envs));
        let input = dir.path().join("input.pdb");
        fs::write(&input, pose_text()).unwrap();
        (dir, config, input)
    }

    fn drive(
        config: &DockingConfig,
        root: &Path,
        input: &Path,
        minimizer: &ScriptedMinimizer,
    ) -> Result<MinimizationOutcome, EngineError> {
        let reporter = ProgressReporter::new();
        let cancel = CancellationToken::new();
        let ctx = TargetContext::new(config, &reporter, &cancel);
        let mut ws = Workspace::open(root, "target").unwrap();
        minimize_pose(&ctx, &mut ws, minimizer, &pose_label(1), input)
    }

    #[test]
    fn monitor_accepts_after_consecutive_small_decreases() {
        let config = minimization_config(stages(&[V, V, V, V]));
        let mut monitor = StageMonitor::new(&config);
        assert_eq!(monitor.observe(0, peptide(-50.0), 0.1), Decision::Next(1));
        assert_eq!(monitor.observe(1, peptide(-50.2), 0.1), Decision::Next(2));
        assert_eq!(monitor.observe(2, peptide(-50.3), 0.1), Decision::Accept);
    }

    #[test]
    fn monitor_resets_on_large_decrease() {
        let config = minimization_config(stages(&[V, V, V, V]));
        let mut monitor = StageMonitor::new(&config);
        monitor.observe(0, peptide(-50.0), 0.1);
        assert_eq!(monitor.observe(1, peptide(-50.1), 0.1), Decision::Next(2));
        assert_eq!(monitor.observe(2, peptide(-60.0), 0.1), Decision::Next(3));
        assert_eq!(monitor.observe(3, peptide(-60.1), 0.1), Decision::Exhausted);
    }

    #[test]
    fn monitor_escalates_when_stable_or_drifting() {
        let config = minimization_config(stages(&[V, V, V, I]));
        let mut monitor = StageMonitor::new(&config);
        assert_eq!(monitor.observe(0, peptide(-50.0), 0.1), Decision::Next(1));
        assert_eq!(monitor.observe(1, peptide(-50.1), 0.1), Decision::Next(3));

        let mut monitor = StageMonitor::new(&config);
        assert_eq!(monitor.observe(0, peptide(-50.0), 5.0), Decision::Next(3));
        assert_eq!(monitor.observe(3, peptide(-50.0), 5.0), Decision::Drifted(5.0));
    }

    #[test]
    fn small_decreases_for_two_stages_accept_final_stage() {
        let (dir, config, input) = setup(&[V, V, V, V]);
        let minimizer = ScriptedMinimizer::new(vec![
            (peptide(-50.0), 0.1),
            (peptide(-50.2), 0.1),
            (peptide(-50.3), 0.1),
            (peptide(-90.0), 0.1),
        ]);

        let outcome = drive(&config, dir.path(), &input, &minimizer).unwrap();

        assert_eq!(outcome.convergence, Convergence::Converged { stage: 3 });
        assert_eq!(outcome.stages.len(), 3);
        assert_eq!(minimizer.calls().len(), 3);
        let accepted = outcome.final_stage().unwrap();
        assert_eq!(accepted.label, "minimization/pose_01/stage_03_vacuum");
        assert!(accepted.output.is_file());
        assert_eq!(outcome.stages[1].input, outcome.stages[0].output);
    }

    #[test]
    fn unresolved_drift_at_final_stage_is_non_convergent() {
        let (dir, config, input) = setup(&[V, I]);
        let minimizer = ScriptedMinimizer::new(vec![(peptide(-50.0), 0.1), (peptide(-80.0), 5.0)]);

        let outcome = drive(&config, dir.path(), &input, &minimizer).unwrap();

        match outcome.convergence {
            Convergence::NonConvergent {
                reason: NonConvergence::ExcessiveDrift { stage, drift },
            } => {
                assert_eq!(stage, 2);
                assert!((drift - 5.0).abs() < 1e-6);
            }
            other => panic!("unexpected convergence: {other:?}"),
        }
        assert_eq!(outcome.final_stage().unwrap().spec.environment, I);
    }

    #[test]
    fn steadily_falling_energy_exhausts_the_stages() {
        let (dir, config, input) = setup(&[V, V, I]);
        let minimizer = ScriptedMinimizer::new(vec![
            (peptide(-10.0), 0.1),
            (peptide(-20.0), 0.1),
            (peptide(-30.0), 0.1),
        ]);

        let outcome = drive(&config, dir.path(), &input, &minimizer).unwrap();
        assert_eq!(
            outcome.convergence,
            Convergence::NonConvergent {
                reason: NonConvergence::Exhausted { stages: 3 }
            }
        );
    }

    #[test]
    fn drift_skips_remaining_stages_of_same_fidelity() {
        let (dir, config, input) = setup(&[V, V, I]);
        let minimizer = ScriptedMinimizer::new(vec![(peptide(-10.0), 3.0), (peptide(-10.0), 0.1)]);

        let outcome = drive(&config, dir.path(), &input, &minimizer).unwrap();
        assert_eq!(minimizer.calls(), vec![(500, V), (500, I)]);
        assert_eq!(outcome.stages[1].label, "minimization/pose_01/stage_03_implicit");
    }

    #[test]
    fn energies_table_lists_every_stage() {
        let (dir, config, input) = setup(&[V, V]);
        let minimizer = ScriptedMinimizer::new(vec![(peptide(-10.0), 0.1), (peptide(-10.01), 0.1)]);
        drive(&config, dir.path(), &input, &minimizer).unwrap();

        let table = dir.path().join("minimization/pose_01").join(ENERGIES_FILE);
        let mut reader = csv::Reader::from_path(&table).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "stage");
        assert_eq!(&headers[2], "environment");
        let delta = headers.iter().position(|h| h == "delta_peptide").unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "minimization/pose_01/stage_01_vacuum");
        assert_eq!(&rows[1][2], "vacuum");
        assert_eq!(&rows[0][delta], "");
        let change: f64 = rows[1][delta].parse().unwrap();
        assert!((change + 0.01).abs() < 1e-9);
    }

    #[test]
    fn two_chain_pose_keeps_both_chains() {
        let (dir, config, input) = setup(&[V]);
        fs::write(
            &input,
            format!(
                "{}\n{}\nTER\n{}\n{}\nTER\nEND\n",
                atom_line(1, "N", "ALA", 1),
                atom_line(2, "CA", "ALA", 1),
                atom_line(3, "N", "GLY", 1),
                atom_line(4, "CA", "GLY", 1)
            ),
        )
        .unwrap();
        let minimizer = ScriptedMinimizer::new(vec![(peptide(-10.0), 0.5)]);

        let outcome = drive(&config, dir.path(), &input, &minimizer).unwrap();

        let stage = outcome.final_stage().unwrap();
        assert!((stage.drift - 0.5).abs() < 1e-6);
        let atoms = read_atoms(&stage.output).unwrap();
        assert_eq!(atoms.len(), 4);
        assert_eq!(atoms[2].residue_name(), "GLY");
        assert_eq!(atoms[2].residue_number(), 1);
    }

    #[test]
    fn cancellation_inside_stage_discards_the_running_stage() {
        let (dir, config, input) = setup(&[V, V, V]);
        let minimizer = ScriptedMinimizer::new(vec![(peptide(-10.0), 0.1), (peptide(-10.0), 0.1)])
            .cancelling_at(2);
        let reporter = ProgressReporter::new();
        let cancel = CancellationToken::new();
        let ctx = TargetContext::new(&config, &reporter, &cancel);
        let mut ws = Workspace::open(dir.path(), "target").unwrap();

        let err = minimize_pose(&ctx, &mut ws, &minimizer, &pose_label(1), &input).unwrap_err();

        let first = dir.path().join("minimization/pose_01/stage_01_vacuum");
        let second = dir.path().join("minimization/pose_01/stage_02_vacuum");
        assert!(err.is_cancelled());
        match err {
            EngineError::Step {
                step, last_sealed, ..
            } => {
                assert_eq!(step, "minimization/pose_01/stage_02_vacuum");
                assert_eq!(last_sealed, Some(first.clone()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!second.with_extension("partial").exists());
        assert!(!second.exists());
        assert!(first.join(MINIMIZED_POSE_FILE).is_file());
        assert_eq!(ws.last_sealed(), Some(first));
        assert!(ws.stage("minimization/pose_01/stage_02_vacuum").is_none());
    }

    #[test]
    fn sealed_stages_are_reused_on_rerun() {
        let (dir, config, input) = setup(&[V, V, V]);
        let first = ScriptedMinimizer::new(vec![
            (peptide(-50.0), 0.1),
            (peptide(-50.1), 0.1),
            (peptide(-50.2), 0.1),
        ]);
        let expected = drive(&config, dir.path(), &input, &first).unwrap();

        let idle = ScriptedMinimizer::new(vec![]);
        let again = drive(&config, dir.path(), &input, &idle).unwrap();
        assert!(idle.calls().is_empty());
        assert_eq!(again, expected);
    }

    #[test]
    fn minimizer_failure_names_the_stage() {
        let (dir, config, input) = setup(&[V, V]);
        let minimizer = ScriptedMinimizer::new(vec![(peptide(-10.0), 0.1)]);
        match drive(&config, dir.path(), &input, &minimizer).unwrap_err() {
            EngineError::Step {
                step, last_sealed, ..
            } => {
                assert_eq!(step, "minimization/pose_01/stage_02_vacuum");
                assert_eq!(
                    last_sealed,
                    Some(dir.path().join("minimization/pose_01/stage_01_vacuum"))
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn run_minimizes_each_candidate_pose() {
        let (dir, mut config, _) = setup(&[V]);
        config.minimization.candidate_poses = 2;
        let poses_file = dir.path().join("poses.pdb");
        fs::write(
            &poses_file,
            format!("MODEL 1\n{}ENDMDL\nMODEL 2\n{}ENDMDL\n", atoms_text(), atoms_text()),
        )
        .unwrap();
        let minimizer = ScriptedMinimizer::new(vec![(peptide(-1.0), 0.1), (peptide(-2.0), 0.1)]);
        let reporter = ProgressReporter::new();
        let cancel = CancellationToken::new();
        let ctx = TargetContext::new(&config, &reporter, &cancel);
        let mut ws = Workspace::open(dir.path(), "target").unwrap();

        let outcomes = run(&ctx, &mut ws, &minimizer, &poses_file).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].rank, 2);
        assert_eq!(
            outcomes[1].input,
            dir.path().join(CANDIDATES_LABEL).join("pose_02.pdb")
        );
        assert!(outcomes[1].outcome.stages[0].output.is_file());
    }

    fn models(residues: &[&str]) -> String {
        residues
            .iter()
            .enumerate()
            .map(|(i, res)| {
                format!(
                    "MODEL {}\n{}\n{}\nENDMDL\n",
                    i + 1,
                    atom_line(1, "N", res, 1),
                    atom_line(2, "CA", res, 1)
                )
            })
            .collect()
    }

    fn run_candidates(
        config: &DockingConfig,
        root: &Path,
        poses_file: &Path,
        minimizer: &ScriptedMinimizer,
    ) -> Vec<CandidateOutcome> {
        let reporter = ProgressReporter::new();
        let cancel = CancellationToken::new();
        let ctx = TargetContext::new(config, &reporter, &cancel);
        let mut ws = Workspace::open(root, "target").unwrap();
        run(&ctx, &mut ws, minimizer, poses_file).unwrap()
    }

    #[test]
    fn unchanged_candidates_reuse_sealed_stages() {
        let (dir, mut config, _) = setup(&[V]);
        config.minimization.candidate_poses = 2;
        let poses_file = dir.path().join("poses.pdb");
        fs::write(&poses_file, models(&["GLY", "ALA"])).unwrap();
        let first = ScriptedMinimizer::new(vec![(peptide(-1.0), 0.1), (peptide(-2.0), 0.1)]);
        let expected = run_candidates(&config, dir.path(), &poses_file, &first);

        let idle = ScriptedMinimizer::new(vec![]);
        let again = run_candidates(&config, dir.path(), &poses_file, &idle);
        assert!(idle.calls().is_empty());
        assert_eq!(again[1].outcome, expected[1].outcome);
    }

    #[test]
    fn changed_candidates_are_minimized_again() {
        let (dir, mut config, _) = setup(&[V]);
        config.minimization.candidate_poses = 2;
        let poses_file = dir.path().join("poses.pdb");
        fs::write(&poses_file, models(&["GLY", "GLY"])).unwrap();
        let first = ScriptedMinimizer::new(vec![(peptide(-1.0), 0.1), (peptide(-2.0), 0.1)]);
        run_candidates(&config, dir.path(), &poses_file, &first);

        fs::write(&poses_file, models(&["TRP"])).unwrap();
        let second = ScriptedMinimizer::new(vec![(peptide(-3.0), 0.1)]);
        let outcomes = run_candidates(&config, dir.path(), &poses_file, &second);

        assert_eq!(second.calls().len(), 1);
        assert_eq!(outcomes.len(), 1);
        let candidate = fs::read_to_string(&outcomes[0].input).unwrap();
        assert!(candidate.contains(" TRP "));
        let minimized = fs::read_to_string(&outcomes[0].outcome.stages[0].output).unwrap();
        assert!(minimized.contains(" TRP "));
        assert!(!minimized.contains(" GLY "));
        assert_eq!(outcomes[0].outcome.stages[0].energies.peptide, -3.0);

        let candidates = dir.path().join(CANDIDATES_LABEL);
        assert!(!candidates.join("pose_02.pdb").exists());
        assert!(!dir.path().join(pose_label(2)).exists());
        let ws = Workspace::open(dir.path(), "target").unwrap();
        assert!(ws.stage("minimization/pose_02/stage_01_vacuum").is_none());
    }
}
