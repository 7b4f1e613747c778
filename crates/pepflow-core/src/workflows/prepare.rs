use crate::core::io::assembly::{assemble, split_complex};
use crate::core::protonation::assigner::{ProtonationCall, UnresolvedPolicy, assign_stream};
use crate::engine::cancel::CancellationToken;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tools::{ProtonateRequest, Protonator};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const COMPLEX_FILE: &str = "complex.pdb";
pub const PROTONATED_FILE: &str = "complex_protonated.pdb";
pub const RECEPTOR_FILE: &str = "receptor.pdb";
pub const LIGAND_FILE: &str = "peptide.pdb";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Passed to the protonation tool; `None` keeps its default.
    pub flip: Option<bool>,
    pub policy: UnresolvedPolicy,
}

/// Files written by the preparation workflow and the histidine calls made per role.
#[derive(Debug, Clone)]
pub struct PreparedStructures {
    pub complex_path: PathBuf,
    pub protonated_path: PathBuf,
    pub receptor_path: PathBuf,
    pub ligand_path: PathBuf,
    pub complex_calls: Vec<ProtonationCall>,
    pub receptor_calls: Vec<ProtonationCall>,
    pub ligand_calls: Vec<ProtonationCall>,
}

/// Assembles receptor and peptide, protonates the complex with the external
/// tool, then splits it and assigns histidine states separately per role.
#[instrument(skip_all, name = "prepare_workflow", fields(output = %output_dir.display()))]
pub fn run(
    receptor: &Path,
    ligand: &Path,
    output_dir: &Path,
    protonator: &dyn Protonator,
    options: &PrepareOptions,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<PreparedStructures, EngineError> {
    fs::create_dir_all(output_dir)?;

    reporter.report(Progress::PhaseStart {
        name: "Assembly".to_string(),
    });
    let complex = assemble(&fs::read_to_string(receptor)?, &fs::read_to_string(ligand)?)?;
    let complex_path = output_dir.join(COMPLEX_FILE);
    fs::write(&complex_path, complex.to_pdb_string())?;
    info!(
        receptor_records = complex.receptor_records().len(),
        ligand_residues = complex.ligand_blocks().len(),
        "Assembled complex."
    );
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Protonation".to_string(),
    });
    let request = ProtonateRequest {
        input: &complex_path,
        flip: options.flip,
        directory: output_dir,
    };
    let protonated = protonator.protonate(&request, cancel)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Histidine assignment".to_string(),
    });
    let merged = assign_stream(&protonated, options.policy)?;
    let protonated_path = output_dir.join(PROTONATED_FILE);
    fs::write(&protonated_path, &merged.text)?;

    let split = split_complex(&protonated);
    if split.ligand.is_empty() {
        warn!("Protonated complex has no separator-delimited ligand segment.");
    }
    let receptor_assigned = assign_stream(&split.receptor_text(), options.policy)?;
    let ligand_assigned = assign_stream(&split.ligand_text(), options.policy)?;
    let receptor_path = output_dir.join(RECEPTOR_FILE);
    let ligand_path = output_dir.join(LIGAND_FILE);
    fs::write(&receptor_path, &receptor_assigned.text)?;
    fs::write(&ligand_path, &ligand_assigned.text)?;
    reporter.report(Progress::PhaseFinish);

    for call in merged.calls.iter().filter(|c| c.is_defaulted()) {
        warn!(
            residue = call.residue_number,
            "Histidine without ring hydrogens defaulted to HID."
        );
    }
    info!(
        receptor_histidines = receptor_assigned.calls.len(),
        ligand_histidines = ligand_assigned.calls.len(),
        "Preparation finished."
    );

    Ok(PreparedStructures {
        complex_path,
        protonated_path,
        receptor_path,
        ligand_path,
        complex_calls: merged.calls,
        receptor_calls: receptor_assigned.calls,
        ligand_calls: ligand_assigned.calls,
    })
}
