use crate::cli::ProtonateArgs;
use crate::error::{CliError, Result};
use pepflow::core::protonation::assigner::{UnresolvedPolicy, assign_stream};
use pepflow::engine::error::EngineError;
use std::fs;
use tracing::{info, warn};

pub fn run(args: ProtonateArgs) -> Result<()> {
    let text = fs::read_to_string(&args.input).map_err(|e| CliError::FileParsing {
        path: args.input.clone(),
        source: e.into(),
    })?;
    let policy = if args.strict {
        UnresolvedPolicy::Strict
    } else {
        UnresolvedPolicy::DefaultToHid
    };

    let assigned = assign_stream(&text, policy).map_err(EngineError::from)?;
    fs::write(&args.output, &assigned.text)?;

    for call in &assigned.calls {
        if call.is_defaulted() {
            warn!(
                residue = call.residue_number,
                "Histidine without ring hydrogens defaulted to HID."
            );
        } else {
            info!(residue = call.residue_number, state = %call.state, "Assigned histidine.");
        }
    }
    println!(
        "✓ {} histidine(s) assigned, written to: {}",
        assigned.calls.len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::atom_line;
    use pepflow::core::protonation::assigner::ProtonationError;
    use std::path::Path;
    use tempfile::tempdir;

    fn histidine(dir: &Path, hydrogen: Option<&str>) -> std::path::PathBuf {
        let mut text = atom_line(1, "ND1", "HIS", 7) + &atom_line(2, "NE2", "HIS", 7);
        if let Some(h) = hydrogen {
            text.push_str(&atom_line(3, h, "HIS", 7));
        }
        let path = dir.join("in.pdb");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn epsilon_hydrogen_becomes_hie() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.pdb");
        run(ProtonateArgs {
            input: histidine(dir.path(), Some("HE2")),
            output: output.clone(),
            strict: false,
        })
        .unwrap();

        let written = fs::read_to_string(output).unwrap();
        assert!(written.lines().all(|l| !l.starts_with("ATOM") || &l[17..20] == "HIE"));
    }

    #[test]
    fn strict_mode_rejects_bare_histidine() {
        let dir = tempdir().unwrap();
        let err = run(ProtonateArgs {
            input: histidine(dir.path(), None),
            output: dir.path().join("out.pdb"),
            strict: true,
        })
        .unwrap_err();
        assert!(matches!(
            err,
            CliError::Pepflow(EngineError::Protonation(
                ProtonationError::UnresolvedHistidine { residue_number: 7, .. }
            ))
        ));
    }
}
