use crate::cli::AssembleArgs;
use crate::error::{CliError, Result};
use pepflow::core::io::assembly;
use std::fs;
use std::path::Path;
use tracing::info;

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

pub fn run(args: AssembleArgs) -> Result<()> {
    let receptor = read(&args.receptor)?;
    let ligand = read(&args.ligand)?;

    let complex = assembly::assemble(&receptor, &ligand).map_err(|e| CliError::FileParsing {
        path: args.ligand.clone(),
        source: e.into(),
    })?;
    info!(
        receptor_records = complex.receptor_records().len(),
        ligand_residues = complex.ligand_blocks().len(),
        "Assembled complex."
    );

    fs::write(&args.output, complex.to_pdb_string())?;
    println!(
        "✓ Complex with {} peptide residue(s) written to: {}",
        complex.ligand_blocks().len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::atom_line;
    use tempfile::tempdir;

    #[test]
    fn writes_receptor_then_regrouped_peptide() {
        let dir = tempdir().unwrap();
        let receptor = dir.path().join("receptor.pdb");
        let ligand = dir.path().join("peptide.pdb");
        let output = dir.path().join("complex.pdb");
        fs::write(&receptor, format!("{}TER\nEND\n", atom_line(1, "N", "ALA", 1))).unwrap();
        fs::write(
            &ligand,
            format!(
                "{}{}{}",
                atom_line(1, "N", "GLY", 1),
                atom_line(2, "N", "SER", 2),
                atom_line(3, "CA", "GLY", 1)
            ),
        )
        .unwrap();

        run(AssembleArgs {
            receptor,
            ligand,
            output: output.clone(),
        })
        .unwrap();

        let written = fs::read_to_string(output).unwrap();
        let residues: Vec<&str> = written
            .lines()
            .filter(|l| l.starts_with("ATOM"))
            .map(|l| &l[17..20])
            .collect();
        assert_eq!(residues, vec!["ALA", "GLY", "GLY", "SER"]);
    }

    #[test]
    fn missing_input_names_the_file() {
        let dir = tempdir().unwrap();
        let err = run(AssembleArgs {
            receptor: dir.path().join("absent.pdb"),
            ligand: dir.path().join("peptide.pdb"),
            output: dir.path().join("out.pdb"),
        })
        .unwrap_err();
        assert!(matches!(err, CliError::FileParsing { path, .. } if path.ends_with("absent.pdb")));
    }
}
