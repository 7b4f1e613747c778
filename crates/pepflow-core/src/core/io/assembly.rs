use super::blocks::ResidueBlocksBuilder;
use super::pdb::{self, PdbError, RecordKind};
use crate::core::models::complex::Complex;

/// Receptor and ligand records recovered from an assembled complex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplitComplex {
    /// Coordinate records and internal chain separators, in file order.
    pub receptor: Vec<String>,
    /// Coordinate records of the ligand, in file order.
    pub ligand: Vec<String>,
}

impl SplitComplex {
    pub fn receptor_text(&self) -> String {
        terminated(&self.receptor)
    }

    pub fn ligand_text(&self) -> String {
        terminated(&self.ligand)
    }
}

fn terminated(records: &[String]) -> String {
    let mut text = String::new();
    for record in records {
        text.push_str(record);
        text.push('\n');
    }
    text.push_str(pdb::SEPARATOR_RECORD);
    text.push('\n');
    text.push_str(pdb::TERMINATOR_RECORD);
    text.push('\n');
    text
}

/// Merges a receptor stream and a ligand stream into one complex.
///
/// Receptor coordinate records and its internal separators pass through in
/// order; a trailing separator and any terminator are dropped so the output
/// carries exactly one separator between receptor and ligand. Ligand records
/// are regrouped by residue number. Atoms and residues are never renumbered.
pub fn assemble(receptor: &str, ligand: &str) -> Result<Complex, PdbError> {
    let mut receptor_records: Vec<String> = Vec::new();
    for (line_num, line) in receptor.lines().enumerate() {
        match pdb::record_kind(line) {
            RecordKind::Coordinate => {
                pdb::parse_atom_line(line, line_num + 1, receptor_records.len())?;
                receptor_records.push(line.to_string());
            }
            RecordKind::Separator => {
                let follows_separator = receptor_records
                    .last()
                    .is_none_or(|last| pdb::is_separator_record(last));
                if !follows_separator {
                    receptor_records.push(line.to_string());
                }
            }
            _ => {}
        }
    }
    while receptor_records
        .last()
        .is_some_and(|last| pdb::is_separator_record(last))
    {
        receptor_records.pop();
    }

    let mut builder = ResidueBlocksBuilder::new();
    for (line_num, line) in ligand.lines().enumerate() {
        builder.push_line(line, line_num + 1)?;
    }

    Ok(Complex::new(receptor_records, builder.build()))
}

/// Splits an assembled complex at its last chain separator.
///
/// The ligand is the last non-empty separator-delimited segment; everything
/// before the separator that precedes it is receptor. A stream without any
/// separator is returned as receptor only. Non-coordinate records other than
/// separators are dropped.
pub fn split_complex(text: &str) -> SplitComplex {
    let mut segments: Vec<Vec<String>> = vec![Vec::new()];
    for line in text.lines() {
        match pdb::record_kind(line) {
            RecordKind::Coordinate => {
                if let Some(current) = segments.last_mut() {
                    current.push(line.to_string());
                }
            }
            RecordKind::Separator => segments.push(Vec::new()),
            RecordKind::Terminator | RecordKind::ModelEnd => break,
            _ => {}
        }
    }
    segments.retain(|s| !s.is_empty());

    let Some(ligand) = segments.pop() else {
        return SplitComplex::default();
    };
    if segments.is_empty() {
        return SplitComplex {
            receptor: ligand,
            ligand: Vec::new(),
        };
    }

    let mut receptor = Vec::new();
    for (i, segment) in segments.into_iter().enumerate() {
        if i > 0 {
            receptor.push(pdb::SEPARATOR_RECORD.to_string());
        }
        receptor.extend(segment);
    }
    SplitComplex { receptor, ligand }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdb::tests::atom_line;

    fn receptor(trailing: &[&str]) -> String {
        let mut lines = vec![
            "HEADER    RECEPTOR".to_string(),
            atom_line(1, "N", "MET", 1),
            atom_line(2, "CA", "MET", 1),
            atom_line(3, "N", "LYS", 2),
        ];
        lines.extend(trailing.iter().map(|s| s.to_string()));
        lines.join("\n")
    }

    fn ligand() -> String {
        [
            atom_line(10, "N", "GLY", 1),
            atom_line(11, "N", "ALA", 2),
            atom_line(12, "CA", "GLY", 1),
            "END".to_string(),
        ]
        .join("\n")
    }

    #[test]
    fn assemble_places_separators_and_terminator() {
        let complex = assemble(&receptor(&[]), &ligand()).unwrap();
        let records = complex.to_records();

        assert_eq!(records.len(), 3 + 1 + 3 + 2);
        assert_eq!(records[3], "TER");
        assert_eq!(records[7], "TER");
        assert_eq!(records[8], "END");
        assert_eq!(records.iter().filter(|r| *r == "TER").count(), 2);
    }

    #[test]
    fn assemble_does_not_duplicate_trailing_receptor_separator() {
        let with_ter = assemble(&receptor(&["TER", "END"]), &ligand()).unwrap();
        let without_ter = assemble(&receptor(&[]), &ligand()).unwrap();
        assert_eq!(with_ter.to_records(), without_ter.to_records());
    }

    #[test]
    fn assemble_keeps_internal_receptor_separators() {
        let text = [
            atom_line(1, "N", "MET", 1),
            "TER".to_string(),
            atom_line(2, "N", "MET", 1),
            "TER".to_string(),
        ]
        .join("\n");
        let complex = assemble(&text, &ligand()).unwrap();
        assert_eq!(complex.receptor_records().len(), 3);
        assert_eq!(complex.receptor_records()[1], "TER");
    }

    #[test]
    fn assemble_reorders_ligand_only() {
        let complex = assemble(&receptor(&[]), &ligand()).unwrap();
        let ligand_names: Vec<_> = complex
            .ligand_blocks()
            .iter()
            .flat_map(|b| b.atoms().iter().map(|a| (a.residue_number(), a.atom_name().to_string())))
            .collect();
        assert_eq!(
            ligand_names,
            vec![
                (1, "N".to_string()),
                (1, "CA".to_string()),
                (2, "N".to_string())
            ]
        );
        assert!(complex.receptor_records()[0].contains("MET"));
    }

    #[test]
    fn split_recovers_identical_receptor_and_ligand_records() {
        let receptor_text = receptor(&["TER"]);
        let ligand_text = ligand();
        let complex = assemble(&receptor_text, &ligand_text).unwrap();
        let split = split_complex(&complex.to_pdb_string());

        let expected_receptor: Vec<String> = receptor_text
            .lines()
            .filter(|l| pdb::is_coordinate_record(l))
            .map(str::to_string)
            .collect();
        let expected_ligand: Vec<String> = complex.ligand_records().map(str::to_string).collect();

        assert_eq!(split.receptor, expected_receptor);
        assert_eq!(split.ligand, expected_ligand);
    }

    #[test]
    fn split_without_separator_is_receptor_only() {
        let split = split_complex(&receptor(&[]));
        assert_eq!(split.receptor.len(), 3);
        assert!(split.ligand.is_empty());
    }

    #[test]
    fn split_texts_are_terminated() {
        let complex = assemble(&receptor(&[]), &ligand()).unwrap();
        let split = split_complex(&complex.to_pdb_string());
        assert!(split.ligand_text().ends_with("TER\nEND\n"));
        assert!(split.receptor_text().starts_with("ATOM"));
    }
}
