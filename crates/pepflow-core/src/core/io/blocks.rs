use super::pdb::{self, PdbError};
use crate::core::models::atom::AtomRecord;
use crate::core::models::residue::ResidueBlock;
use std::collections::HashMap;
use std::io::BufRead;

/// Accumulates coordinate records into residue blocks keyed by residue number.
///
/// A residue number that reappears after other residues is folded back into
/// the block created at its first occurrence, so downstream tools always see
/// each residue as one contiguous run of records.
#[derive(Debug, Default)]
pub struct ResidueBlocksBuilder {
    blocks: Vec<ResidueBlock>,
    block_index: HashMap<i32, usize>,
    next_atom_index: usize,
}

impl ResidueBlocksBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line; non-coordinate records are ignored.
    pub fn push_line(&mut self, line: &str, line_number: usize) -> Result<&mut Self, PdbError> {
        if !pdb::is_coordinate_record(line) {
            return Ok(self);
        }
        let atom = pdb::parse_atom_line(line, line_number, self.next_atom_index)?;
        self.next_atom_index += 1;
        self.push_atom(atom)
    }

    pub fn push_atom(&mut self, atom: AtomRecord) -> Result<&mut Self, PdbError> {
        let residue_number = atom.residue_number();
        let line_number = atom.line_number();
        let idx = *self.block_index.entry(residue_number).or_insert_with(|| {
            self.blocks.push(ResidueBlock::new(residue_number));
            self.blocks.len() - 1
        });
        self.blocks[idx]
            .push(atom)
            .map_err(|kind| PdbError::Parse {
                line: line_number,
                kind,
            })?;
        Ok(self)
    }

    pub fn build(self) -> Vec<ResidueBlock> {
        self.blocks
    }
}

pub fn parse_blocks(reader: &mut impl BufRead) -> Result<Vec<ResidueBlock>, PdbError> {
    let mut builder = ResidueBlocksBuilder::new();
    for (line_num, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        builder.push_line(&line, line_num + 1)?;
    }
    Ok(builder.build())
}

pub fn parse_blocks_str(text: &str) -> Result<Vec<ResidueBlock>, PdbError> {
    let mut builder = ResidueBlocksBuilder::new();
    for (line_num, line) in text.lines().enumerate() {
        builder.push_line(line, line_num + 1)?;
    }
    Ok(builder.build())
}

/// Iterates the records of `blocks` in block order.
pub fn flatten(blocks: &[ResidueBlock]) -> impl Iterator<Item = &AtomRecord> {
    blocks.iter().flat_map(|b| b.atoms().iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdb::MalformedRecord;
    use crate::core::io::pdb::tests::atom_line;
    use std::io::BufReader;

    fn shuffled_peptide() -> String {
        [
            "REMARK generated by a docking tool".to_string(),
            atom_line(1, "N", "GLY", 1),
            atom_line(2, "CA", "GLY", 1),
            atom_line(3, "N", "ALA", 2),
            atom_line(4, "C", "GLY", 1),
            atom_line(5, "CA", "ALA", 2),
            atom_line(6, "N", "SER", 3),
            atom_line(7, "O", "GLY", 1),
            "TER".to_string(),
            "END".to_string(),
        ]
        .join("\n")
    }

    #[test]
    fn blocks_follow_first_seen_residue_order() {
        let blocks = parse_blocks_str(&shuffled_peptide()).unwrap();
        let numbers: Vec<_> = blocks.iter().map(|b| b.residue_number()).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        let gly: Vec<_> = blocks[0].atoms().iter().map(|a| a.atom_name()).collect();
        assert_eq!(gly, vec!["N", "CA", "C", "O"]);
        assert_eq!(blocks[1].len(), 2);
        assert_eq!(blocks[2].residue_name(), "SER");
    }

    #[test]
    fn flattened_blocks_keep_the_same_multiset_of_records() {
        let text = shuffled_peptide();
        let blocks = parse_blocks_str(&text).unwrap();

        let mut input: Vec<&str> = text.lines().filter(|l| pdb::is_coordinate_record(l)).collect();
        let mut output: Vec<&str> = flatten(&blocks).map(|a| a.raw()).collect();
        assert_eq!(input.len(), output.len());
        input.sort_unstable();
        output.sort_unstable();
        assert_eq!(input, output);
    }

    #[test]
    fn record_indices_follow_source_order() {
        let blocks = parse_blocks_str(&shuffled_peptide()).unwrap();
        let gly_indices: Vec<_> = blocks[0].atoms().iter().map(|a| a.index()).collect();
        assert_eq!(gly_indices, vec![0, 1, 3, 6]);
    }

    #[test]
    fn reader_and_str_entry_points_agree() {
        let text = shuffled_peptide();
        let mut reader = BufReader::new(text.as_bytes());
        assert_eq!(parse_blocks(&mut reader).unwrap(), parse_blocks_str(&text).unwrap());
    }

    #[test]
    fn malformed_residue_number_reports_line() {
        let bad = atom_line(2, "CA", "GLY", 1).replacen("   1    ", "  ab    ", 1);
        let text = format!("{}\n{}", atom_line(1, "N", "GLY", 1), bad);
        let err = parse_blocks_str(&text).unwrap_err();
        assert!(matches!(
            err,
            PdbError::Parse {
                line: 2,
                kind: MalformedRecord::InvalidInt { .. }
            }
        ));
    }

    #[test]
    fn duplicate_atom_in_merged_block_is_malformed() {
        let text = [
            atom_line(1, "N", "GLY", 1),
            atom_line(2, "N", "ALA", 2),
            atom_line(3, "N", "GLY", 1),
        ]
        .join("\n");
        let err = parse_blocks_str(&text).unwrap_err();
        assert!(matches!(
            err,
            PdbError::Parse {
                line: 3,
                kind: MalformedRecord::DuplicateAtomName { residue_number: 1, .. }
            }
        ));
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(parse_blocks_str("REMARK only\nEND\n").unwrap().is_empty());
    }
}
