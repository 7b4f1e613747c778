use super::residue::ResidueBlock;
use crate::core::io::pdb::{SEPARATOR_RECORD, TERMINATOR_RECORD};
use std::io::{self, Write};

/// A receptor followed by a ligand, ready to be written as one coordinate file.
///
/// Receptor records are kept verbatim and in source order (internal chain
/// separators included). Ligand records are held as residue blocks in
/// first-seen residue order. Written output is always
/// `receptor, TER, ligand, TER, END`.
#[derive(Debug, Clone, PartialEq)]
pub struct Complex {
    receptor: Vec<String>,
    ligand: Vec<ResidueBlock>,
}

impl Complex {
    pub(crate) fn new(receptor: Vec<String>, ligand: Vec<ResidueBlock>) -> Self {
        Self { receptor, ligand }
    }

    pub fn receptor_records(&self) -> &[String] {
        &self.receptor
    }

    pub fn ligand_blocks(&self) -> &[ResidueBlock] {
        &self.ligand
    }

    pub fn ligand_records(&self) -> impl Iterator<Item = &str> {
        self.ligand
            .iter()
            .flat_map(|b| b.atoms().iter().map(|a| a.raw()))
    }

    pub fn to_records(&self) -> Vec<String> {
        let mut records: Vec<String> = self.receptor.clone();
        records.push(SEPARATOR_RECORD.to_string());
        records.extend(self.ligand_records().map(str::to_string));
        records.push(SEPARATOR_RECORD.to_string());
        records.push(TERMINATOR_RECORD.to_string());
        records
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        for record in self.to_records() {
            writeln!(writer, "{}", record)?;
        }
        Ok(())
    }

    pub fn to_pdb_string(&self) -> String {
        let mut text = self.to_records().join("\n");
        text.push('\n');
        text
    }
}
