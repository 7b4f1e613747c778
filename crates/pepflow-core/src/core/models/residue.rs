use super::atom::AtomRecord;
use crate::core::io::pdb::MalformedRecord;
use std::collections::HashSet;

/// All coordinate records that share one residue sequence number.
///
/// Atom order inside the block is the order in which the records were read.
/// Atom names are unique within a block.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueBlock {
    residue_number: i32,
    atoms: Vec<AtomRecord>,
}

impl ResidueBlock {
    pub(crate) fn new(residue_number: i32) -> Self {
        Self {
            residue_number,
            atoms: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, atom: AtomRecord) -> Result<(), MalformedRecord> {
        if self.contains_atom(atom.atom_name()) {
            return Err(MalformedRecord::DuplicateAtomName {
                residue_number: self.residue_number,
                atom_name: atom.atom_name().to_string(),
            });
        }
        self.atoms.push(atom);
        Ok(())
    }

    pub fn residue_number(&self) -> i32 {
        self.residue_number
    }

    /// Residue name of the first record in the block.
    pub fn residue_name(&self) -> &str {
        self.atoms.first().map_or("", |a| a.residue_name())
    }

    pub fn atoms(&self) -> &[AtomRecord] {
        &self.atoms
    }

    pub fn atom_names(&self) -> HashSet<&str> {
        self.atoms.iter().map(|a| a.atom_name()).collect()
    }

    pub fn contains_atom(&self, name: &str) -> bool {
        self.atoms.iter().any(|a| a.atom_name() == name)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Returns a copy of this block with every record renamed to `residue_name`.
    pub fn renamed(&self, residue_name: &str) -> Self {
        Self {
            residue_number: self.residue_number,
            atoms: self
                .atoms
                .iter()
                .map(|a| a.with_residue_name(residue_name))
                .collect(),
        }
    }
}
