use nalgebra::Point3;

/// A single coordinate record read from a fixed-width structure file.
///
/// Records are immutable once parsed. The original line is retained so that
/// records can be written back byte-for-byte; derived records (for example a
/// histidine renamed by the protonation assigner) are produced through
/// [`AtomRecord::with_residue_name`] rather than by mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    index: usize,
    line_number: usize,
    residue_number: i32,
    residue_name: String,
    atom_name: String,
    position: Point3<f64>,
    raw: String,
}

impl AtomRecord {
    pub(crate) fn new(
        index: usize,
        line_number: usize,
        residue_number: i32,
        residue_name: &str,
        atom_name: &str,
        position: Point3<f64>,
        raw: &str,
    ) -> Self {
        Self {
            index,
            line_number,
            residue_number,
            residue_name: residue_name.to_string(),
            atom_name: atom_name.to_string(),
            position,
            raw: raw.to_string(),
        }
    }

    /// Position of this record among the coordinate records of its source stream.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based line number in the source stream.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn residue_number(&self) -> i32 {
        self.residue_number
    }

    pub fn residue_name(&self) -> &str {
        &self.residue_name
    }

    pub fn atom_name(&self) -> &str {
        &self.atom_name
    }

    pub fn position(&self) -> &Point3<f64> {
        &self.position
    }

    /// The source line, unmodified.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn with_residue_name(&self, residue_name: &str) -> Self {
        Self {
            residue_name: residue_name.to_string(),
            raw: crate::core::io::pdb::with_residue_name(&self.raw, residue_name),
            ..self.clone()
        }
    }
}
