//! Residue-local histidine protonation assignment.
//!
//! The external protonation tool places hydrogens but leaves every histidine
//! labelled `HIS`. This module reads which imidazole nitrogens carry a
//! hydrogen in each residue block and relabels the block as `HID`, `HIE` or
//! `HIP`. The decision only looks at atom names inside one residue, so it can
//! run unchanged on a receptor, a peptide, or a merged complex.

pub mod assigner;
pub mod rules;
