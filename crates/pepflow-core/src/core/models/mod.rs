//! # Core Models Module
//!
//! Plain data carried between the parsers, the protonation assigner and the
//! orchestration engine.
//!
//! - [`atom`] - A single immutable coordinate record.
//! - [`residue`] - Records grouped by residue sequence number.
//! - [`complex`] - Receptor and ligand merged for writing as one file.
//! - [`energy`] - The energy vector reported for a minimization stage.

pub mod atom;
pub mod complex;
pub mod energy;
pub mod residue;
