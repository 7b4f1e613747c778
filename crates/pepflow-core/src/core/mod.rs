//! # Core Module
//!
//! Stateless building blocks of the docking pipeline: immutable coordinate
//! records and residue blocks, the parsers and writers around them, and the
//! histidine protonation assigner.
//!
//! - **Models** ([`models`]) - `AtomRecord`, `ResidueBlock`, `Complex`, `EnergyVector`.
//! - **File I/O** ([`io`]) - Residue block parsing, complex assembly and splitting,
//!   multi-pose extraction, and the search/minimization report parsers.
//! - **Protonation** ([`protonation`]) - Residue-local HID/HIE/HIP assignment.
//! - **Utilities** ([`utils`]) - Coordinate drift between poses.
//!
//! Nothing in this module touches the file system beyond the readers it is
//! handed, and nothing here launches external processes.

pub mod io;
pub mod models;
pub mod protonation;
pub mod utils;
