//! Reading and writing the fixed-width coordinate format and the text
//! reports produced by the external search and minimization tools.
//!
//! Column positions in [`pdb`] are the contract for every reader here; no
//! other structure is inferred from the files.

pub mod assembly;
pub mod blocks;
pub mod energy;
pub mod models;
pub mod pdb;
pub mod summary;
