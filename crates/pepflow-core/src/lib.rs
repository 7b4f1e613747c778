//! # pepflow
//!
//! Orchestration of a peptide-protein docking pipeline around external search,
//! protonation and minimization programs.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Immutable coordinate records, residue-block
//!   parsing, complex assembly, histidine protonation assignment and the
//!   parsers for the external tools' reports. Pure transforms only.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer: the replicate run
//!   controller, the staged minimization driver, the per-target workspace with
//!   its sealed step directories, and the subprocess adapters for the external
//!   programs.
//!
//! - **[`workflows`]: The Public API.** Complete procedures (structure
//!   preparation, docking of one target or a batch of targets) built from the
//!   two layers below.

pub mod core;
pub mod engine;
pub mod workflows;
