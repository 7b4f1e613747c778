//! # Workflows Module
//!
//! High-level entry points that tie the `core` transforms and the `engine`
//! orchestration together.
//!
//! - **Preparation** ([`prepare`]) - Assemble receptor and peptide, protonate
//!   the complex with the external tool, split it again and assign histidine
//!   states for each role.
//! - **Docking** ([`dock`]) - Search replicates with reference propagation,
//!   contact refinement and staged minimization of the top poses for one
//!   target, or for many independent targets in parallel.

pub mod dock;
pub mod prepare;
