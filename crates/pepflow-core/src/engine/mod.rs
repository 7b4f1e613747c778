//! # Engine Module
//!
//! The stateful layer that drives the external search and minimization tools
//! for one docking target at a time.
//!
//! ## Overview
//!
//! A target's run is a strict chain of long-running subprocess calls: each
//! replicate uses the previous replicate's top pose as reference, and each
//! minimization stage consumes the previous stage's output. The engine
//! sequences those calls, persists every finished step in the target's
//! working directory, and decides what runs next.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Target, search and minimization settings with validation
//! - **Replicate Controller** ([`replicate`]) - Replicate sequencing, reference propagation and selection
//! - **Minimization Driver** ([`minimization`]) - Staged refinement with a convergence heuristic
//! - **Workspace** ([`workspace`]) - Target lock, sealed step directories and the run ledger
//! - **Tools** ([`tools`]) - Traits and subprocess adapters for the external programs
//! - **State** ([`state`]) - Results recorded by the controller and the driver
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Cancellation** ([`cancel`]) - Shared cancellation flag
//! - **Error Handling** ([`error`]) - Engine error taxonomy with step context

pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod minimization;
pub mod progress;
pub mod replicate;
pub mod state;
pub mod tools;
pub mod workspace;
