//! Developer harness for the restore orchestrator
//!
//! Wires the workflow to the in-memory collaborators so requests can be
//! planned and run from the command line.

pub mod cli;
pub mod driver;
pub mod settings;
