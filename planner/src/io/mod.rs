//! Side-effecting layers: input files, snapshots, processes, and prompts.

pub mod actions;
pub mod config;
pub mod discovery;
pub mod process;
pub mod prompt;
pub mod registry_store;
pub mod snapshot;
