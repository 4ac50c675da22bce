//! Prerequisite resolution and execution planning for implication suites.
//!
//! Implications declare which system status their test produces and what it
//! requires. This crate builds the prerequisite chain for a target status,
//! evaluates whether the persisted run data is ready, and can auto-execute
//! the missing prerequisites in order. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (graph, paths, chains, readiness).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (input files, snapshots, process
//!   execution, prompts). Isolated to enable mocking in tests.
//!
//! Orchestration modules ([`analyze`], [`execute`], [`report`]) coordinate
//! core logic with I/O to implement CLI commands.

pub mod analyze;
pub mod core;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
