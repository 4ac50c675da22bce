//! Pure, deterministic planner logic.
//!
//! Nothing in this module performs I/O; everything is testable in isolation
//! and must stay deterministic across runs.

pub mod chain;
pub mod graph;
pub mod pathfind;
pub mod platform;
pub mod readiness;
pub mod registry;
pub mod types;
