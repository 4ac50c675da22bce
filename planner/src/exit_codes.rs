//! Stable exit codes for planner CLI commands.

/// Command succeeded; for `run`, the target is ready.
pub const OK: i32 = 0;
/// Command failed due to invalid inputs, config, or other errors.
pub const INVALID: i32 = 1;
/// `ready` found incomplete prerequisites or missing fields.
pub const NOT_READY: i32 = 2;
/// `run` stopped on prerequisites owned by another platform family.
pub const BLOCKED: i32 = 3;
/// `run` executed a step without advancing the chain.
pub const STALLED: i32 = 4;
