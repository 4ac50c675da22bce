//! Interactive path selection with a countdown fallback.
//!
//! When several candidate paths reach the target the planner asks the
//! operator to pick one on stderr, counts down once per second, and falls
//! back to the top-ranked path when the timeout expires. Non-interactive runs
//! skip the prompt entirely.

use std::io::{BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::PathCandidate;

/// Ask the operator to choose among ranked candidates.
///
/// Returns the index into `candidates`. Zero or one candidate short-circuits
/// to index 0 without prompting.
pub fn choose_path(candidates: &[PathCandidate], timeout: Duration) -> Result<usize> {
    if candidates.len() <= 1 {
        return Ok(0);
    }

    let mut err = std::io::stderr().lock();
    writeln!(err, "Multiple paths reach the target:").context("write prompt")?;
    for (idx, candidate) in candidates.iter().enumerate() {
        let statuses: Vec<&str> = candidate.steps.iter().map(|s| s.status.as_str()).collect();
        let marker = if candidate.has_cross_platform {
            " (cross-platform)"
        } else {
            ""
        };
        writeln!(
            err,
            "  [{idx}] {} (score {}){marker}",
            statuses.join(" -> "),
            candidate.score
        )
        .context("write prompt")?;
    }
    writeln!(
        err,
        "Select a path [0-{}], default 0:",
        candidates.len() - 1
    )
    .context("write prompt")?;

    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_ok() {
            // The receiver may be gone after a timeout; ignore send failures.
            let _ = tx.send(line);
        }
    });

    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            writeln!(err, "No selection, using path 0.").context("write prompt")?;
            debug!("path prompt timed out, defaulting to 0");
            return Ok(0);
        }
        let tick = remaining.min(Duration::from_secs(1));
        match rx.recv_timeout(tick) {
            Ok(line) => {
                let choice = parse_selection(&line, candidates.len());
                debug!(choice, "path selected");
                return Ok(choice);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let secs = deadline.saturating_duration_since(Instant::now()).as_secs();
                if secs > 0 {
                    write!(err, "\r{secs}s... ").context("write countdown")?;
                    err.flush().context("flush countdown")?;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // stdin closed (piped input exhausted), take the default.
                debug!("stdin closed during path prompt, defaulting to 0");
                return Ok(0);
            }
        }
    }
}

/// Parse a typed selection; anything unusable means the default, index 0.
fn parse_selection(line: &str, len: usize) -> usize {
    match line.trim().parse::<usize>() {
        Ok(idx) if idx < len => idx,
        _ => 0,
    }
}
