// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One command unit: export env, run the script, collect the result

use crate::session::{Session, SessionError};
use std::time::Duration;
use wercker_core::{Step, StepResult, StreamKind};

/// Execute a step over a live session. Exports the step-local environment,
/// runs the script (prefixed with a `cd` when the step has a working
/// directory), streams every output line into `sink`, and maps the exit code
/// into a result. Environment mutations persist on the session for
/// subsequent steps.
pub async fn execute_step(
    session: &mut Session,
    step: &Step,
    timeout: Duration,
    sink: &mut (dyn FnMut(StreamKind, &str) + Send),
) -> StepResult {
    if session.export_environment(&step.env).await.is_err() {
        return StepResult::failed("unable to export step environment", -1);
    }

    let script = match &step.cwd {
        Some(dir) => format!("cd '{}'\n{}", dir.replace('\'', "'\\''"), step.script),
        None => step.script.clone(),
    };

    let mut last_line = String::new();
    let outcome = {
        let mut tapped = |stream: StreamKind, line: &str| {
            if !line.trim().is_empty() {
                last_line = line.trim().to_string();
            }
            sink(stream, line);
        };
        session.run_command(&script, timeout, &mut tapped).await
    };

    match outcome {
        Ok(0) => StepResult::passed(),
        Ok(exit_code) => {
            // The last thing the step said is usually the reason it died
            let message = if last_line.is_empty() {
                format!("exit code {}", exit_code)
            } else {
                last_line
            };
            StepResult::failed(message, exit_code)
        }
        Err(SessionError::TimedOut) => StepResult::failed("timed out", -1),
        Err(SessionError::Closed) => StepResult::failed("session closed", -1),
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
