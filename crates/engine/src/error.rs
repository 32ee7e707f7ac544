// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner errors and the debug/release termination policy

use thiserror::Error;
use wercker_core::{ConfigError, OptionsError};

/// Errors that terminate a pipeline run
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid options: {0}")]
    Options(#[from] OptionsError),
    #[error("environment setup failed: {0}")]
    Environment(String),
    #[error("step failed: {0}")]
    StepFailed(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl RunnerError {
    /// Process exit code for this failure: configuration problems exit 2,
    /// everything else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::Config(_) | RunnerError::Options(_) => 2,
            _ => 1,
        }
    }
}

/// Converts fatal errors into either a stack-trace panic (debug) or an
/// error-level log plus a normalized return (release). Scoped cleanup runs
/// in both modes because the panic is recovered at the task boundary.
pub struct SoftExit {
    debug: bool,
}

impl SoftExit {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn exit(&self, error: RunnerError) -> RunnerError {
        if self.debug {
            panic!("{}", error);
        }
        tracing::error!(error = %error, "terminating run");
        error
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
