// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline options resolved from CLI flags and the environment
//!
//! Identifiers are threaded through this record explicitly; nothing in the
//! runner mutates the host process environment.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from option validation
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("a run carries either a build id or a deploy id, not both")]
    ConflictingRunIds,
    #[error("a run requires a build id or a deploy id")]
    MissingRunId,
    #[error("step timeout must be greater than zero")]
    ZeroTimeout,
}

/// Whether a run is a build or a deploy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Build,
    Deploy,
}

impl std::fmt::Display for RunKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunKind::Build => write!(f, "build"),
            RunKind::Deploy => write!(f, "deploy"),
        }
    }
}

/// Everything one pipeline run needs to know about its surroundings
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Correlation id for a build run; empty for deploys
    pub build_id: String,
    /// Correlation id for a deploy run; empty for builds
    pub deploy_id: String,

    /// Commit the box image after each successful step and after the loop
    pub should_commit: bool,
    /// Enter the store phase and push the committed image
    pub should_push: bool,
    /// Enter the store phase and upload the output artifact on success
    pub should_artifacts: bool,
    /// Remove the container after it is stopped
    pub should_remove: bool,

    /// Destination registry for push/pull
    pub registry: String,
    /// Registry credential; empty means anonymous
    pub auth_token: String,

    pub application_id: String,
    pub application_name: String,
    pub application_owner_name: String,
    pub application_started_by_name: String,

    /// Collaborator service endpoint, passed through to handlers
    pub wercker_endpoint: String,
    /// API base URL, passed through to out-of-scope commands
    pub base_url: String,

    /// Tag for committed images
    pub tag: String,
    /// Project source tree on the host
    pub source_dir: PathBuf,
    /// Scratch directory for the run
    pub working_dir: PathBuf,
    /// Per-step execution timeout
    pub step_timeout: Duration,
    /// Raise with a stack trace on fatal errors instead of logging
    pub debug: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            build_id: String::new(),
            deploy_id: String::new(),
            should_commit: false,
            should_push: false,
            should_artifacts: false,
            should_remove: true,
            registry: String::new(),
            auth_token: String::new(),
            application_id: String::new(),
            application_name: String::new(),
            application_owner_name: String::new(),
            application_started_by_name: String::new(),
            wercker_endpoint: "https://app.wercker.com".to_string(),
            base_url: "https://app.wercker.com".to_string(),
            tag: "latest".to_string(),
            source_dir: PathBuf::from("."),
            working_dir: PathBuf::from(".wercker"),
            step_timeout: Duration::from_secs(600),
            debug: false,
        }
    }
}

impl PipelineOptions {
    /// Options for a build run. Generates a v4 UUID when no id is supplied.
    pub fn for_build(id: Option<String>) -> Self {
        Self {
            build_id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            ..Self::default()
        }
    }

    /// Options for a deploy run. Generates a v4 UUID when no id is supplied.
    pub fn for_deploy(id: Option<String>) -> Self {
        Self {
            deploy_id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            ..Self::default()
        }
    }

    /// The correlation id for this run, whichever kind it is.
    pub fn run_id(&self) -> &str {
        if !self.build_id.is_empty() {
            &self.build_id
        } else {
            &self.deploy_id
        }
    }

    /// Build or deploy. `None` when neither id is set, which callers treat
    /// as an internal invariant violation.
    pub fn run_kind(&self) -> Option<RunKind> {
        if !self.build_id.is_empty() {
            Some(RunKind::Build)
        } else if !self.deploy_id.is_empty() {
            Some(RunKind::Deploy)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if !self.build_id.is_empty() && !self.deploy_id.is_empty() {
            return Err(OptionsError::ConflictingRunIds);
        }
        if self.build_id.is_empty() && self.deploy_id.is_empty() {
            return Err(OptionsError::MissingRunId);
        }
        if self.step_timeout.is_zero() {
            return Err(OptionsError::ZeroTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
