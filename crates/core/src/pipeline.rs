// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable pipeline plan and step model

use serde::{Deserialize, Serialize};

/// Where the source tree is mounted inside the container.
pub const CONTAINER_SOURCE_DIR: &str = "/pipeline/source";
/// Where steps place output destined for the artifact store.
pub const CONTAINER_OUTPUT_DIR: &str = "/pipeline/output";

/// One command unit executed inside the pipeline's container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Short identifier, `owner/name`
    pub id: String,
    pub owner: String,
    pub name: String,
    /// Human-facing name used in reports and failure messages
    pub display_name: String,
    pub version: String,
    /// Working directory inside the container, relative to the source root
    pub cwd: Option<String>,
    /// Shell script body
    pub script: String,
    /// Step-local environment exported before the script runs
    pub env: Vec<(String, String)>,
    /// Per-step timeout override, in seconds
    pub timeout_secs: Option<u64>,
    /// Position in the run; disambiguates repeated steps
    index: u32,
}

impl Step {
    pub fn new(owner: &str, name: &str, version: &str, index: u32) -> Self {
        Self {
            id: format!("{}/{}", owner, name),
            owner: owner.to_string(),
            name: name.to_string(),
            display_name: name.to_string(),
            version: version.to_string(),
            cwd: None,
            script: String::new(),
            env: Vec::new(),
            timeout_secs: None,
            index,
        }
    }

    /// A synthetic step owned by the runner itself ("store", "get code",
    /// "setup environment").
    pub fn synthetic(name: &str, index: u32) -> Self {
        Self::new("wercker", name, "internal", index)
    }

    /// Stable identifier suitable as a map key. Derived from
    /// `(owner, name, version, index)`: distinct steps never collide, and
    /// the same step invoked twice in one run differs by index.
    pub fn safe_id(&self) -> String {
        format!(
            "{}/{}@{}#{}",
            self.owner, self.name, self.version, self.index
        )
    }

    /// `owner/name@version`, the form telemetry reports.
    pub fn unique_name(&self) -> String {
        format!("{}/{}@{}", self.owner, self.name, self.version)
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

/// An immutable plan: ordered steps, ordered after-steps, the target image
/// coordinate, and the base environment. Built once by a resolver and never
/// mutated.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<Step>,
    after_steps: Vec<Step>,
    box_image: String,
    repo: String,
    tag: String,
    commit_message: String,
    base_env: Vec<(String, String)>,
}

impl Pipeline {
    pub fn new(
        steps: Vec<Step>,
        after_steps: Vec<Step>,
        box_image: String,
        repo: String,
        tag: String,
        commit_message: String,
        base_env: Vec<(String, String)>,
    ) -> Self {
        Self {
            steps,
            after_steps,
            box_image,
            repo,
            tag,
            commit_message,
            base_env,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn after_steps(&self) -> &[Step] {
        &self.after_steps
    }

    /// Image the box is provisioned from, e.g. `alpine:3.20`.
    pub fn box_image(&self) -> &str {
        &self.box_image
    }

    /// Repository committed images are tagged into.
    pub fn docker_repo(&self) -> &str {
        &self.repo
    }

    pub fn docker_tag(&self) -> &str {
        &self.tag
    }

    pub fn docker_message(&self) -> &str {
        &self.commit_message
    }

    /// Base environment exported into every session of this run.
    pub fn env_exports(&self) -> &[(String, String)] {
        &self.base_env
    }

    /// Directory collected by the artifact stage.
    pub fn artifact_dir(&self) -> &'static str {
        CONTAINER_OUTPUT_DIR
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
