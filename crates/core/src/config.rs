// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline configuration (`wercker.toml`) parsing and resolution

use crate::options::PipelineOptions;
use crate::pipeline::{Pipeline, Step, CONTAINER_OUTPUT_DIR, CONTAINER_SOURCE_DIR};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading or resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A step as declared in configuration, before indices are assigned.
#[derive(Debug, Clone, Default)]
pub struct StepDef {
    pub name: String,
    pub owner: String,
    pub version: String,
    pub script: String,
    pub cwd: Option<String>,
    pub env: Vec<(String, String)>,
    pub timeout_secs: Option<u64>,
}

/// Steps and after-steps for one pipeline kind.
#[derive(Debug, Clone, Default)]
pub struct PhaseConfig {
    pub steps: Vec<StepDef>,
    pub after_steps: Vec<StepDef>,
}

/// Target image coordinate for commit/push.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub repo: Option<String>,
    pub tag: Option<String>,
    pub message: Option<String>,
}

/// A parsed `wercker.toml`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Image the box is provisioned from
    pub image: String,
    /// Environment exported into every session
    pub env: Vec<(String, String)>,
    pub target: Target,
    pub build: PhaseConfig,
    pub deploy: PhaseConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        parse_config(&std::fs::read_to_string(path)?)
    }
}

/// Parse a configuration from TOML content.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let raw: toml::Value = toml::from_str(content)?;
    let table = raw
        .as_table()
        .ok_or_else(|| ConfigError::InvalidFormat("root must be a table".to_string()))?;

    let image = table
        .get("image")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ConfigError::MissingField("image".to_string()))?
        .to_string();

    let mut config = Config {
        image,
        ..Config::default()
    };

    if let Some(env) = table.get("env").and_then(|v| v.as_table()) {
        config.env = parse_env(env);
    }

    if let Some(target) = table.get("target").and_then(|v| v.as_table()) {
        config.target = Target {
            repo: target.get("repo").and_then(|v| v.as_str()).map(String::from),
            tag: target.get("tag").and_then(|v| v.as_str()).map(String::from),
            message: target
                .get("message")
                .and_then(|v| v.as_str())
                .map(String::from),
        };
    }

    if let Some(build) = table.get("build").and_then(|v| v.as_table()) {
        config.build = parse_phase(build)?;
    }
    if let Some(deploy) = table.get("deploy").and_then(|v| v.as_table()) {
        config.deploy = parse_phase(deploy)?;
    }

    Ok(config)
}

fn parse_phase(table: &toml::value::Table) -> Result<PhaseConfig, ConfigError> {
    let mut phase = PhaseConfig::default();
    if let Some(steps) = table.get("step").and_then(|v| v.as_array()) {
        for value in steps {
            phase.steps.push(parse_step(value)?);
        }
    }
    if let Some(steps) = table.get("after-step").and_then(|v| v.as_array()) {
        for value in steps {
            phase.after_steps.push(parse_step(value)?);
        }
    }
    Ok(phase)
}

fn parse_step(value: &toml::Value) -> Result<StepDef, ConfigError> {
    let table = value
        .as_table()
        .ok_or_else(|| ConfigError::InvalidFormat("step must be a table".to_string()))?;

    let name = table
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ConfigError::MissingField("step.name".to_string()))?
        .to_string();
    let script = table
        .get("script")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ConfigError::MissingField(format!("step.{}.script", name)))?
        .to_string();

    Ok(StepDef {
        name,
        owner: table
            .get("owner")
            .and_then(|v| v.as_str())
            .unwrap_or("local")
            .to_string(),
        version: table
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or("0.0.0")
            .to_string(),
        script,
        cwd: table.get("cwd").and_then(|v| v.as_str()).map(String::from),
        env: table
            .get("env")
            .and_then(|v| v.as_table())
            .map(parse_env)
            .unwrap_or_default(),
        timeout_secs: table
            .get("timeout")
            .and_then(|v| v.as_integer())
            .and_then(|t| u64::try_from(t).ok()),
    })
}

fn parse_env(table: &toml::value::Table) -> Vec<(String, String)> {
    table
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

/// Resolver signature the runner consumes.
pub type GetPipeline = fn(&Config, &PipelineOptions) -> Result<Pipeline, ConfigError>;

/// Resolve the build pipeline from configuration. An empty step list is a
/// valid (if vacuous) plan.
pub fn get_build_pipeline(
    config: &Config,
    options: &PipelineOptions,
) -> Result<Pipeline, ConfigError> {
    Ok(resolve(config, &config.build, options))
}

/// Resolve the deploy pipeline from configuration.
pub fn get_deploy_pipeline(
    config: &Config,
    options: &PipelineOptions,
) -> Result<Pipeline, ConfigError> {
    Ok(resolve(config, &config.deploy, options))
}

fn resolve(config: &Config, phase: &PhaseConfig, options: &PipelineOptions) -> Pipeline {
    // User steps take orders 3.., the store step follows them, after-steps
    // follow the store step. Indices mirror that numbering so safe ids line
    // up with the event stream.
    let mut index = 3u32;
    let mut steps = Vec::with_capacity(phase.steps.len());
    for def in &phase.steps {
        steps.push(materialize(def, index));
        index += 1;
    }
    index += 1; // the store step's slot
    let mut after_steps = Vec::with_capacity(phase.after_steps.len());
    for def in &phase.after_steps {
        after_steps.push(materialize(def, index));
        index += 1;
    }

    let repo = config.target.repo.clone().unwrap_or_else(|| {
        format!(
            "{}/{}",
            options.application_owner_name, options.application_name
        )
    });
    let tag = config
        .target
        .tag
        .clone()
        .unwrap_or_else(|| options.tag.clone());
    let message = config
        .target
        .message
        .clone()
        .unwrap_or_else(|| format!("wercker {}", options.run_id()));

    Pipeline::new(
        steps,
        after_steps,
        config.image.clone(),
        repo,
        tag,
        message,
        base_env(config, options),
    )
}

fn materialize(def: &StepDef, index: u32) -> Step {
    let mut step = Step::new(&def.owner, &def.name, &def.version, index);
    step.script = def.script.clone();
    step.cwd = def.cwd.clone();
    step.env = def.env.clone();
    step.timeout_secs = def.timeout_secs;
    step
}

fn base_env(config: &Config, options: &PipelineOptions) -> Vec<(String, String)> {
    let mut env = vec![
        ("WERCKER".to_string(), "true".to_string()),
        ("WERCKER_ROOT".to_string(), CONTAINER_SOURCE_DIR.to_string()),
        (
            "WERCKER_OUTPUT_DIR".to_string(),
            CONTAINER_OUTPUT_DIR.to_string(),
        ),
        (
            "WERCKER_APPLICATION_ID".to_string(),
            options.application_id.clone(),
        ),
        (
            "WERCKER_APPLICATION_NAME".to_string(),
            options.application_name.clone(),
        ),
        (
            "WERCKER_APPLICATION_OWNER_NAME".to_string(),
            options.application_owner_name.clone(),
        ),
        (
            "WERCKER_STARTED_BY".to_string(),
            options.application_started_by_name.clone(),
        ),
    ];
    if !options.build_id.is_empty() {
        env.push(("WERCKER_BUILD_ID".to_string(), options.build_id.clone()));
    }
    if !options.deploy_id.is_empty() {
        env.push(("WERCKER_DEPLOY_ID".to_string(), options.deploy_id.clone()));
    }
    env.extend(config.env.iter().cloned());
    env
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
