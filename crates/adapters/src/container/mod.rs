// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime adapter

mod docker;
#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use docker::DockerCli;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ContainerCall, FakeContainerClient, ScriptedStep};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use wercker_core::StreamKind;

/// Marker the session appends after every command so the exit code can be
/// read back out of the output stream.
pub const EXIT_MARKER: &str = "WERCKER_CMD_EXIT";

/// Errors from container operations
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("docker not found in PATH")]
    DaemonUnavailable,
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("path not found in container: {0}")]
    PathNotFound(String),
    #[error("registry rejected push: {0}")]
    Registry(String),
    #[error("failed to attach: {0}")]
    AttachFailed(String),
    #[error("command failed: {cmd} - {stderr}")]
    CommandFailed { cmd: String, stderr: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to create a container from.
#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    pub image: String,
    pub name: String,
    pub env: Vec<(String, String)>,
    /// Entrypoint command; the engine runs a shell it can drive over stdin
    pub cmd: Vec<String>,
    pub working_dir: Option<String>,
    /// host path → container path mounts
    pub volumes: Vec<(PathBuf, String)>,
}

/// Registry credentials. An empty username means anonymous.
#[derive(Debug, Clone, Default)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
    pub server_address: String,
}

impl RegistryAuth {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }
}

/// Destination for a push.
#[derive(Debug, Clone)]
pub struct PushOptions {
    pub registry: String,
    pub repo: String,
    pub tag: String,
    pub message: String,
}

impl PushOptions {
    /// Full image reference, registry-prefixed when one is configured.
    pub fn image_ref(&self) -> String {
        if self.registry.is_empty() {
            format!("{}:{}", self.repo, self.tag)
        } else {
            format!("{}/{}:{}", self.registry, self.repo, self.tag)
        }
    }
}

/// One chunk of attached container output.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    pub stream: StreamKind,
    pub data: Vec<u8>,
}

/// The attached stdio of a running container. Writing to `stdin` reaches the
/// container's shell; `output` yields tagged stdout/stderr chunks until the
/// container closes its streams.
pub struct ContainerIo {
    pub stdin: mpsc::Sender<Vec<u8>>,
    pub output: mpsc::Receiver<OutputChunk>,
}

/// Adapter for the container runtime
#[async_trait]
pub trait ContainerClient: Clone + Send + Sync + 'static {
    /// Check whether an image is present locally
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError>;

    /// Pull an image from a registry
    async fn pull_image(&self, image: &str, auth: &RegistryAuth) -> Result<(), ContainerError>;

    /// Create a container; returns the container id
    async fn create_container(&self, config: &ContainerConfig) -> Result<String, ContainerError>;

    /// Start a created container and attach its stdio
    async fn attach(&self, container_id: &str) -> Result<ContainerIo, ContainerError>;

    /// Snapshot a container as an image; returns the image id
    async fn commit(
        &self,
        container_id: &str,
        repo: &str,
        tag: &str,
        message: &str,
    ) -> Result<String, ContainerError>;

    /// Push an image to a registry; returns the digest
    async fn push(&self, opts: &PushOptions, auth: &RegistryAuth) -> Result<String, ContainerError>;

    /// Stop a running container, preserving its state
    async fn stop(&self, container_id: &str) -> Result<(), ContainerError>;

    /// Remove a container
    async fn remove_container(&self, container_id: &str) -> Result<(), ContainerError>;

    /// Remove an image
    async fn remove_image(&self, image: &str) -> Result<(), ContainerError>;

    /// Export a path from the container as a tar stream
    async fn export_path(&self, container_id: &str, path: &str)
        -> Result<Vec<u8>, ContainerError>;
}
