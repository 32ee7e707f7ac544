// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container lifecycle handle
//!
//! A box is the long-lived execution surface of one pipeline run:
//! `Absent → Provisioned → Running → Stopped → Cleaned`, with commit, push,
//! and restart available while it holds a container.

use crate::session::Session;
use thiserror::Error;
use wercker_adapters::{
    ContainerClient, ContainerConfig, ContainerError, ContainerIo, PushOptions, RegistryAuth,
};
use wercker_core::{BoxInfo, Pipeline, PipelineOptions, CONTAINER_SOURCE_DIR};

/// Lifecycle states of a box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxState {
    Absent,
    Provisioned,
    Running,
    Stopped,
    Cleaned,
}

/// Errors from box operations
#[derive(Debug, Error)]
pub enum BoxError {
    #[error("{op} is not valid while the box is {state:?}")]
    InvalidState { op: &'static str, state: BoxState },
    #[error("no image committed to push")]
    NothingCommitted,
    #[error("session already attached; restart to get a new one")]
    SessionUnavailable,
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Handle to one provisioned container.
pub struct PipelineBox<C: ContainerClient> {
    client: C,
    config: ContainerConfig,
    auth: RegistryAuth,
    container_id: Option<String>,
    committed_image: Option<String>,
    io: Option<ContainerIo>,
    state: BoxState,
}

impl<C: ContainerClient> PipelineBox<C> {
    pub fn new(client: C, options: &PipelineOptions, pipeline: &Pipeline) -> Self {
        let config = ContainerConfig {
            image: pipeline.box_image().to_string(),
            name: format!("wercker-{}", options.run_id()),
            env: Vec::new(),
            cmd: vec!["/bin/sh".to_string()],
            working_dir: Some(CONTAINER_SOURCE_DIR.to_string()),
            volumes: vec![(
                options.working_dir.join("source"),
                CONTAINER_SOURCE_DIR.to_string(),
            )],
        };
        let auth = if options.auth_token.is_empty() {
            RegistryAuth::anonymous()
        } else {
            RegistryAuth {
                username: options.auth_token.clone(),
                password: options.auth_token.clone(),
                server_address: options.registry.clone(),
            }
        };
        Self {
            client,
            config,
            auth,
            container_id: None,
            committed_image: None,
            io: None,
            state: BoxState::Absent,
        }
    }

    pub fn state(&self) -> BoxState {
        self.state
    }

    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    pub fn has_commit(&self) -> bool {
        self.committed_image.is_some()
    }

    /// Snapshot for event payloads.
    pub fn info(&self) -> BoxInfo {
        let (name, tag) = split_image_ref(&self.config.image);
        BoxInfo {
            name,
            tag,
            container_id: self.container_id.clone(),
        }
    }

    /// Pull the image if absent and create the container. Idempotent once
    /// provisioned.
    pub async fn provision(&mut self) -> Result<(), BoxError> {
        match self.state {
            BoxState::Absent => {}
            BoxState::Cleaned => {
                return Err(BoxError::InvalidState {
                    op: "provision",
                    state: self.state,
                })
            }
            _ => return Ok(()),
        }

        if !self.client.image_exists(&self.config.image).await? {
            tracing::info!(image = %self.config.image, "pulling image");
            self.client.pull_image(&self.config.image, &self.auth).await?;
        }
        let id = self.client.create_container(&self.config).await?;
        tracing::debug!(container_id = %id, "container created");
        self.container_id = Some(id);
        self.state = BoxState::Provisioned;
        Ok(())
    }

    /// Start the container and attach its stdio. Returns the container id.
    pub async fn run(&mut self) -> Result<String, BoxError> {
        if self.state != BoxState::Provisioned {
            return Err(BoxError::InvalidState {
                op: "run",
                state: self.state,
            });
        }
        let id = self.require_container("run")?.to_string();
        self.io = Some(self.client.attach(&id).await?);
        self.state = BoxState::Running;
        Ok(id)
    }

    /// Hand out the command channel attached by `run` or `restart`. A box
    /// carries at most one live session; restart to get a fresh one.
    pub fn new_session(&mut self) -> Result<Session, BoxError> {
        if self.state != BoxState::Running {
            return Err(BoxError::InvalidState {
                op: "new_session",
                state: self.state,
            });
        }
        self.io
            .take()
            .map(Session::new)
            .ok_or(BoxError::SessionUnavailable)
    }

    /// Snapshot the container as an image. Repeatable; later commits
    /// overwrite the reference the push will use.
    pub async fn commit(
        &mut self,
        repo: &str,
        tag: &str,
        message: &str,
    ) -> Result<String, BoxError> {
        if !matches!(self.state, BoxState::Running | BoxState::Stopped) {
            return Err(BoxError::InvalidState {
                op: "commit",
                state: self.state,
            });
        }
        let id = self.require_container("commit")?.to_string();
        let image_id = self.client.commit(&id, repo, tag, message).await?;
        self.committed_image = Some(format!("{}:{}", repo, tag));
        Ok(image_id)
    }

    /// Push the last committed image. Requires a prior commit.
    pub async fn push(
        &mut self,
        opts: &PushOptions,
        auth: &RegistryAuth,
    ) -> Result<String, BoxError> {
        if self.committed_image.is_none() {
            return Err(BoxError::NothingCommitted);
        }
        Ok(self.client.push(opts, auth).await?)
    }

    /// Stop and re-create the container, from the last committed image when
    /// one exists. Invalidates any session handed out before.
    pub async fn restart(&mut self) -> Result<String, BoxError> {
        if matches!(self.state, BoxState::Absent | BoxState::Cleaned) {
            return Err(BoxError::InvalidState {
                op: "restart",
                state: self.state,
            });
        }
        if self.state == BoxState::Running {
            let id = self.require_container("restart")?.to_string();
            self.client.stop(&id).await?;
        }
        if let Some(id) = self.container_id.take() {
            self.client.remove_container(&id).await?;
        }
        self.io = None;

        let mut config = self.config.clone();
        if let Some(image) = &self.committed_image {
            config.image = image.clone();
        }
        let id = self.client.create_container(&config).await?;
        self.io = Some(self.client.attach(&id).await?);
        self.container_id = Some(id.clone());
        self.state = BoxState::Running;
        Ok(id)
    }

    /// Stop the container but preserve it for commit and inspection.
    pub async fn stop(&mut self) -> Result<(), BoxError> {
        match self.state {
            BoxState::Cleaned => Err(BoxError::InvalidState {
                op: "stop",
                state: self.state,
            }),
            BoxState::Running => {
                let id = self.require_container("stop")?.to_string();
                self.client.stop(&id).await?;
                self.io = None;
                self.state = BoxState::Stopped;
                Ok(())
            }
            // Nothing running; stopping is a no-op for cleanup paths.
            _ => {
                self.io = None;
                if self.state == BoxState::Provisioned {
                    self.state = BoxState::Stopped;
                }
                Ok(())
            }
        }
    }

    /// Remove the container. After this no handle operation succeeds.
    pub async fn clean(&mut self) -> Result<(), BoxError> {
        if matches!(self.state, BoxState::Running | BoxState::Cleaned) {
            return Err(BoxError::InvalidState {
                op: "clean",
                state: self.state,
            });
        }
        if let Some(id) = self.container_id.take() {
            self.client.remove_container(&id).await?;
        }
        self.state = BoxState::Cleaned;
        Ok(())
    }

    /// Export a path from the container as a tar stream.
    pub async fn export_path(&self, path: &str) -> Result<Vec<u8>, BoxError> {
        if !matches!(self.state, BoxState::Running | BoxState::Stopped) {
            return Err(BoxError::InvalidState {
                op: "export_path",
                state: self.state,
            });
        }
        let id = self.require_container("export_path")?;
        Ok(self.client.export_path(id, path).await?)
    }

    fn require_container(&self, op: &'static str) -> Result<&str, BoxError> {
        self.container_id
            .as_deref()
            .ok_or(BoxError::InvalidState {
                op,
                state: self.state,
            })
    }
}

fn split_image_ref(image: &str) -> (String, String) {
    // The tag is whatever follows the last ':' unless that ':' belongs to a
    // registry host:port prefix.
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name.to_string(), tag.to_string()),
        _ => (image.to_string(), "latest".to_string()),
    }
}

#[cfg(test)]
#[path = "boxes_tests.rs"]
mod tests;
