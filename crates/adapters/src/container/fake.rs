// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake container client for testing

use super::{
    ContainerClient, ContainerConfig, ContainerError, ContainerIo, OutputChunk, PushOptions,
    RegistryAuth, EXIT_MARKER,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use wercker_core::StreamKind;

/// Recorded container call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerCall {
    ImageExists { image: String },
    PullImage { image: String },
    Create { image: String, name: String },
    Attach { container_id: String },
    Commit { container_id: String, repo: String, tag: String, message: String },
    Push { registry: String, repo: String, tag: String },
    Stop { container_id: String },
    RemoveContainer { container_id: String },
    RemoveImage { image: String },
    ExportPath { container_id: String, path: String },
}

/// One scripted command reply for the emulated shell
#[derive(Debug, Clone)]
pub struct ScriptedStep {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// Never reply; the command appears to run forever
    pub hang: bool,
}

impl ScriptedStep {
    pub fn passing() -> Self {
        Self {
            exit_code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            hang: false,
        }
    }

    pub fn exiting(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::passing()
        }
    }

    pub fn with_stdout(mut self, lines: &[&str]) -> Self {
        self.stdout = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_stderr(mut self, lines: &[&str]) -> Self {
        self.stderr = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::passing()
        }
    }
}

#[derive(Default)]
struct FakeState {
    calls: Vec<ContainerCall>,
    containers: HashMap<String, String>, // id → image
    scripted: VecDeque<ScriptedStep>,
    exports: HashMap<String, Vec<u8>>, // container path → tar bytes
    push_failure: Option<String>,
    pull_failure: Option<String>,
    next_id: u64,
}

/// Fake container client. Records every call and emulates just enough of a
/// shell to answer the session's exit-marker protocol from a scripted queue.
#[derive(Clone, Default)]
pub struct FakeContainerClient {
    state: Arc<Mutex<FakeState>>,
}

impl FakeContainerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the reply for the next command the shell sees
    pub fn script_step(&self, step: ScriptedStep) {
        self.lock().scripted.push_back(step);
    }

    /// Make the next push fail with a registry error
    pub fn fail_push(&self, message: &str) {
        self.lock().push_failure = Some(message.to_string());
    }

    /// Make the next pull fail
    pub fn fail_pull(&self, message: &str) {
        self.lock().pull_failure = Some(message.to_string());
    }

    /// Provide tar bytes for an exported path
    pub fn set_export(&self, path: &str, data: Vec<u8>) {
        self.lock().exports.insert(path.to_string(), data);
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<ContainerCall> {
        self.lock().calls.clone()
    }

    /// Recorded commits as (repo, tag, message)
    pub fn commits(&self) -> Vec<(String, String, String)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ContainerCall::Commit { repo, tag, message, .. } => {
                    Some((repo.clone(), tag.clone(), message.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: ContainerCall) {
        self.lock().calls.push(call);
    }
}

/// Reads command lines off stdin and answers exit-marker echoes from the
/// scripted queue. `export` lines and script bodies produce no output, the
/// way a quiet shell would behave.
async fn shell_loop(
    state: Arc<Mutex<FakeState>>,
    mut stdin: mpsc::Receiver<Vec<u8>>,
    output: mpsc::Sender<OutputChunk>,
) {
    let mut buffer = String::new();
    while let Some(bytes) = stdin.recv().await {
        buffer.push_str(&String::from_utf8_lossy(&bytes));
        while let Some(newline) = buffer.find('\n') {
            let line: String = buffer.drain(..=newline).collect();
            let line = line.trim();

            let marker_echo = format!("echo \"{} ", EXIT_MARKER);
            if let Some(rest) = line.strip_prefix(&marker_echo) {
                // rest is: <token> $?"
                let token = rest.split_whitespace().next().unwrap_or_default().to_string();
                let step = {
                    let mut st = state.lock().unwrap_or_else(|e| e.into_inner());
                    st.scripted.pop_front().unwrap_or_else(ScriptedStep::passing)
                };
                if step.hang {
                    continue;
                }
                for line in &step.stdout {
                    let chunk = OutputChunk {
                        stream: StreamKind::Stdout,
                        data: format!("{}\n", line).into_bytes(),
                    };
                    if output.send(chunk).await.is_err() {
                        return;
                    }
                }
                for line in &step.stderr {
                    let chunk = OutputChunk {
                        stream: StreamKind::Stderr,
                        data: format!("{}\n", line).into_bytes(),
                    };
                    if output.send(chunk).await.is_err() {
                        return;
                    }
                }
                let reply = OutputChunk {
                    stream: StreamKind::Stdout,
                    data: format!("{} {} {}\n", EXIT_MARKER, token, step.exit_code).into_bytes(),
                };
                if output.send(reply).await.is_err() {
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl ContainerClient for FakeContainerClient {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError> {
        self.record(ContainerCall::ImageExists {
            image: image.to_string(),
        });
        Ok(false)
    }

    async fn pull_image(&self, image: &str, _auth: &RegistryAuth) -> Result<(), ContainerError> {
        self.record(ContainerCall::PullImage {
            image: image.to_string(),
        });
        if let Some(message) = self.lock().pull_failure.take() {
            return Err(ContainerError::CommandFailed {
                cmd: format!("docker pull {}", image),
                stderr: message,
            });
        }
        Ok(())
    }

    async fn create_container(&self, config: &ContainerConfig) -> Result<String, ContainerError> {
        let id = {
            let mut st = self.lock();
            st.next_id += 1;
            let id = format!("fake-container-{}", st.next_id);
            st.containers.insert(id.clone(), config.image.clone());
            id
        };
        self.record(ContainerCall::Create {
            image: config.image.clone(),
            name: config.name.clone(),
        });
        Ok(id)
    }

    async fn attach(&self, container_id: &str) -> Result<ContainerIo, ContainerError> {
        self.record(ContainerCall::Attach {
            container_id: container_id.to_string(),
        });
        if !self.lock().containers.contains_key(container_id) {
            return Err(ContainerError::NotFound(container_id.to_string()));
        }
        let (in_tx, in_rx) = mpsc::channel::<Vec<u8>>(16);
        let (out_tx, out_rx) = mpsc::channel::<OutputChunk>(256);
        tokio::spawn(shell_loop(Arc::clone(&self.state), in_rx, out_tx));
        Ok(ContainerIo {
            stdin: in_tx,
            output: out_rx,
        })
    }

    async fn commit(
        &self,
        container_id: &str,
        repo: &str,
        tag: &str,
        message: &str,
    ) -> Result<String, ContainerError> {
        self.record(ContainerCall::Commit {
            container_id: container_id.to_string(),
            repo: repo.to_string(),
            tag: tag.to_string(),
            message: message.to_string(),
        });
        Ok(format!("sha256:fake-{}-{}", repo.replace('/', "-"), tag))
    }

    async fn push(
        &self,
        opts: &PushOptions,
        _auth: &RegistryAuth,
    ) -> Result<String, ContainerError> {
        self.record(ContainerCall::Push {
            registry: opts.registry.clone(),
            repo: opts.repo.clone(),
            tag: opts.tag.clone(),
        });
        if let Some(message) = self.lock().push_failure.take() {
            return Err(ContainerError::Registry(message));
        }
        Ok("sha256:fakedigest".to_string())
    }

    async fn stop(&self, container_id: &str) -> Result<(), ContainerError> {
        self.record(ContainerCall::Stop {
            container_id: container_id.to_string(),
        });
        Ok(())
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), ContainerError> {
        self.record(ContainerCall::RemoveContainer {
            container_id: container_id.to_string(),
        });
        self.lock().containers.remove(container_id);
        Ok(())
    }

    async fn remove_image(&self, image: &str) -> Result<(), ContainerError> {
        self.record(ContainerCall::RemoveImage {
            image: image.to_string(),
        });
        Ok(())
    }

    async fn export_path(
        &self,
        container_id: &str,
        path: &str,
    ) -> Result<Vec<u8>, ContainerError> {
        self.record(ContainerCall::ExportPath {
            container_id: container_id.to_string(),
            path: path.to_string(),
        });
        self.lock()
            .exports
            .get(path)
            .cloned()
            .ok_or_else(|| ContainerError::PathNotFound(path.to_string()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
