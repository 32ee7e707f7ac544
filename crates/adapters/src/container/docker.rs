// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker CLI container adapter

use super::{
    ContainerClient, ContainerConfig, ContainerError, ContainerIo, OutputChunk, PushOptions,
    RegistryAuth,
};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use wercker_core::StreamKind;

/// Container adapter backed by the `docker` binary
#[derive(Clone, Default)]
pub struct DockerCli;

impl DockerCli {
    /// Connect to the local docker installation. Fails when the binary is
    /// not on PATH.
    pub fn connect() -> Result<Self, ContainerError> {
        if which::which("docker").is_err() {
            return Err(ContainerError::DaemonUnavailable);
        }
        Ok(Self)
    }

    async fn run(&self, args: Vec<String>) -> Result<std::process::Output, ContainerError> {
        let output = Command::new("docker").args(&args).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ContainerError::CommandFailed {
                cmd: format!("docker {}", args.join(" ")),
                stderr,
            });
        }
        Ok(output)
    }

    async fn login(&self, auth: &RegistryAuth) -> Result<(), ContainerError> {
        if auth.is_anonymous() {
            return Ok(());
        }
        let mut child = Command::new("docker")
            .args([
                "login",
                "--username",
                &auth.username,
                "--password-stdin",
                &auth.server_address,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(auth.password.as_bytes()).await?;
        }
        drop(child.stdin.take());
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ContainerError::Registry(stderr));
        }
        Ok(())
    }
}

async fn pump<R>(mut reader: R, stream: StreamKind, tx: mpsc::Sender<OutputChunk>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let chunk = OutputChunk {
                    stream,
                    data: buf[..n].to_vec(),
                };
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ContainerClient for DockerCli {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError> {
        let output = Command::new("docker")
            .args(["image", "inspect", image])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await?;
        Ok(output.status.success())
    }

    async fn pull_image(&self, image: &str, auth: &RegistryAuth) -> Result<(), ContainerError> {
        self.login(auth).await?;
        self.run(vec!["pull".to_string(), image.to_string()]).await?;
        Ok(())
    }

    async fn create_container(&self, config: &ContainerConfig) -> Result<String, ContainerError> {
        // A leftover container with the same name blocks creation; clear it.
        let existing = Command::new("docker")
            .args(["container", "inspect", &config.name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;
        if existing.map(|o| o.status.success()).unwrap_or(false) {
            tracing::warn!(name = %config.name, "container already exists, removing first");
            let _ = Command::new("docker")
                .args(["rm", "--force", &config.name])
                .output()
                .await;
        }

        let mut args: Vec<String> = vec![
            "create".to_string(),
            "--interactive".to_string(),
            "--name".to_string(),
            config.name.clone(),
        ];
        for (key, value) in &config.env {
            args.push("--env".to_string());
            args.push(format!("{}={}", key, value));
        }
        for (host, container) in &config.volumes {
            // Bind mounts need an absolute host path
            let host = host.canonicalize().unwrap_or_else(|_| host.clone());
            args.push("--volume".to_string());
            args.push(format!("{}:{}", host.display(), container));
        }
        if let Some(dir) = &config.working_dir {
            args.push("--workdir".to_string());
            args.push(dir.clone());
        }
        args.push(config.image.clone());
        args.extend(config.cmd.iter().cloned());

        let output = self.run(args).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn attach(&self, container_id: &str) -> Result<ContainerIo, ContainerError> {
        let mut child = Command::new("docker")
            .args(["start", "--attach", "--interactive", container_id])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ContainerError::AttachFailed(e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ContainerError::AttachFailed("no stdin handle".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ContainerError::AttachFailed("no stdout handle".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ContainerError::AttachFailed("no stderr handle".to_string()))?;

        let (in_tx, mut in_rx) = mpsc::channel::<Vec<u8>>(16);
        let (out_tx, out_rx) = mpsc::channel::<OutputChunk>(256);

        tokio::spawn(async move {
            while let Some(bytes) = in_rx.recv().await {
                if stdin.write_all(&bytes).await.is_err() {
                    break;
                }
                let _ = stdin.flush().await;
            }
        });
        let stdout_tx = out_tx.clone();
        tokio::spawn(pump(stdout, StreamKind::Stdout, stdout_tx));
        tokio::spawn(pump(stderr, StreamKind::Stderr, out_tx));
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

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
        let output = self
            .run(vec![
                "commit".to_string(),
                "--message".to_string(),
                message.to_string(),
                container_id.to_string(),
                format!("{}:{}", repo, tag),
            ])
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn push(
        &self,
        opts: &PushOptions,
        auth: &RegistryAuth,
    ) -> Result<String, ContainerError> {
        self.login(auth).await?;
        let image_ref = opts.image_ref();
        let output = Command::new("docker")
            .args(["push", &image_ref])
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let lowered = stderr.to_lowercase();
            if lowered.contains("denied")
                || lowered.contains("unauthorized")
                || lowered.contains("authentication required")
            {
                return Err(ContainerError::Registry(stderr));
            }
            return Err(ContainerError::CommandFailed {
                cmd: format!("docker push {}", image_ref),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let digest = stdout
            .lines()
            .filter_map(|line| line.split("digest: ").nth(1))
            .filter_map(|rest| rest.split_whitespace().next())
            .last()
            .unwrap_or_default()
            .to_string();
        Ok(digest)
    }

    async fn stop(&self, container_id: &str) -> Result<(), ContainerError> {
        self.run(vec!["stop".to_string(), container_id.to_string()])
            .await?;
        Ok(())
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), ContainerError> {
        self.run(vec![
            "rm".to_string(),
            "--force".to_string(),
            container_id.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn remove_image(&self, image: &str) -> Result<(), ContainerError> {
        self.run(vec!["rmi".to_string(), image.to_string()]).await?;
        Ok(())
    }

    async fn export_path(
        &self,
        container_id: &str,
        path: &str,
    ) -> Result<Vec<u8>, ContainerError> {
        let source = format!("{}:{}", container_id, path);
        let output = Command::new("docker")
            .args(["cp", &source, "-"])
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let lowered = stderr.to_lowercase();
            if lowered.contains("could not find the file") || lowered.contains("no such") {
                return Err(ContainerError::PathNotFound(path.to_string()));
            }
            return Err(ContainerError::CommandFailed {
                cmd: format!("docker cp {} -", source),
                stderr,
            });
        }
        Ok(output.stdout)
    }
}
