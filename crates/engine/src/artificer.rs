// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collects the pipeline output directory and uploads it

use crate::boxes::{BoxError, PipelineBox};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use wercker_adapters::{ContainerClient, ContainerError, ObjectStore, StoreError};
use wercker_core::{Artifact, Pipeline, PipelineOptions};

const MAX_ATTEMPTS: u32 = 5;
const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Errors from artifact collection and upload
#[derive(Debug, Error)]
pub enum ArtificerError {
    #[error("no artifact found at {0}")]
    NoArtifact(String),
    #[error(transparent)]
    Box(#[from] BoxError),
    #[error("upload failed: {0}")]
    Upload(#[from] StoreError),
}

/// Collects a directory-as-tarball out of the box and delivers it to the
/// object store.
pub struct Artificer<S: ObjectStore> {
    store: S,
    options: PipelineOptions,
}

impl<S: ObjectStore> Artificer<S> {
    pub fn new(store: S, options: PipelineOptions) -> Self {
        Self { store, options }
    }

    /// Package the configured artifact directory as a tarball streamed out
    /// of the container. Fails with `NoArtifact` when the path is missing or
    /// holds no files.
    pub async fn collect<C: ContainerClient>(
        &self,
        bx: &PipelineBox<C>,
        pipeline: &Pipeline,
    ) -> Result<Artifact, ArtificerError> {
        let path = pipeline.artifact_dir();
        let data = match bx.export_path(path).await {
            Ok(data) => data,
            Err(BoxError::Container(ContainerError::PathNotFound(_))) => {
                return Err(ArtificerError::NoArtifact(path.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        if !has_files(&data) {
            return Err(ArtificerError::NoArtifact(path.to_string()));
        }

        let checksum = format!("{:x}", Sha256::digest(&data));
        let key = format!(
            "{}/{}/{}.tar",
            self.options.application_owner_name,
            self.options.application_name,
            self.options.run_id()
        );
        tracing::debug!(key = %key, bytes = data.len(), "artifact collected");
        Ok(Artifact {
            source: path.to_string(),
            key,
            data,
            checksum,
            url: None,
        })
    }

    /// Upload to the object store, retrying transient transport failures
    /// with exponential backoff. Non-transient failures return immediately.
    /// Sets the artifact URL on success.
    pub async fn upload(&self, artifact: &mut Artifact) -> Result<(), ArtificerError> {
        let mut delay = BASE_DELAY;
        let mut attempt = 1;
        loop {
            match self
                .store
                .put(&artifact.key, artifact.data.clone(), "application/x-tar")
                .await
            {
                Ok(url) => {
                    tracing::info!(url = %url, "artifact uploaded");
                    artifact.url = Some(url);
                    return Ok(());
                }
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "artifact upload failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, MAX_DELAY);
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn has_files(data: &[u8]) -> bool {
    let mut archive = tar::Archive::new(data);
    match archive.entries() {
        Ok(entries) => entries
            .flatten()
            .any(|entry| entry.header().entry_type().is_file()),
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "artificer_tests.rs"]
mod tests;
