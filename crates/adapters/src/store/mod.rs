// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object store adapter for pipeline artifacts

#[cfg(any(test, feature = "test-support"))]
mod fake;
mod noop;
mod s3;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeObjectStore, PutRecord};
pub use noop::NoOpStore;
pub use s3::S3Store;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from object store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("transient transport failure: {0}")]
    Transient(String),
}

impl StoreError {
    /// Whether a retry can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Adapter for the artifact object store
#[async_trait]
pub trait ObjectStore: Clone + Send + Sync + 'static {
    /// Store an object and return its URL.
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError>;
}
