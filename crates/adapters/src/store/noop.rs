// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op object store for runs without artifact delivery

use super::{ObjectStore, StoreError};
use async_trait::async_trait;

/// Rejects every put. Used when no object store is configured so that a run
/// with artifacts enabled fails loudly instead of silently dropping output.
#[derive(Clone, Default)]
pub struct NoOpStore;

impl NoOpStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ObjectStore for NoOpStore {
    async fn put(
        &self,
        _key: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StoreError> {
        Err(StoreError::Rejected(
            "no object store configured".to_string(),
        ))
    }
}
