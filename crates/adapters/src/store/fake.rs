// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake object store for testing

use super::{ObjectStore, StoreError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Recorded put
#[derive(Debug, Clone)]
pub struct PutRecord {
    pub key: String,
    pub content_length: usize,
    pub content_type: String,
}

#[derive(Default)]
struct FakeStoreState {
    puts: Vec<PutRecord>,
    failures: VecDeque<StoreError>,
}

/// Fake object store. Records puts and pops scripted failures first.
#[derive(Clone, Default)]
pub struct FakeObjectStore {
    state: Arc<Mutex<FakeStoreState>>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next put with the given error
    pub fn push_failure(&self, error: StoreError) {
        self.lock().failures.push_back(error);
    }

    /// Fail the next `count` puts with transient errors
    pub fn fail_transient(&self, count: usize) {
        let mut st = self.lock();
        for _ in 0..count {
            st.failures
                .push_back(StoreError::Transient("connection reset".to_string()));
        }
    }

    /// All successful puts, in order
    pub fn puts(&self) -> Vec<PutRecord> {
        self.lock().puts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeStoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let mut st = self.lock();
        if let Some(failure) = st.failures.pop_front() {
            return Err(failure);
        }
        st.puts.push(PutRecord {
            key: key.to_string(),
            content_length: data.len(),
            content_type: content_type.to_string(),
        });
        Ok(format!("fake://artifacts/{}", key))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
