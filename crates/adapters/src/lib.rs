// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: the container runtime and the object store

pub mod container;
pub mod store;

pub use container::{
    ContainerClient, ContainerConfig, ContainerError, ContainerIo, DockerCli, OutputChunk,
    PushOptions, RegistryAuth, EXIT_MARKER,
};
pub use store::{NoOpStore, ObjectStore, S3Store, StoreError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use container::{ContainerCall, FakeContainerClient, ScriptedStep};
#[cfg(any(test, feature = "test-support"))]
pub use store::{FakeObjectStore, PutRecord};
