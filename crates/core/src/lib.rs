// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wercker-core: pipeline model, options, and the lifecycle event bus

pub mod config;
pub mod counter;
pub mod events;
pub mod options;
pub mod pipeline;
pub mod result;

pub use config::{get_build_pipeline, get_deploy_pipeline, Config, ConfigError, GetPipeline};
pub use counter::Counter;
pub use events::{
    BoxInfo, BuildFinishedArgs, BuildStartedArgs, BuildStepFinishedArgs, BuildStepStartedArgs,
    BuildStepsAddedArgs, Emitter, Event, EventKind, LogsArgs, StreamKind,
};
pub use options::{OptionsError, PipelineOptions, RunKind};
pub use pipeline::{Pipeline, Step, CONTAINER_OUTPUT_DIR, CONTAINER_SOURCE_DIR};
pub use result::{Artifact, PipelineResult, StepResult};
