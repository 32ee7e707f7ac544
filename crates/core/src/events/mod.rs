// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events and the emitter that dispatches them

mod emitter;
mod payload;

pub use emitter::Emitter;
pub use payload::{
    BoxInfo, BuildFinishedArgs, BuildStartedArgs, BuildStepFinishedArgs, BuildStepStartedArgs,
    BuildStepsAddedArgs, Event, EventKind, LogsArgs, StreamKind,
};
