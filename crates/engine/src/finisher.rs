// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped completion tokens for build and step lifecycle events
//!
//! Starting a finisher emits the Started event; finishing (or dropping it)
//! emits the matching Finished event exactly once. The drop path is the
//! pessimistic one: whatever was in flight is reported as failed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use wercker_core::{
    BoxInfo, BuildFinishedArgs, BuildStartedArgs, BuildStepFinishedArgs, BuildStepStartedArgs,
    Emitter, Event, PipelineOptions, Step, StepResult,
};

/// Pairs one `BuildStarted` with exactly one `BuildFinished`.
pub struct BuildFinisher {
    emitter: Emitter,
    options: PipelineOptions,
    box_info: Mutex<Option<BoxInfo>>,
    finished: AtomicBool,
}

impl BuildFinisher {
    /// Emit `BuildStarted` and arm the pessimistic finish.
    pub fn start(emitter: Emitter, options: PipelineOptions) -> Self {
        emitter.emit(Event::BuildStarted(BuildStartedArgs {
            options: options.clone(),
        }));
        Self {
            emitter,
            options,
            box_info: Mutex::new(None),
            finished: AtomicBool::new(false),
        }
    }

    /// Attach the box snapshot once the environment exists.
    pub fn set_box_info(&self, info: BoxInfo) {
        *self.box_info.lock().unwrap_or_else(|e| e.into_inner()) = Some(info);
    }

    /// Emit `BuildFinished`. Later calls (including the drop) are no-ops.
    pub fn finish(&self, success: bool) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        let box_info = self
            .box_info
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        self.emitter.emit(Event::BuildFinished(BuildFinishedArgs {
            options: self.options.clone(),
            box_info,
            result: if success { "passed" } else { "failed" }.to_string(),
        }));
    }
}

impl Drop for BuildFinisher {
    fn drop(&mut self) {
        self.finish(false);
    }
}

/// Pairs one `BuildStepStarted` with exactly one `BuildStepFinished` for the
/// same step and order.
pub struct StepFinisher {
    emitter: Emitter,
    options: PipelineOptions,
    box_info: Option<BoxInfo>,
    step: Step,
    order: u32,
    finished: AtomicBool,
}

impl StepFinisher {
    /// Emit `BuildStepStarted` and arm the pessimistic finish.
    pub fn start(
        emitter: Emitter,
        options: PipelineOptions,
        box_info: Option<BoxInfo>,
        step: Step,
        order: u32,
    ) -> Self {
        emitter.emit(Event::BuildStepStarted(BuildStepStartedArgs {
            options: options.clone(),
            box_info: box_info.clone(),
            step: step.clone(),
            order,
        }));
        Self {
            emitter,
            options,
            box_info,
            step,
            order,
            finished: AtomicBool::new(false),
        }
    }

    /// Emit `BuildStepFinished` carrying the result. Later calls are no-ops.
    pub fn finish(&self, result: &StepResult) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        self.emitter
            .emit(Event::BuildStepFinished(BuildStepFinishedArgs {
                options: self.options.clone(),
                box_info: self.box_info.clone(),
                step: self.step.clone(),
                order: self.order,
                successful: result.success,
                message: result.message.clone(),
                package_url: result.package_url.clone(),
            }));
    }
}

impl Drop for StepFinisher {
    fn drop(&mut self) {
        self.finish(&StepResult::failed("interrupted", -1));
    }
}

#[cfg(test)]
#[path = "finisher_tests.rs"]
mod tests;
