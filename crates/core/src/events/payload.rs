// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed event payloads for the pipeline lifecycle

use crate::options::PipelineOptions;
use crate::pipeline::{Pipeline, Step};
use std::fmt;

/// The exhaustive set of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BuildStarted,
    BuildFinished,
    BuildStepsAdded,
    BuildStepStarted,
    BuildStepFinished,
    Logs,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::BuildStarted => "buildStarted",
            EventKind::BuildFinished => "buildFinished",
            EventKind::BuildStepsAdded => "buildStepsAdded",
            EventKind::BuildStepStarted => "buildStepStarted",
            EventKind::BuildStepFinished => "buildStepFinished",
            EventKind::Logs => "logs",
        };
        write!(f, "{}", name)
    }
}

/// Which output stream a log chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// Snapshot of the box for event payloads.
#[derive(Debug, Clone)]
pub struct BoxInfo {
    /// Image name without the tag
    pub name: String,
    pub tag: String,
    pub container_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BuildStartedArgs {
    pub options: PipelineOptions,
}

#[derive(Debug, Clone)]
pub struct BuildFinishedArgs {
    pub options: PipelineOptions,
    pub box_info: Option<BoxInfo>,
    /// `"passed"` or `"failed"`
    pub result: String,
}

/// Emitted exactly once per run, before any step runs.
#[derive(Debug, Clone)]
pub struct BuildStepsAddedArgs {
    pub options: PipelineOptions,
    pub pipeline: Pipeline,
    pub steps: Vec<Step>,
    pub store_step: Step,
    pub after_steps: Vec<Step>,
}

#[derive(Debug, Clone)]
pub struct BuildStepStartedArgs {
    pub options: PipelineOptions,
    pub box_info: Option<BoxInfo>,
    pub step: Step,
    pub order: u32,
}

#[derive(Debug, Clone)]
pub struct BuildStepFinishedArgs {
    pub options: PipelineOptions,
    pub box_info: Option<BoxInfo>,
    pub step: Step,
    pub order: u32,
    pub successful: bool,
    pub message: String,
    /// Artifact URL when the store step delivered one
    pub package_url: String,
}

/// Per-step output. May be high-frequency; handlers must keep up or queue.
#[derive(Debug, Clone)]
pub struct LogsArgs {
    pub step: Step,
    pub order: u32,
    pub stream: StreamKind,
    pub output: String,
}

/// A lifecycle event with its payload.
#[derive(Debug, Clone)]
pub enum Event {
    BuildStarted(BuildStartedArgs),
    BuildFinished(BuildFinishedArgs),
    BuildStepsAdded(BuildStepsAddedArgs),
    BuildStepStarted(BuildStepStartedArgs),
    BuildStepFinished(BuildStepFinishedArgs),
    Logs(LogsArgs),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BuildStarted(_) => EventKind::BuildStarted,
            Event::BuildFinished(_) => EventKind::BuildFinished,
            Event::BuildStepsAdded(_) => EventKind::BuildStepsAdded,
            Event::BuildStepStarted(_) => EventKind::BuildStepStarted,
            Event::BuildStepFinished(_) => EventKind::BuildStepFinished,
            Event::Logs(_) => EventKind::Logs,
        }
    }
}
