// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry sink for lifecycle events
//!
//! Listens to the emitter and posts one JSON payload per event. Emission is
//! synchronous, so the handler owns its queueing: payloads go onto an
//! unbounded channel drained by a background task.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use wercker_core::{
    BoxInfo, Emitter, Event, EventKind, PipelineOptions, RunKind, Step,
};

/// Errors from telemetry setup
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("no telemetry endpoint configured")]
    MissingEndpoint,
}

#[derive(Debug, Default)]
struct MetricsState {
    start_build: Option<Instant>,
    start_step: HashMap<String, Instant>,
    num_build_steps: usize,
    num_build_after_steps: usize,
    num_deploy_steps: usize,
    num_deploy_after_steps: usize,
}

/// Reports lifecycle events to the telemetry endpoint.
#[derive(Clone)]
pub struct MetricsHandler {
    state: Arc<Mutex<MetricsState>>,
    tx: mpsc::UnboundedSender<MetricsPayload>,
    debug: bool,
}

impl MetricsHandler {
    pub fn new(endpoint: &str, debug: bool) -> Result<Self, MetricsError> {
        if endpoint.is_empty() {
            return Err(MetricsError::MissingEndpoint);
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<MetricsPayload>();
        let endpoint = endpoint.trim_end_matches('/').to_string();
        tokio::spawn(async move {
            let client = reqwest::Client::new();
            while let Some(payload) = rx.recv().await {
                let url = format!("{}/{}", endpoint, payload.collection);
                if let Err(error) = client.post(&url).json(&payload).send().await {
                    tracing::warn!(%error, "failed to deliver metrics payload");
                }
            }
        });

        Ok(Self {
            state: Arc::new(Mutex::new(MetricsState::default())),
            tx,
            debug,
        })
    }

    /// Register for every lifecycle event on the emitter.
    pub fn listen_to(&self, emitter: &Emitter) {
        for kind in [
            EventKind::BuildStarted,
            EventKind::BuildFinished,
            EventKind::BuildStepsAdded,
            EventKind::BuildStepStarted,
            EventKind::BuildStepFinished,
        ] {
            let handler = self.clone();
            emitter.add_listener(kind, "metrics", move |event| {
                if let Some(payload) = handler.handle(event) {
                    let _ = handler.tx.send(payload);
                }
            });
        }
    }

    /// Turn an event into the payload that should be sent, updating timing
    /// state along the way. Returns `None` for events that only record.
    fn handle(&self, event: &Event) -> Option<MetricsPayload> {
        let now = Instant::now();
        match event {
            Event::BuildStarted(args) => {
                self.lock().start_build = Some(now);
                self.payload(&args.options, None, "buildStarted")
            }
            Event::BuildFinished(args) => {
                let duration = self
                    .lock()
                    .start_build
                    .map(|begin| now.duration_since(begin).as_secs() as i64)
                    .unwrap_or(0);
                let mut payload =
                    self.payload(&args.options, args.box_info.as_ref(), "buildFinished")?;
                payload.duration = Some(duration);
                payload.success = Some(args.result == "passed");
                Some(payload)
            }
            Event::BuildStepStarted(args) => {
                self.lock().start_step.insert(args.step.safe_id(), now);
                let mut payload =
                    self.payload(&args.options, args.box_info.as_ref(), "buildStepStarted")?;
                payload.set_step(&args.step, args.order);
                Some(payload)
            }
            Event::BuildStepFinished(args) => {
                // A finish without a matching start reports zero rather than
                // being dropped
                let duration = self
                    .lock()
                    .start_step
                    .remove(&args.step.safe_id())
                    .map(|begin| now.duration_since(begin).as_secs() as i64)
                    .unwrap_or(0);
                let mut payload =
                    self.payload(&args.options, args.box_info.as_ref(), "buildStepFinished")?;
                payload.set_step(&args.step, args.order);
                payload.duration = Some(duration);
                payload.success = Some(args.successful);
                payload.message = Some(args.message.clone());
                Some(payload)
            }
            Event::BuildStepsAdded(args) => {
                let mut state = self.lock();
                match args.options.run_kind() {
                    Some(RunKind::Build) => {
                        state.num_build_steps = args.steps.len();
                        state.num_build_after_steps = args.after_steps.len();
                    }
                    Some(RunKind::Deploy) => {
                        state.num_deploy_steps = args.steps.len();
                        state.num_deploy_after_steps = args.after_steps.len();
                    }
                    None => {}
                }
                None
            }
            Event::Logs(_) => None,
        }
    }

    fn payload(
        &self,
        options: &PipelineOptions,
        box_info: Option<&BoxInfo>,
        event_name: &str,
    ) -> Option<MetricsPayload> {
        let kind = match options.run_kind() {
            Some(kind) => kind,
            // Only builds and deploys report metrics; anything else is a
            // broken caller
            None => {
                if self.debug {
                    panic!("metrics asked to report for neither a build nor a deploy");
                }
                tracing::error!("metrics asked to report for neither a build nor a deploy");
                return None;
            }
        };
        let collection = match kind {
            RunKind::Build => "build-events",
            RunKind::Deploy => "deploy-events",
        };

        let state = self.lock();
        Some(MetricsPayload {
            collection: collection.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
            event: event_name.to_string(),
            pipeline_name: kind.to_string(),
            build_id: options.build_id.clone(),
            deploy_id: options.deploy_id.clone(),
            started_by: options.application_started_by_name.clone(),
            application: ApplicationPayload {
                id: options.application_id.clone(),
                name: options.application_name.clone(),
                owner_name: options.application_owner_name.clone(),
            },
            box_name: box_info.map(|b| b.name.clone()),
            box_tag: box_info.map(|b| b.tag.clone()),
            num_build_steps: state.num_build_steps,
            num_build_after_steps: state.num_build_after_steps,
            num_deploy_steps: state.num_deploy_steps,
            num_deploy_after_steps: state.num_deploy_after_steps,
            step: None,
            step_name: None,
            step_order: None,
            success: None,
            message: None,
            duration: None,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Serialize)]
struct ApplicationPayload {
    id: String,
    name: String,
    #[serde(rename = "ownerName")]
    owner_name: String,
}

#[derive(Debug, Clone, Serialize)]
struct StepPayload {
    owner: String,
    name: String,
    version: String,
    #[serde(rename = "fullName")]
    full_name: String,
    #[serde(rename = "uniqueName")]
    unique_name: String,
}

/// One telemetry record.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsPayload {
    #[serde(skip)]
    collection: String,
    timestamp: i64,
    #[serde(rename = "recordedAt")]
    recorded_at: String,
    event: String,
    #[serde(rename = "pipelineName")]
    pipeline_name: String,
    #[serde(rename = "buildId", skip_serializing_if = "String::is_empty")]
    build_id: String,
    #[serde(rename = "deployId", skip_serializing_if = "String::is_empty")]
    deploy_id: String,
    #[serde(rename = "startedBy", skip_serializing_if = "String::is_empty")]
    started_by: String,
    application: ApplicationPayload,
    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    box_name: Option<String>,
    #[serde(rename = "boxTag", skip_serializing_if = "Option::is_none")]
    box_tag: Option<String>,
    #[serde(rename = "numBuildSteps")]
    num_build_steps: usize,
    #[serde(rename = "numBuildAfterSteps")]
    num_build_after_steps: usize,
    #[serde(rename = "numDeploySteps")]
    num_deploy_steps: usize,
    #[serde(rename = "numDeployAfterSteps")]
    num_deploy_after_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<StepPayload>,
    #[serde(rename = "stepName", skip_serializing_if = "Option::is_none")]
    step_name: Option<String>,
    #[serde(rename = "stepOrder", skip_serializing_if = "Option::is_none")]
    step_order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<i64>,
}

impl MetricsPayload {
    fn set_step(&mut self, step: &Step, order: u32) {
        self.step = Some(StepPayload {
            owner: step.owner.clone(),
            name: step.name.clone(),
            version: step.version.clone(),
            full_name: format!("{}/{}", step.owner, step.name),
            unique_name: step.unique_name(),
        });
        self.step_name = Some(step.unique_name());
        self.step_order = Some(order);
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
