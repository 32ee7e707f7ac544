// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wercker_core::{
    BuildFinishedArgs, BuildStartedArgs, BuildStepFinishedArgs, BuildStepStartedArgs,
    BuildStepsAddedArgs, Pipeline,
};

fn options() -> PipelineOptions {
    let mut options = PipelineOptions::for_build(Some("b-1".to_string()));
    options.application_name = "app".to_string();
    options.application_owner_name = "acme".to_string();
    options
}

fn handler() -> MetricsHandler {
    MetricsHandler::new("http://127.0.0.1:1/telemetry", false).unwrap()
}

#[tokio::test]
async fn empty_endpoint_is_rejected() {
    assert!(matches!(
        MetricsHandler::new("", false),
        Err(MetricsError::MissingEndpoint)
    ));
}

#[tokio::test]
async fn build_events_go_to_the_build_collection() {
    let handler = handler();
    let payload = handler
        .handle(&Event::BuildStarted(BuildStartedArgs { options: options() }))
        .unwrap();
    assert_eq!(payload.collection, "build-events");
    assert_eq!(payload.event, "buildStarted");
    assert_eq!(payload.pipeline_name, "build");
}

#[tokio::test]
async fn deploy_events_go_to_the_deploy_collection() {
    let handler = handler();
    let payload = handler
        .handle(&Event::BuildStarted(BuildStartedArgs {
            options: PipelineOptions::for_deploy(Some("d-1".to_string())),
        }))
        .unwrap();
    assert_eq!(payload.collection, "deploy-events");
    assert_eq!(payload.pipeline_name, "deploy");
}

#[tokio::test]
async fn neither_build_nor_deploy_is_skipped_in_release() {
    let handler = handler();
    let payload = handler.handle(&Event::BuildStarted(BuildStartedArgs {
        options: PipelineOptions::default(),
    }));
    assert!(payload.is_none());
}

#[tokio::test]
async fn step_finished_without_started_reports_zero_duration() {
    let handler = handler();
    let step = Step::new("acme", "unit", "1.0.0", 3);
    let payload = handler
        .handle(&Event::BuildStepFinished(BuildStepFinishedArgs {
            options: options(),
            box_info: None,
            step,
            order: 3,
            successful: true,
            message: String::new(),
            package_url: String::new(),
        }))
        .unwrap();
    assert_eq!(payload.duration, Some(0));
    assert_eq!(payload.success, Some(true));
}

#[tokio::test]
async fn step_timing_is_keyed_by_safe_id() {
    let handler = handler();
    let step = Step::new("acme", "unit", "1.0.0", 3);

    let started = handler
        .handle(&Event::BuildStepStarted(BuildStepStartedArgs {
            options: options(),
            box_info: None,
            step: step.clone(),
            order: 3,
        }))
        .unwrap();
    assert_eq!(started.step_name.as_deref(), Some("acme/unit@1.0.0"));
    assert_eq!(started.step_order, Some(3));

    let finished = handler
        .handle(&Event::BuildStepFinished(BuildStepFinishedArgs {
            options: options(),
            box_info: None,
            step: step.clone(),
            order: 3,
            successful: false,
            message: "oops".to_string(),
            package_url: String::new(),
        }))
        .unwrap();
    assert!(finished.duration.is_some());
    assert_eq!(finished.message.as_deref(), Some("oops"));

    // The timing entry is consumed; a second finish reports zero
    let again = handler
        .handle(&Event::BuildStepFinished(BuildStepFinishedArgs {
            options: options(),
            box_info: None,
            step,
            order: 3,
            successful: false,
            message: String::new(),
            package_url: String::new(),
        }))
        .unwrap();
    assert_eq!(again.duration, Some(0));
}

#[tokio::test]
async fn steps_added_records_counts_without_sending() {
    let handler = handler();
    let steps = vec![
        Step::new("acme", "one", "1", 3),
        Step::new("acme", "two", "1", 4),
    ];
    let after_steps = vec![Step::new("acme", "after", "1", 6)];

    let payload = handler.handle(&Event::BuildStepsAdded(BuildStepsAddedArgs {
        options: options(),
        pipeline: Pipeline::new(
            steps.clone(),
            after_steps.clone(),
            "alpine:3.20".to_string(),
            "acme/app".to_string(),
            "latest".to_string(),
            String::new(),
            Vec::new(),
        ),
        steps,
        store_step: Step::synthetic("store", 5),
        after_steps,
    }));
    assert!(payload.is_none());

    let finished = handler
        .handle(&Event::BuildFinished(BuildFinishedArgs {
            options: options(),
            box_info: None,
            result: "passed".to_string(),
        }))
        .unwrap();
    assert_eq!(finished.num_build_steps, 2);
    assert_eq!(finished.num_build_after_steps, 1);
    assert_eq!(finished.success, Some(true));
}

#[tokio::test]
async fn finished_payload_carries_box_details() {
    let handler = handler();
    let payload = handler
        .handle(&Event::BuildFinished(BuildFinishedArgs {
            options: options(),
            box_info: Some(BoxInfo {
                name: "alpine".to_string(),
                tag: "3.20".to_string(),
                container_id: Some("c-1".to_string()),
            }),
            result: "failed".to_string(),
        }))
        .unwrap();
    assert_eq!(payload.box_name.as_deref(), Some("alpine"));
    assert_eq!(payload.box_tag.as_deref(), Some("3.20"));
    assert_eq!(payload.success, Some(false));
}
