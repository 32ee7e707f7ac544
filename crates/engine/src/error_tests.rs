// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn configuration_failures_exit_two() {
    let err = RunnerError::Config(ConfigError::MissingField("image".to_string()));
    assert_eq!(err.exit_code(), 2);
    let err = RunnerError::Options(OptionsError::MissingRunId);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn pipeline_failures_exit_one() {
    assert_eq!(RunnerError::StepFailed("tests".to_string()).exit_code(), 1);
    assert_eq!(
        RunnerError::Environment("no docker".to_string()).exit_code(),
        1
    );
}

#[test]
fn soft_exit_returns_the_error_in_release_mode() {
    let soft = SoftExit::new(false);
    let err = soft.exit(RunnerError::Environment("boom".to_string()));
    assert!(matches!(err, RunnerError::Environment(_)));
}

#[test]
#[should_panic(expected = "environment setup failed: boom")]
fn soft_exit_panics_in_debug_mode() {
    let soft = SoftExit::new(true);
    let _ = soft.exit(RunnerError::Environment("boom".to_string()));
}
