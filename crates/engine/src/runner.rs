// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline orchestration
//!
//! One `execute` call runs one pipeline: stage the code, provision the box,
//! drive the steps, deliver the image and artifact, then hand the finalized
//! result to the after-steps. The pipeline body runs as a spawned task so a
//! panic surfaces as a recoverable join error; the box lives in a slot
//! shared with the outer frame, which drains it on every exit path.

use crate::artificer::{Artificer, ArtificerError};
use crate::boxes::{BoxError, PipelineBox};
use crate::error::{RunnerError, SoftExit};
use crate::finisher::{BuildFinisher, StepFinisher};
use crate::session::Session;
use crate::step::execute_step;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use wercker_adapters::{ContainerClient, ObjectStore, PushOptions, RegistryAuth};
use wercker_core::{
    BoxInfo, BuildStepsAddedArgs, Config, Counter, Emitter, Event, GetPipeline, LogsArgs,
    Pipeline, PipelineOptions, PipelineResult, Step, StepResult, StreamKind,
};

/// Aborts a run at the nearest safe point.
#[derive(Clone)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

type BoxSlot<C> = Arc<Mutex<Option<PipelineBox<C>>>>;

/// Runs pipelines against a container client and an object store.
pub struct Runner<C: ContainerClient, S: ObjectStore> {
    options: PipelineOptions,
    config: Config,
    client: C,
    store: S,
    emitter: Emitter,
    cancel: watch::Receiver<bool>,
}

impl<C: ContainerClient, S: ObjectStore> Runner<C, S> {
    pub fn new(
        options: PipelineOptions,
        config: Config,
        client: C,
        store: S,
    ) -> (Self, CancelHandle) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (
            Self {
                options,
                config,
                client,
                store,
                emitter: Emitter::new(),
                cancel: cancel_rx,
            },
            CancelHandle(cancel_tx),
        )
    }

    /// The event bus handlers register against.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Run one pipeline to completion.
    pub async fn execute(&self, get_pipeline: GetPipeline) -> Result<(), RunnerError> {
        let soft = SoftExit::new(self.options.debug);

        // Configuration problems are fatal before any side effect
        self.options.validate()?;
        let pipeline = get_pipeline(&self.config, &self.options)?;

        let box_slot: BoxSlot<C> = Arc::new(Mutex::new(None));
        let state = RunState {
            options: self.options.clone(),
            pipeline,
            client: self.client.clone(),
            store: self.store.clone(),
            emitter: self.emitter.clone(),
            cancel: self.cancel.clone(),
            box_slot: Arc::clone(&box_slot),
        };

        let outcome = match tokio::spawn(run_pipeline(state)).await {
            Ok(result) => result,
            Err(join) if join.is_panic() => {
                Err(RunnerError::Internal("pipeline task panicked".to_string()))
            }
            Err(_) => Err(RunnerError::Internal("pipeline task aborted".to_string())),
        };

        // Scoped cleanup: the slot holds the box from the moment it exists,
        // so this runs exactly once per run whatever path got us here.
        if let Some(mut bx) = box_slot.lock().await.take() {
            if let Err(error) = bx.stop().await {
                tracing::warn!(%error, "failed to stop box");
            }
            if self.options.should_remove {
                if let Err(error) = bx.clean().await {
                    tracing::warn!(%error, "failed to clean box");
                }
            }
        }

        match outcome {
            Err(err @ RunnerError::Internal(_)) => Err(soft.exit(err)),
            other => other,
        }
    }
}

/// Everything one spawned pipeline run owns.
struct RunState<C: ContainerClient, S: ObjectStore> {
    options: PipelineOptions,
    pipeline: Pipeline,
    client: C,
    store: S,
    emitter: Emitter,
    cancel: watch::Receiver<bool>,
    box_slot: BoxSlot<C>,
}

async fn run_pipeline<C: ContainerClient, S: ObjectStore>(
    st: RunState<C, S>,
) -> Result<(), RunnerError> {
    let soft = SoftExit::new(st.options.debug);
    tracing::info!(run_id = %st.options.run_id(), "executing pipeline");

    // Pessimistic: reports failed on every exit path unless overridden below
    let build_finisher = BuildFinisher::start(st.emitter.clone(), st.options.clone());

    ensure_code(&st.options).map_err(|e| soft.exit(e))?;

    let mut session = match setup_environment(&st).await {
        Ok(session) => session,
        Err(err) => return Err(soft.exit(err)),
    };
    let box_info = current_box_info(&st).await;
    if let Some(info) = &box_info {
        build_finisher.set_box_info(info.clone());
    }

    let repo = st.pipeline.docker_repo().to_string();
    let tag = st.pipeline.docker_tag().to_string();
    let message = st.pipeline.docker_message().to_string();

    let counter = Counter::new(3);
    let store_step = Step::synthetic("store", 3 + st.pipeline.steps().len() as u32);

    st.emitter.emit(Event::BuildStepsAdded(BuildStepsAddedArgs {
        options: st.options.clone(),
        pipeline: st.pipeline.clone(),
        steps: st.pipeline.steps().to_vec(),
        store_step: store_step.clone(),
        after_steps: st.pipeline.after_steps().to_vec(),
    }));

    let mut pr = PipelineResult::new();

    for step in st.pipeline.steps() {
        let order = counter.increment();
        tracing::info!(step = %step.display_name, order, "running step");

        let result = run_step(&st, &mut session, step, order, box_info.clone()).await;
        if !result.success {
            pr.mark_failed(&step.display_name, &result.message);
            tracing::warn!(step = %step.display_name, message = %result.message, "step failed");
            break;
        }
        tracing::info!(step = %step.display_name, "step passed");

        if st.options.should_commit {
            if let Err(error) = commit_box(&st, &repo, &tag, &message).await {
                tracing::warn!(%error, "failed to commit box");
            }
        }
    }

    let cancelled = *st.cancel.borrow();

    if st.options.should_commit && !cancelled {
        if let Err(error) = commit_box(&st, &repo, &tag, &message).await {
            tracing::warn!(%error, "failed to commit box");
        }
    }

    if !cancelled && (st.options.should_push || (pr.success && st.options.should_artifacts)) {
        run_store_phase(
            &st,
            &store_step,
            counter.increment(),
            box_info.clone(),
            &mut pr,
            &repo,
            &tag,
            &message,
        )
        .await;
    }

    if pr.success {
        tracing::info!("pipeline passed");
    } else {
        tracing::warn!(failed_step = %pr.failed_step_name, "pipeline failed");
    }

    // Finalized here; after-steps observe the result but never change it
    build_finisher.finish(pr.success);

    if !cancelled && !st.pipeline.after_steps().is_empty() {
        if let Err(err) = run_after_steps(&st, &counter, &pr).await {
            return Err(soft.exit(err));
        }
    }

    drop(session);

    if pr.success {
        Ok(())
    } else {
        Err(RunnerError::StepFailed(pr.failed_step_name.clone()))
    }
}

/// Resolve the source tree into the run's working directory, skipping VCS
/// metadata. The staged copy is what gets mounted into the box.
fn ensure_code(options: &PipelineOptions) -> Result<(), RunnerError> {
    let source = &options.source_dir;
    if !source.is_dir() {
        return Err(RunnerError::Environment(format!(
            "source directory does not exist: {}",
            source.display()
        )));
    }
    std::fs::create_dir_all(&options.working_dir).map_err(|e| {
        RunnerError::Environment(format!("unable to create working directory: {}", e))
    })?;
    // The working directory commonly nests inside the source tree; resolve
    // both so the copy can skip it instead of recursing into itself.
    let working = options.working_dir.canonicalize().map_err(|e| {
        RunnerError::Environment(format!("unable to resolve working directory: {}", e))
    })?;
    let staged = working.join("source");
    if staged.exists() {
        std::fs::remove_dir_all(&staged).map_err(|e| {
            RunnerError::Environment(format!("unable to clear staging directory: {}", e))
        })?;
    }
    copy_tree(source, &staged, &working)
        .map_err(|e| RunnerError::Environment(format!("unable to stage source tree: {}", e)))?;
    tracing::debug!(staged = %staged.display(), "source tree staged");
    Ok(())
}

fn copy_tree(from: &Path, to: &Path, skip: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        let path = entry.path();
        if path
            .canonicalize()
            .map(|p| p == skip)
            .unwrap_or(false)
        {
            continue;
        }
        let target = to.join(&name);
        if entry.file_type()?.is_dir() {
            copy_tree(&path, &target, skip)?;
        } else {
            std::fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

/// Provision the box, start it, attach a session, and export the base
/// environment. The box is parked in the shared slot before anything
/// fallible happens so cleanup always sees it.
async fn setup_environment<C: ContainerClient, S: ObjectStore>(
    st: &RunState<C, S>,
) -> Result<Session, RunnerError> {
    let session = {
        let mut guard = st.box_slot.lock().await;
        *guard = Some(PipelineBox::new(
            st.client.clone(),
            &st.options,
            &st.pipeline,
        ));
        let bx = guard
            .as_mut()
            .ok_or_else(|| RunnerError::Internal("box slot drained early".to_string()))?;

        bx.provision()
            .await
            .map_err(|e| RunnerError::Environment(format!("unable to provision box: {}", e)))?;
        bx.run()
            .await
            .map_err(|e| RunnerError::Environment(format!("unable to start box: {}", e)))?;
        bx.new_session()
            .map_err(|e| RunnerError::Environment(format!("unable to attach session: {}", e)))?
    };

    session
        .export_environment(st.pipeline.env_exports())
        .await
        .map_err(|e| RunnerError::Environment(format!("unable to export environment: {}", e)))?;
    Ok(session)
}

async fn current_box_info<C: ContainerClient, S: ObjectStore>(
    st: &RunState<C, S>,
) -> Option<BoxInfo> {
    st.box_slot.lock().await.as_ref().map(|b| b.info())
}

async fn commit_box<C: ContainerClient, S: ObjectStore>(
    st: &RunState<C, S>,
    repo: &str,
    tag: &str,
    message: &str,
) -> Result<(), BoxError> {
    let mut guard = st.box_slot.lock().await;
    match guard.as_mut() {
        Some(bx) => bx.commit(repo, tag, message).await.map(|_| ()),
        None => Ok(()),
    }
}

/// Run one step with its Started/Finished envelope, streaming output into
/// `Logs` events. Cancellation terminates the in-flight command and reports
/// the step as cancelled.
async fn run_step<C: ContainerClient, S: ObjectStore>(
    st: &RunState<C, S>,
    session: &mut Session,
    step: &Step,
    order: u32,
    box_info: Option<BoxInfo>,
) -> StepResult {
    let finisher = StepFinisher::start(
        st.emitter.clone(),
        st.options.clone(),
        box_info,
        step.clone(),
        order,
    );

    let result = if *st.cancel.borrow() {
        StepResult::failed("cancelled", -1)
    } else {
        let emitter = st.emitter.clone();
        let log_step = step.clone();
        let mut sink = move |stream: StreamKind, line: &str| {
            emitter.emit(Event::Logs(LogsArgs {
                step: log_step.clone(),
                order,
                stream,
                output: line.to_string(),
            }));
        };
        let timeout = step
            .timeout_secs
            .map(std::time::Duration::from_secs)
            .unwrap_or(st.options.step_timeout);
        let mut cancel = st.cancel.clone();
        tokio::select! {
            result = execute_step(session, step, timeout, &mut sink) => result,
            _ = cancel.changed() => StepResult::failed("cancelled", -1),
        }
    };

    finisher.finish(&result);
    result
}

#[derive(Debug, Error)]
enum StorePhaseError {
    #[error(transparent)]
    Box(#[from] BoxError),
    #[error(transparent)]
    Artifact(#[from] ArtificerError),
    #[error("box is gone")]
    BoxGone,
}

/// The synthetic step delivering commit/push/artifact. It can downgrade an
/// otherwise-passing result but never upgrades one that already failed.
#[allow(clippy::too_many_arguments)]
async fn run_store_phase<C: ContainerClient, S: ObjectStore>(
    st: &RunState<C, S>,
    store_step: &Step,
    order: u32,
    box_info: Option<BoxInfo>,
    pr: &mut PipelineResult,
    repo: &str,
    tag: &str,
    message: &str,
) {
    let finisher = StepFinisher::start(
        st.emitter.clone(),
        st.options.clone(),
        box_info,
        store_step.clone(),
        order,
    );
    let mut sr = StepResult::failed("", 1);
    let prior = pr.clone();

    pr.failed_step_name = store_step.name.clone();

    let outcome = store_inner(st, pr, &mut sr, repo, tag, message).await;
    match outcome {
        Ok(()) => {
            if prior.success {
                pr.success = true;
                pr.failed_step_name.clear();
                pr.failed_step_message.clear();
            } else {
                // Delivery worked, but a failed step stays failed
                *pr = prior;
            }
            sr.success = true;
            sr.exit_code = 0;
            sr.message.clear();
        }
        Err(error) => {
            pr.success = false;
            sr.message = pr.failed_step_message.clone();
            tracing::error!(%error, "unable to store pipeline output");
        }
    }

    finisher.finish(&sr);
}

async fn store_inner<C: ContainerClient, S: ObjectStore>(
    st: &RunState<C, S>,
    pr: &mut PipelineResult,
    sr: &mut StepResult,
    repo: &str,
    tag: &str,
    message: &str,
) -> Result<(), StorePhaseError> {
    if st.options.should_push {
        pr.failed_step_message = "Unable to push to registry".to_string();

        let mut guard = st.box_slot.lock().await;
        let bx = guard.as_mut().ok_or(StorePhaseError::BoxGone)?;
        // Pushing without a prior commit implies one
        if !bx.has_commit() {
            bx.commit(repo, tag, message).await?;
        }

        let push_options = PushOptions {
            registry: st.options.registry.clone(),
            repo: repo.to_string(),
            tag: tag.to_string(),
            message: message.to_string(),
        };
        let auth = if st.options.auth_token.is_empty() {
            RegistryAuth::anonymous()
        } else {
            RegistryAuth {
                username: st.options.auth_token.clone(),
                password: st.options.auth_token.clone(),
                server_address: st.options.registry.clone(),
            }
        };
        let digest = bx.push(&push_options, &auth).await?;
        tracing::info!(digest = %digest, "image pushed");
    }

    if pr.success && st.options.should_artifacts {
        pr.failed_step_message = "Unable to store pipeline output".to_string();

        let artificer = Artificer::new(st.store.clone(), st.options.clone());
        let mut artifact = {
            let guard = st.box_slot.lock().await;
            let bx = guard.as_ref().ok_or(StorePhaseError::BoxGone)?;
            artificer.collect(bx, &st.pipeline).await?
        };
        artificer.upload(&mut artifact).await?;

        sr.package_url = artifact.url.clone().unwrap_or_default();
        sr.artifact = Some(artifact);
    }

    Ok(())
}

/// Restart the box into a fresh environment, export the base env plus the
/// pipeline result, and run the after-steps. A failing after-step breaks the
/// loop without touching the finalized result.
async fn run_after_steps<C: ContainerClient, S: ObjectStore>(
    st: &RunState<C, S>,
    counter: &Counter,
    pr: &PipelineResult,
) -> Result<(), RunnerError> {
    tracing::info!("starting after-steps");

    let mut session = {
        let mut guard = st.box_slot.lock().await;
        let bx = guard
            .as_mut()
            .ok_or_else(|| RunnerError::Internal("box is gone".to_string()))?;
        bx.restart()
            .await
            .map_err(|e| RunnerError::Environment(format!("unable to restart box: {}", e)))?;
        bx.new_session()
            .map_err(|e| RunnerError::Environment(format!("unable to attach session: {}", e)))?
    };
    let box_info = current_box_info(st).await;

    session
        .export_environment(st.pipeline.env_exports())
        .await
        .map_err(|e| RunnerError::Environment(format!("unable to export environment: {}", e)))?;
    session
        .export_environment(&pr.env_exports())
        .await
        .map_err(|e| RunnerError::Environment(format!("unable to export result: {}", e)))?;

    for step in st.pipeline.after_steps() {
        let order = counter.increment();
        tracing::info!(step = %step.display_name, order, "running after-step");

        let result = run_step(st, &mut session, step, order, box_info.clone()).await;
        if !result.success {
            tracing::warn!(step = %step.display_name, "after-step failed");
            break;
        }
        tracing::info!(step = %step.display_name, "after-step passed");
    }

    Ok(())
}
