//! The build and deploy commands

use super::{env_var, login};
use crate::output::ConsoleReporter;
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wercker_adapters::{DockerCli, NoOpStore, ObjectStore, S3Store};
use wercker_core::{
    get_build_pipeline, get_deploy_pipeline, Config, PipelineOptions, RunKind,
};
use wercker_engine::{MetricsHandler, Runner, RunnerError};

#[derive(Args)]
pub struct RunArgs {
    /// Correlation id for this run; generated when omitted
    #[arg(long)]
    pub id: Option<String>,

    /// Commit the box image after each passing step
    #[arg(long)]
    pub commit: bool,

    /// Push the committed image to the registry
    #[arg(long)]
    pub push: bool,

    /// Upload the pipeline output on success
    #[arg(long)]
    pub artifacts: bool,

    /// Keep the container around after the run
    #[arg(long)]
    pub no_remove: bool,

    /// Destination registry for push
    #[arg(long)]
    pub registry: Option<String>,

    /// Registry credential; falls back to the stored login token
    #[arg(long)]
    pub auth_token: Option<String>,

    /// Tag for committed images
    #[arg(long)]
    pub tag: Option<String>,

    /// Project source tree
    #[arg(long, default_value = ".")]
    pub source_dir: PathBuf,

    /// Scratch directory for the run
    #[arg(long, default_value = ".wercker")]
    pub working_dir: PathBuf,

    /// Per-step timeout in seconds
    #[arg(long, default_value_t = 600)]
    pub step_timeout: u64,
}

pub async fn handle(kind: RunKind, args: RunArgs, config_path: &Path, debug: bool) -> i32 {
    let options = build_options(kind, args, debug);

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, path = %config_path.display(), "unable to load configuration");
            return 2;
        }
    };

    let client = match DockerCli::connect() {
        Ok(client) => client,
        Err(error) => {
            tracing::error!(%error, "container runtime unavailable");
            return 1;
        }
    };

    let result = match s3_store_from_env().await {
        Some(store) => execute(kind, options, config, client, store).await,
        None => execute(kind, options, config, client, NoOpStore::new()).await,
    };

    match result {
        Ok(()) => 0,
        Err(error) => error.exit_code(),
    }
}

async fn execute<S: ObjectStore>(
    kind: RunKind,
    options: PipelineOptions,
    config: Config,
    client: DockerCli,
    store: S,
) -> Result<(), RunnerError> {
    let (runner, cancel) = Runner::new(options.clone(), config, client, store);

    ConsoleReporter::attach(runner.emitter());
    if let Some(endpoint) = env_var("WERCKER_TELEMETRY_ENDPOINT") {
        match MetricsHandler::new(&endpoint, options.debug) {
            Ok(metrics) => metrics.listen_to(runner.emitter()),
            Err(error) => tracing::debug!(%error, "telemetry disabled"),
        }
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling pipeline");
            cancel.cancel();
        }
    });

    let get_pipeline: wercker_core::GetPipeline = match kind {
        RunKind::Build => get_build_pipeline,
        RunKind::Deploy => get_deploy_pipeline,
    };
    runner.execute(get_pipeline).await
}

fn build_options(kind: RunKind, args: RunArgs, debug: bool) -> PipelineOptions {
    let id = args.id.or_else(|| {
        env_var(match kind {
            RunKind::Build => "WERCKER_BUILD_ID",
            RunKind::Deploy => "WERCKER_DEPLOY_ID",
        })
    });
    let mut options = match kind {
        RunKind::Build => PipelineOptions::for_build(id),
        RunKind::Deploy => PipelineOptions::for_deploy(id),
    };

    options.should_commit = args.commit;
    options.should_push = args.push;
    options.should_artifacts = args.artifacts;
    options.should_remove = !args.no_remove;
    options.debug = debug;

    if let Some(registry) = args.registry.or_else(|| env_var("WERCKER_REGISTRY")) {
        options.registry = registry;
    }
    if let Some(token) = args
        .auth_token
        .or_else(|| env_var("WERCKER_AUTH_TOKEN"))
        .or_else(login::saved_token)
    {
        options.auth_token = token;
    }
    if let Some(tag) = args.tag {
        options.tag = tag;
    }

    options.application_id =
        env_var("WERCKER_APPLICATION_ID").unwrap_or_else(|| options.run_id().to_string());
    options.application_name = env_var("WERCKER_APPLICATION_NAME").unwrap_or_else(|| {
        args.source_dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "app".to_string())
    });
    options.application_owner_name = env_var("WERCKER_APPLICATION_OWNER_NAME")
        .or_else(|| env_var("USER"))
        .unwrap_or_else(|| "unknown".to_string());
    options.application_started_by_name = env_var("WERCKER_STARTED_BY")
        .unwrap_or_else(|| options.application_owner_name.clone());

    if let Some(endpoint) = env_var("WERCKER_ENDPOINT") {
        options.wercker_endpoint = endpoint;
    }
    if let Some(base_url) = env_var("WERCKER_BASE_URL") {
        options.base_url = base_url;
    }

    options.source_dir = args.source_dir;
    options.working_dir = args.working_dir;
    options.step_timeout = Duration::from_secs(args.step_timeout);
    options
}

/// Build the S3 store when the environment configures one.
async fn s3_store_from_env() -> Option<S3Store> {
    let endpoint = env_var("WERCKER_S3_ENDPOINT")?;
    let bucket = env_var("WERCKER_S3_BUCKET")?;
    let region = env_var("WERCKER_S3_REGION").unwrap_or_else(|| "us-east-1".to_string());
    let public_base =
        env_var("WERCKER_S3_PUBLIC_URL").unwrap_or_else(|| endpoint.clone());
    Some(S3Store::connect(&endpoint, &region, &bucket, &public_base).await)
}
