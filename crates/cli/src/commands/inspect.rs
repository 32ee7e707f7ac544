// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The inspect command

use super::env_var;
use clap::Args;

#[derive(Args)]
pub struct InspectArgs {
    /// Image repository, e.g. `acme/app`; defaults to the application
    /// identity from the environment
    pub repo: Option<String>,

    /// Tag to inspect
    #[arg(long, default_value = "latest")]
    pub tag: String,
}

/// Run a shell inside a recently built image, inheriting the terminal.
pub async fn handle(args: InspectArgs) -> i32 {
    let repo = match args.repo.or_else(application_repo) {
        Some(repo) => repo,
        None => {
            tracing::error!("no repository given and no application identity in the environment");
            return 2;
        }
    };
    let image = format!("{}:{}", repo, args.tag);
    println!("Inspecting {}", image);

    let status = tokio::process::Command::new("docker")
        .args(["run", "--rm", "--interactive", "--tty", &image, "/bin/sh"])
        .status()
        .await;

    match status {
        Ok(status) if status.success() => 0,
        Ok(_) => 1,
        Err(error) => {
            tracing::error!(%error, "unable to run the container");
            1
        }
    }
}

fn application_repo() -> Option<String> {
    let owner = env_var("WERCKER_APPLICATION_OWNER_NAME")?;
    let name = env_var("WERCKER_APPLICATION_NAME")?;
    Some(format!("{}/{}", owner, name))
}
