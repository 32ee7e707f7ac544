// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pull command

use super::{env_var, login};
use clap::Args;
use wercker_adapters::{ContainerClient, DockerCli, RegistryAuth};

#[derive(Args)]
pub struct PullArgs {
    /// Repository to pull, e.g. `acme/app`
    pub repo: String,

    /// Tag to pull
    #[arg(default_value = "latest")]
    pub tag: String,

    /// Source registry
    #[arg(long)]
    pub registry: Option<String>,

    /// Registry credential; falls back to the stored login token
    #[arg(long)]
    pub auth_token: Option<String>,
}

pub async fn handle(args: PullArgs) -> i32 {
    let client = match DockerCli::connect() {
        Ok(client) => client,
        Err(error) => {
            tracing::error!(%error, "container runtime unavailable");
            return 1;
        }
    };

    let registry = args
        .registry
        .or_else(|| env_var("WERCKER_REGISTRY"))
        .unwrap_or_default();
    let image = if registry.is_empty() {
        format!("{}:{}", args.repo, args.tag)
    } else {
        format!("{}/{}:{}", registry, args.repo, args.tag)
    };

    let auth = match args
        .auth_token
        .or_else(|| env_var("WERCKER_AUTH_TOKEN"))
        .or_else(login::saved_token)
    {
        Some(token) => RegistryAuth {
            username: token.clone(),
            password: token,
            server_address: registry,
        },
        None => RegistryAuth::anonymous(),
    };

    println!("Pulling {}", image);
    match client.pull_image(&image, &auth).await {
        Ok(()) => 0,
        Err(error) => {
            tracing::error!(%error, image = %image, "pull failed");
            1
        }
    }
}
