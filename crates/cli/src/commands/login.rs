// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The login command and token storage

use super::env_var;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

pub async fn handle() -> i32 {
    println!("########### Logging into wercker ###########");

    let username = match inquire::Text::new("Username:").prompt() {
        Ok(username) => username,
        Err(_) => return 1,
    };
    let password = match inquire::Password::new("Password:")
        .without_confirmation()
        .prompt()
    {
        Ok(password) => password,
        Err(_) => return 1,
    };

    match fetch_token(&username, &password).await {
        Ok(token) => match save_token(&token) {
            Ok(path) => {
                println!("Token saved to {}", path.display());
                0
            }
            Err(error) => {
                tracing::error!(%error, "unable to save token");
                1
            }
        },
        Err(error) => {
            tracing::error!(%error, "unable to log in");
            1
        }
    }
}

async fn fetch_token(username: &str, password: &str) -> Result<String> {
    let base_url =
        env_var("WERCKER_BASE_URL").unwrap_or_else(|| "https://app.wercker.com".to_string());
    let url = format!(
        "{}/api/1.0/oauth/basicauthaccesstoken",
        base_url.trim_end_matches('/')
    );

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .json(&serde_json::json!({
            "username": username,
            "password": password,
        }))
        .send()
        .await
        .with_context(|| format!("unable to reach {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!("login rejected: {}", response.status()));
    }
    let body: TokenResponse = response
        .json()
        .await
        .context("unexpected login response body")?;
    Ok(body.token)
}

fn save_token(token: &str) -> Result<PathBuf> {
    let path = token_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, token)?;
    Ok(path)
}

/// The token stored by a previous login, if any.
pub fn saved_token() -> Option<String> {
    std::fs::read_to_string(token_path())
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn token_path() -> PathBuf {
    if let Some(path) = env_var("WERCKER_TOKEN_FILE") {
        return PathBuf::from(path);
    }
    let home = env_var("HOME").unwrap_or_else(|| ".".to_string());
    PathBuf::from(home).join(".wercker").join("token")
}
