// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project language detection and starter configuration

use super::env_var;
use anyhow::{Context, Result};
use std::path::Path;

const CONFIG_FILE: &str = "wercker.toml";

pub async fn handle() -> i32 {
    println!("########### Detecting your project ###########");

    let detected = match detect_language(Path::new(".")) {
        Ok(Some(language)) => {
            println!("Detected: {}", language);
            language
        }
        Ok(None) => {
            println!("No stack detected, generating a default configuration");
            "default"
        }
        Err(error) => {
            tracing::error!(%error, "unable to inspect the current directory");
            return 1;
        }
    };

    if Path::new(CONFIG_FILE).exists() {
        let overwrite = inquire::Confirm::new(&format!("{} already exists. Overwrite?", CONFIG_FILE))
            .with_default(false)
            .prompt()
            .unwrap_or(false);
        if !overwrite {
            println!("Leaving {} untouched", CONFIG_FILE);
            return 0;
        }
    }

    match fetch_starter(detected).await {
        Ok(body) => {
            if let Err(error) = std::fs::write(CONFIG_FILE, body) {
                tracing::error!(%error, "unable to write {}", CONFIG_FILE);
                return 1;
            }
            println!("Wrote {}", CONFIG_FILE);
            0
        }
        Err(error) => {
            tracing::error!(%error, "unable to fetch a starter configuration");
            1
        }
    }
}

/// File-based heuristics, first match wins.
fn detect_language(dir: &Path) -> std::io::Result<Option<&'static str>> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        match name.as_ref() {
            "package.json" => return Ok(Some("nodejs")),
            "requirements.txt" => return Ok(Some("python")),
            "Gemfile" => return Ok(Some("ruby")),
            _ if name.ends_with(".go") => return Ok(Some("golang")),
            _ => {}
        }
    }
    Ok(None)
}

async fn fetch_starter(language: &str) -> Result<String> {
    let endpoint =
        env_var("WERCKER_ENDPOINT").unwrap_or_else(|| "https://app.wercker.com".to_string());
    let url = format!("{}/toml/{}", endpoint.trim_end_matches('/'), language);
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("unable to reach {}", url))?;
    response
        .error_for_status()
        .with_context(|| "starter configuration request rejected".to_string())?
        .text()
        .await
        .context("unable to read starter configuration body")
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
