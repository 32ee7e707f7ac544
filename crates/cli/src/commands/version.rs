// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The version command

use serde::Serialize;

#[derive(Serialize)]
struct Versions {
    version: &'static str,
    #[serde(rename = "gitCommit")]
    git_commit: &'static str,
}

pub fn handle(json: bool) -> i32 {
    let versions = Versions {
        version: env!("CARGO_PKG_VERSION"),
        git_commit: option_env!("WERCKER_GIT_COMMIT").unwrap_or("unknown"),
    };

    if json {
        match serde_json::to_string_pretty(&versions) {
            Ok(out) => println!("{}", out),
            Err(error) => {
                tracing::error!(%error, "unable to render version information");
                return 1;
            }
        }
    } else {
        println!("Version: {}", versions.version);
        println!("Git commit: {}", versions.git_commit);
    }
    0
}
