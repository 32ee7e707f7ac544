// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console reporting for pipeline runs
//!
//! Step banners and container output go to the terminal; structured logging
//! stays on the tracing layer.

use wercker_core::{Emitter, Event, EventKind, StreamKind};

pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Register the console listeners on a runner's emitter.
    pub fn attach(emitter: &Emitter) {
        emitter.add_listener(EventKind::BuildStepStarted, "console", |event| {
            if let Event::BuildStepStarted(args) = event {
                println!("============ Running {} ============", args.step.display_name);
            }
        });
        emitter.add_listener(EventKind::Logs, "console", |event| {
            if let Event::Logs(args) = event {
                match args.stream {
                    StreamKind::Stdout => println!("{}", args.output),
                    StreamKind::Stderr => eprintln!("{}", args.output),
                }
            }
        });
        emitter.add_listener(EventKind::BuildStepFinished, "console", |event| {
            if let Event::BuildStepFinished(args) = event {
                if args.successful {
                    println!("============ {} passed ============", args.step.display_name);
                } else {
                    println!(
                        "============ {} failed: {} ============",
                        args.step.display_name, args.message
                    );
                }
            }
        });
        emitter.add_listener(EventKind::BuildFinished, "console", |event| {
            if let Event::BuildFinished(args) = event {
                println!("########### Pipeline {} ##############", args.result);
            }
        });
    }
}
