// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bidirectional command channel into a running box
//!
//! A session drives the container's shell over attached stdio. Commands are
//! terminated with a tokened exit marker so the exit code can be read back
//! out of the stream.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use wercker_adapters::{ContainerIo, OutputChunk, EXIT_MARKER};
use wercker_core::StreamKind;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session closed")]
    Closed,
    #[error("command timed out")]
    TimedOut,
}

/// A byte-oriented channel bound to exactly one running container. Not
/// restartable: a box stop or restart invalidates it and a new session must
/// be attached.
#[derive(Debug)]
pub struct Session {
    stdin: mpsc::Sender<Vec<u8>>,
    output: mpsc::Receiver<OutputChunk>,
}

impl Session {
    pub fn new(io: ContainerIo) -> Self {
        Self {
            stdin: io.stdin,
            output: io.output,
        }
    }

    /// Write raw bytes to the container's stdin.
    pub async fn send(&self, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.stdin.send(bytes).await.map_err(|_| SessionError::Closed)
    }

    /// Receive the next tagged output chunk. Returns `None` once the
    /// container closes its streams.
    pub async fn recv(&mut self) -> Option<OutputChunk> {
        self.output.recv().await
    }

    /// Inject environment into the shell context of subsequent commands.
    pub async fn export_environment(&self, pairs: &[(String, String)]) -> Result<(), SessionError> {
        if pairs.is_empty() {
            return Ok(());
        }
        let mut script = String::new();
        for (key, value) in pairs {
            script.push_str(&format!(
                "export {}='{}'\n",
                key,
                value.replace('\'', "'\\''")
            ));
        }
        self.send(script.into_bytes()).await
    }

    /// Run one command: send the script with an exit marker appended, stream
    /// every output line into `sink`, and return the parsed exit code.
    pub async fn run_command(
        &mut self,
        script: &str,
        timeout: Duration,
        sink: &mut (dyn FnMut(StreamKind, &str) + Send),
    ) -> Result<i32, SessionError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let payload = format!("{}\necho \"{} {} $?\"\n", script, EXIT_MARKER, token);
        self.send(payload.into_bytes()).await?;

        let deadline = tokio::time::Instant::now() + timeout;
        let mut stdout_buf = String::new();
        let mut stderr_buf = String::new();

        loop {
            let chunk = match tokio::time::timeout_at(deadline, self.output.recv()).await {
                Err(_) => return Err(SessionError::TimedOut),
                Ok(None) => return Err(SessionError::Closed),
                Ok(Some(chunk)) => chunk,
            };

            let text = String::from_utf8_lossy(&chunk.data).into_owned();
            let buf = match chunk.stream {
                StreamKind::Stdout => &mut stdout_buf,
                StreamKind::Stderr => &mut stderr_buf,
            };
            buf.push_str(&text);

            while let Some(pos) = buf.find('\n') {
                let line: String = buf.drain(..=pos).collect();
                let line = line.trim_end_matches(['\n', '\r']);

                if chunk.stream == StreamKind::Stdout {
                    if let Some(rest) = line.trim().strip_prefix(EXIT_MARKER) {
                        let mut fields = rest.split_whitespace();
                        if fields.next() == Some(token.as_str()) {
                            let exit_code =
                                fields.next().and_then(|c| c.parse().ok()).unwrap_or(-1);
                            return Ok(exit_code);
                        }
                        // Stale marker from an earlier command; not output.
                        continue;
                    }
                }
                sink(chunk.stream, line);
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
