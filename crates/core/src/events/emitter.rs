// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous typed publish/subscribe bus

use super::payload::{Event, EventKind};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Registration {
    kind: EventKind,
    name: String,
    handler: Handler,
}

/// Dispatches lifecycle events to registered listeners, synchronously, in
/// registration order. A panicking listener is isolated: siblings still run
/// and nothing propagates to the emit site.
pub struct Emitter {
    listeners: Arc<Mutex<Vec<Registration>>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a named handler for one event kind. Registering the same
    /// `(kind, name)` pair again is a no-op.
    pub fn add_listener(
        &self,
        kind: EventKind,
        name: impl Into<String>,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) {
        let name = name.into();
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        if listeners
            .iter()
            .any(|r| r.kind == kind && r.name == name)
        {
            return;
        }
        listeners.push(Registration {
            kind,
            name,
            handler: Arc::new(handler),
        });
    }

    /// Dispatch an event to every listener registered for its kind.
    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        // Handlers may register further listeners; dispatch outside the lock.
        let matching: Vec<(String, Handler)> = {
            let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners
                .iter()
                .filter(|r| r.kind == kind)
                .map(|r| (r.name.clone(), Arc::clone(&r.handler)))
                .collect()
        };

        for (name, handler) in matching {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                tracing::error!(event = %kind, listener = %name, "event listener panicked");
            }
        }
    }

    /// Count of listeners registered for a kind.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Emitter {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
