// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Periodic background task scaffolding.
//!
//! Sweep, poll, and heartbeat loops all share the same shape: run an async
//! closure on a fixed interval until stopped. [`PeriodicTask`] makes that an
//! explicit object with `start`/`stop`:
//!
//! - `start` guards against double-start
//! - `stop` signals the loop and then blocks until the in-flight iteration
//!   finishes — no iteration is ever abandoned mid-flight
//! - the first iteration runs immediately on start

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::TaskError;

// =============================================================================
// PeriodicTask
// =============================================================================

/// A named background loop with explicit start/stop.
pub struct PeriodicTask {
    name: String,
    interval: Duration,
    running: Mutex<Option<RunningLoop>>,
}

struct RunningLoop {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Creates a task that will run on the given interval once started.
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            running: Mutex::new(None),
        }
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Starts the loop.
    ///
    /// The closure is invoked immediately, then once per interval. Each
    /// iteration runs to completion before the stop signal is observed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::AlreadyRunning`] if the loop was already started.
    pub fn start<F, Fut>(&self, mut iteration: F) -> Result<(), TaskError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut guard = self.running.lock();
        if guard.is_some() {
            return Err(TaskError::already_running(&self.name));
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let name = self.name.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            debug!(task = %name, interval = ?interval, "Periodic task started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        iteration().await;
                    }
                    _ = stop_rx.changed() => {
                        break;
                    }
                }
            }

            debug!(task = %name, "Periodic task stopped");
        });

        *guard = Some(RunningLoop {
            stop: stop_tx,
            handle,
        });

        Ok(())
    }

    /// Stops the loop and waits for the in-flight iteration to finish.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotRunning`] if the loop was never started
    /// - [`TaskError::Aborted`] if the loop panicked
    pub async fn stop(&self) -> Result<(), TaskError> {
        let running = self
            .running
            .lock()
            .take()
            .ok_or_else(|| TaskError::not_running(&self.name))?;

        // Wake the loop; if it is mid-iteration the signal is observed once
        // the iteration completes.
        let _ = running.stop.send(true);

        running
            .handle
            .await
            .map_err(|err| TaskError::aborted(&self.name, err.to_string()))
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
