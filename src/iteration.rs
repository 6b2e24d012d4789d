//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Ion.
//! The Ion project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Iteration Module
//!
//! Repeated execution of a handler's iteration hook under a policy, with
//! cooperative cancellation and accumulated history.
//!
//! ## Lifecycle
//!
//! A manager is created per invocation: `start` transitions Idle→Running and
//! spawns the loop on its own task, the loop runs until a stop condition
//! fires, then the manager transitions back to Idle and signals completion
//! exactly once. Managers are not reused: create a fresh one for each run.
//!
//! ## Stop Conditions
//!
//! Checked between steps, in order: a cooperative stop request, the
//! iteration limit, a handler step that declines to continue, or an error
//! when `continue_on_error` is off. An in-flight step is never interrupted,
//! so a stop request is observed after at most one more completed iteration.
//!
//! ## Concurrency
//!
//! The loop task is the only writer of the result log; `get_results` and
//! `is_running` may be called from any task while the run is in progress
//! and observe a consistent prefix.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::config::{extract_config, IonExecutionConfig};
use crate::errors::{IonError, Result};
use crate::handler::IonHandler;
use crate::params::IonParams;

/// Result of one iteration step, appended (never mutated) to the run's
/// history. Serialized field names match the wire shape front ends consume.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IonIterationResult {
    /// Zero-based step index; indices are contiguous and strictly ordered.
    #[serde(rename = "iterationCount")]
    pub index: u32,
    /// Value produced by the step, if it did not error.
    pub result: Option<Value>,
    /// Whether another step follows this one.
    #[serde(rename = "continueIteration")]
    pub continue_iteration: bool,
    /// Error message, if the step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time this step completed.
    pub timestamp: DateTime<Utc>,
}

/// State shared between the manager handle and the loop task.
struct IterationState {
    results: Mutex<Vec<IonIterationResult>>,
    stop_requested: AtomicBool,
    /// `true` while a run is in progress. Doubles as the completion signal:
    /// the transition back to `false` is the run finishing.
    running: watch::Sender<bool>,
}

/// Drives repeated execution of an iterable handler.
pub struct IonIterationManager {
    handler: Arc<dyn IonHandler>,
    config: IonExecutionConfig,
    state: Arc<IterationState>,
}

impl IonIterationManager {
    pub fn new(handler: Arc<dyn IonHandler>, config: IonExecutionConfig) -> Self {
        let (running, _) = watch::channel(false);
        IonIterationManager {
            handler,
            config,
            state: Arc::new(IterationState {
                results: Mutex::new(Vec::new()),
                stop_requested: AtomicBool::new(false),
                running,
            }),
        }
    }

    /// Begins the iteration run.
    ///
    /// Fails with `AlreadyRunning` while a run is in progress and with
    /// `UnsupportedIteration` when the handler has no iteration capability.
    /// On success the loop runs on its own task and this call returns
    /// immediately; prior results are cleared.
    pub fn start(&self, params: IonParams) -> Result<()> {
        if self.is_running() {
            return Err(IonError::AlreadyRunning);
        }
        if !self.handler.supports_iteration() {
            return Err(IonError::UnsupportedIteration);
        }

        // Atomic Idle→Running transition; a concurrent start loses here.
        let acquired = self.state.running.send_if_modified(|running| {
            if *running {
                false
            } else {
                *running = true;
                true
            }
        });
        if !acquired {
            return Err(IonError::AlreadyRunning);
        }

        self.state.stop_requested.store(false, Ordering::SeqCst);
        self.state.results.lock().unwrap().clear();

        let state = Arc::clone(&self.state);
        let handler = Arc::clone(&self.handler);
        let config = self.config.clone();
        tokio::spawn(async move {
            run_loop(state, handler, config, params).await;
        });

        Ok(())
    }

    /// Requests a cooperative stop. No effect unless a run is in progress;
    /// the loop observes the request between steps, never mid-step.
    pub fn stop(&self) {
        if self.is_running() {
            self.state.stop_requested.store(true, Ordering::SeqCst);
        }
    }

    /// Whether a run is currently in progress.
    pub fn is_running(&self) -> bool {
        *self.state.running.borrow()
    }

    /// Snapshot of the results accumulated so far. Safe to call while the
    /// run is in progress; reflects a consistent prefix of the history.
    pub fn get_results(&self) -> Vec<IonIterationResult> {
        self.state.results.lock().unwrap().clone()
    }

    /// Suspends until the current run signals completion.
    ///
    /// On a manager that was never started this returns immediately; that
    /// is the documented contract, not an accident of channel state.
    pub async fn wait_for_completion(&self) {
        let mut rx = self.state.running.subscribe();
        while *rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// The iteration loop. Runs on its own task; the inter-iteration delay and
/// any blocking work inside the handler suspend only this task.
async fn run_loop(
    state: Arc<IterationState>,
    handler: Arc<dyn IonHandler>,
    config: IonExecutionConfig,
    params: IonParams,
) {
    let mut index: u32 = 0;

    loop {
        if state.stop_requested.load(Ordering::SeqCst) {
            log::debug!(
                "iteration.run.stopped: cooperative stop observed - index={}",
                index
            );
            break;
        }
        if config.max_iterations > 0 && index >= config.max_iterations {
            break;
        }

        let step = handler.execute_iteration(&params, index).await;

        let mut entry = IonIterationResult {
            index,
            result: None,
            continue_iteration: false,
            error: None,
            timestamp: Utc::now(),
        };
        let halt = match step {
            Ok(step) => {
                entry.continue_iteration = step.continue_iteration;
                entry.result = Some(step.value);
                !entry.continue_iteration
            }
            Err(err) => {
                // An erroring step continues only under the error policy.
                entry.continue_iteration = config.continue_on_error;
                entry.error = Some(err.to_string());
                !config.continue_on_error
            }
        };

        state.results.lock().unwrap().push(entry);

        if halt {
            break;
        }

        index += 1;

        if config.iteration_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.iteration_delay_ms)).await;
        }
    }

    // Running→Idle; the watch transition is the one-shot completion signal.
    state.running.send_replace(false);
}

/// Executes a handler honoring the iteration policy carried in `params`.
///
/// Without an iteration request (or for a non-iterable handler) this is a
/// single `execute` call. With one, it drives a full run to completion and
/// returns the accumulated history in the envelope front ends expect.
pub async fn run_with_iteration(
    handler: Arc<dyn IonHandler>,
    params: &IonParams,
) -> Result<Value> {
    let config = extract_config(params);

    if !config.iterate || !handler.supports_iteration() {
        return handler.execute(params).await;
    }

    let manager = IonIterationManager::new(handler, config);
    manager.start(params.clone())?;
    manager.wait_for_completion().await;

    let results = manager.get_results();
    Ok(json!({
        "iterationResults": results,
        "iterationCount": results.len(),
        "lastIteration": Utc::now(),
        "params": params,
    }))
}
