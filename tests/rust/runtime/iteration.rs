//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Ion.
//! The Ion project belongs to the Dunimd project team.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use ionx::config::IonExecutionConfig;
use ionx::errors::{IonError, Result};
use ionx::handler::{IonHandler, IonIterationStep};
use ionx::iteration::{run_with_iteration, IonIterationManager};
use ionx::params::IonParams;

/// Iterable handler that always requests another step.
struct AlwaysContinue;

#[async_trait]
impl IonHandler for AlwaysContinue {
    async fn execute(&self, _params: &IonParams) -> Result<Value> {
        Ok(json!({"ok": true}))
    }

    fn supports_iteration(&self) -> bool {
        true
    }

    async fn execute_iteration(
        &self,
        _params: &IonParams,
        iteration: u32,
    ) -> Result<IonIterationStep> {
        Ok(IonIterationStep {
            value: json!({"step": iteration}),
            continue_iteration: true,
        })
    }
}

/// Iterable handler that declines to continue once `last_index` is reached.
struct StopsAfter {
    last_index: u32,
}

#[async_trait]
impl IonHandler for StopsAfter {
    async fn execute(&self, _params: &IonParams) -> Result<Value> {
        Ok(Value::Null)
    }

    fn supports_iteration(&self) -> bool {
        true
    }

    async fn execute_iteration(
        &self,
        _params: &IonParams,
        iteration: u32,
    ) -> Result<IonIterationStep> {
        Ok(IonIterationStep {
            value: json!({"step": iteration}),
            continue_iteration: iteration < self.last_index,
        })
    }
}

/// Iterable handler that fails on exactly one step index.
struct FailsAt {
    failing_index: u32,
}

#[async_trait]
impl IonHandler for FailsAt {
    async fn execute(&self, _params: &IonParams) -> Result<Value> {
        Ok(Value::Null)
    }

    fn supports_iteration(&self) -> bool {
        true
    }

    async fn execute_iteration(
        &self,
        _params: &IonParams,
        iteration: u32,
    ) -> Result<IonIterationStep> {
        if iteration == self.failing_index {
            return Err(IonError::internal(format!(
                "synthetic failure at step {}",
                iteration
            )));
        }
        Ok(IonIterationStep {
            value: json!({"step": iteration}),
            continue_iteration: true,
        })
    }
}

/// Iterable handler whose steps block until a permit is released.
struct Gated {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl IonHandler for Gated {
    async fn execute(&self, _params: &IonParams) -> Result<Value> {
        Ok(Value::Null)
    }

    fn supports_iteration(&self) -> bool {
        true
    }

    async fn execute_iteration(
        &self,
        _params: &IonParams,
        iteration: u32,
    ) -> Result<IonIterationStep> {
        let permit = self.gate.acquire().await.unwrap();
        permit.forget();
        Ok(IonIterationStep {
            value: json!({"step": iteration}),
            continue_iteration: false,
        })
    }
}

fn config(max_iterations: u32, continue_on_error: bool) -> IonExecutionConfig {
    IonExecutionConfig {
        iterate: true,
        max_iterations,
        iteration_delay_ms: 0,
        continue_on_error,
    }
}

#[tokio::test]
async fn bounded_run_produces_exactly_n_results() {
    let manager = IonIterationManager::new(Arc::new(AlwaysContinue), config(5, false));
    manager.start(IonParams::new()).unwrap();
    manager.wait_for_completion().await;

    let results = manager.get_results();
    assert_eq!(results.len(), 5);
    for (i, entry) in results.iter().enumerate() {
        assert_eq!(entry.index, i as u32);
        assert!(entry.error.is_none());
        assert_eq!(entry.result, Some(json!({"step": i})));
    }
    assert!(!manager.is_running());
}

#[tokio::test]
async fn unbounded_run_stops_when_handler_declines() {
    // Third call (index 2) is the first to report continue = false.
    let handler = Arc::new(StopsAfter { last_index: 1 });
    let manager = IonIterationManager::new(handler, config(0, false));
    manager.start(IonParams::new()).unwrap();
    manager.wait_for_completion().await;

    let results = manager.get_results();
    assert_eq!(results.len(), 3);
    assert!(!results[2].continue_iteration);
}

#[tokio::test]
async fn stop_halts_after_current_iteration() {
    let slow = IonExecutionConfig {
        iterate: true,
        max_iterations: 0,
        iteration_delay_ms: 50,
        continue_on_error: false,
    };
    let manager = IonIterationManager::new(Arc::new(AlwaysContinue), slow);
    manager.start(IonParams::new()).unwrap();

    // Let at least one iteration land, then request a cooperative stop.
    let mut waited = 0;
    while manager.get_results().is_empty() && waited < 2000 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += 10;
    }
    let seen = manager.get_results().len();
    manager.stop();
    manager.wait_for_completion().await;

    let results = manager.get_results();
    assert!(!manager.is_running());
    assert!(!results.is_empty());
    // At most one more iteration may complete after the request.
    assert!(results.len() <= seen + 1);
    for (i, entry) in results.iter().enumerate() {
        assert_eq!(entry.index, i as u32);
    }
}

#[tokio::test]
async fn first_error_is_last_entry_without_continue_on_error() {
    let handler = Arc::new(FailsAt { failing_index: 1 });
    let manager = IonIterationManager::new(handler, config(10, false));
    manager.start(IonParams::new()).unwrap();
    manager.wait_for_completion().await;

    let results = manager.get_results();
    assert_eq!(results.len(), 2);
    assert!(results[0].error.is_none());
    let last = &results[1];
    assert!(last.error.as_deref().unwrap().contains("synthetic failure"));
    assert!(last.result.is_none());
    assert!(!last.continue_iteration);
}

#[tokio::test]
async fn continue_on_error_records_error_and_runs_on() {
    let handler = Arc::new(FailsAt { failing_index: 2 });
    let manager = IonIterationManager::new(handler, config(5, true));
    manager.start(IonParams::new()).unwrap();
    manager.wait_for_completion().await;

    let results = manager.get_results();
    assert_eq!(results.len(), 5);
    for (i, entry) in results.iter().enumerate() {
        if i == 2 {
            assert!(entry.error.is_some());
            // The continue flag is forced to the error policy.
            assert!(entry.continue_iteration);
        } else {
            assert!(entry.error.is_none());
        }
    }
}

#[tokio::test]
async fn start_while_running_is_rejected_and_preserves_run() {
    let gate = Arc::new(Semaphore::new(0));
    let handler = Arc::new(Gated {
        gate: Arc::clone(&gate),
    });
    let manager = IonIterationManager::new(handler, config(0, false));

    manager.start(IonParams::new()).unwrap();
    assert!(manager.is_running());

    let second = manager.start(IonParams::new());
    assert!(matches!(second, Err(IonError::AlreadyRunning)));

    // Release the in-flight step; the original run completes untouched.
    gate.add_permits(1);
    manager.wait_for_completion().await;
    assert_eq!(manager.get_results().len(), 1);
}

#[tokio::test]
async fn non_iterable_handler_is_rejected() {
    struct SingleShot;

    #[async_trait]
    impl IonHandler for SingleShot {
        async fn execute(&self, _params: &IonParams) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    let manager = IonIterationManager::new(Arc::new(SingleShot), config(3, false));
    let err = manager.start(IonParams::new()).unwrap_err();
    assert!(matches!(err, IonError::UnsupportedIteration));
    assert!(manager.get_results().is_empty());
}

#[tokio::test]
async fn wait_on_never_started_manager_returns_immediately() {
    let manager = IonIterationManager::new(Arc::new(AlwaysContinue), config(3, false));
    // Documented contract: no run in progress, nothing to wait for.
    manager.wait_for_completion().await;
    assert!(!manager.is_running());
}

#[tokio::test]
async fn run_with_iteration_executes_once_without_policy() {
    let params = IonParams::new();
    let value = run_with_iteration(Arc::new(AlwaysContinue), &params)
        .await
        .unwrap();
    assert_eq!(value, json!({"ok": true}));
}

#[tokio::test]
async fn run_with_iteration_returns_history_envelope() {
    let mut params = IonParams::new();
    params.insert("continueToIterate".to_string(), json!(true));
    params.insert("maxIterations".to_string(), json!(3));
    params.insert("iterationDelay".to_string(), json!(0));

    let value = run_with_iteration(Arc::new(AlwaysContinue), &params)
        .await
        .unwrap();
    assert_eq!(value["iterationCount"], json!(3));
    assert_eq!(value["iterationResults"].as_array().unwrap().len(), 3);
    assert_eq!(value["iterationResults"][1]["iterationCount"], json!(1));
    assert_eq!(value["params"]["maxIterations"], json!(3));
}
