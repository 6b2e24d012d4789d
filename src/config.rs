//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Ion.
//! The Ion project belongs to the Dunimd project team.
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

//! Iteration policy extracted from a caller-supplied parameter mapping.
//!
//! Extraction is a pure, total function: missing or wrong-typed fields fall
//! back to defaults, never to an error. The parameter keys are the ones the
//! front end submits alongside the plugin's own parameters.

use serde::{Deserialize, Serialize};

use crate::params::{param_bool, param_u64, IonParams};

/// Parameter key enabling repeated execution.
pub const PARAM_ITERATE: &str = "continueToIterate";
/// Parameter key bounding the number of iterations (0 = unbounded).
pub const PARAM_MAX_ITERATIONS: &str = "maxIterations";
/// Parameter key for the inter-iteration delay in milliseconds.
pub const PARAM_ITERATION_DELAY: &str = "iterationDelay";
/// Parameter key controlling whether an erroring iteration halts the run.
pub const PARAM_CONTINUE_ON_ERROR: &str = "continueOnError";

/// Iteration policy for one invocation. Derived once, immutable thereafter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IonExecutionConfig {
    /// Whether the caller requested iterative execution.
    pub iterate: bool,
    /// Maximum number of iterations; 0 means unbounded.
    pub max_iterations: u32,
    /// Delay between iterations in milliseconds.
    pub iteration_delay_ms: u64,
    /// Whether an erroring iteration should be continued past.
    pub continue_on_error: bool,
}

impl Default for IonExecutionConfig {
    fn default() -> Self {
        IonExecutionConfig {
            iterate: false,
            max_iterations: 0,
            iteration_delay_ms: 1000,
            continue_on_error: false,
        }
    }
}

/// Extracts the iteration policy from a parameter mapping. Total: fields
/// that are absent or of the wrong type keep their defaults.
pub fn extract_config(params: &IonParams) -> IonExecutionConfig {
    let mut config = IonExecutionConfig::default();

    if let Some(iterate) = param_bool(params, PARAM_ITERATE) {
        config.iterate = iterate;
    }
    if let Some(max) = param_u64(params, PARAM_MAX_ITERATIONS) {
        config.max_iterations = max as u32;
    }
    if let Some(delay) = param_u64(params, PARAM_ITERATION_DELAY) {
        config.iteration_delay_ms = delay;
    }
    if let Some(continue_on_error) = param_bool(params, PARAM_CONTINUE_ON_ERROR) {
        config.continue_on_error = continue_on_error;
    }

    config
}
