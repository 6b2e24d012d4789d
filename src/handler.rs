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

//! # Handler Module
//!
//! The in-process callable contract through which a plugin's logic is
//! invoked, however it was resolved (native table, compiled module, or
//! subprocess entry point).
//!
//! ## Capability Set
//!
//! - `execute`: run the plugin once against a parameter mapping
//! - `supports_iteration`: static capability flag
//! - `execute_iteration`: run one step and signal whether another should
//!   follow
//!
//! A handler that does not override the iteration hook behaves as a
//! non-iterable plugin: the default implementation runs `execute` once and
//! reports that no further step should follow. Callers must not drive
//! iteration on a handler whose capability flag is false; the iteration
//! manager enforces this.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;
use crate::params::IonParams;

/// Outcome of a single iteration step: the produced value and whether the
/// handler wants another step.
#[derive(Clone, Debug)]
pub struct IonIterationStep {
    pub value: Value,
    pub continue_iteration: bool,
}

/// Polymorphic plugin handler. Implementations are shared behind `Arc` and
/// may be invoked from multiple tasks concurrently, so they carry no
/// per-call mutable state.
#[async_trait]
pub trait IonHandler: Send + Sync {
    /// Runs the plugin once with the given parameters.
    async fn execute(&self, params: &IonParams) -> Result<Value>;

    /// Whether this handler implements a real iteration hook.
    fn supports_iteration(&self) -> bool {
        false
    }

    /// Runs a single iteration. `iteration` is the zero-based step index.
    ///
    /// The default implementation runs `execute` once and does not request
    /// another step.
    async fn execute_iteration(
        &self,
        params: &IonParams,
        iteration: u32,
    ) -> Result<IonIterationStep> {
        let _ = iteration;
        let value = self.execute(params).await?;
        Ok(IonIterationStep {
            value,
            continue_iteration: false,
        })
    }
}

impl fmt::Debug for dyn IonHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("dyn IonHandler").finish_non_exhaustive()
    }
}
