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

//! # Ion Error Module
//!
//! This module defines the error types and utilities used throughout the Ion
//! runtime for consistent error handling and reporting.
//!
//! ## Error Handling Philosophy
//!
//! Ion distinguishes three failure planes:
//!
//! - **Recoverable strategy failures**: each handler-resolution strategy may
//!   fail without failing resolution; the resolver logs and moves on, and
//!   only `Resolution` escapes once every strategy is exhausted
//! - **Recorded iteration failures**: an error inside a single iteration is
//!   stored in that iteration's result entry and never raised to the caller
//! - **Structural misuse**: `AlreadyRunning` and `UnsupportedIteration`
//!   surface synchronously from the call that misused the component
//!
//! ## Error Categories
//!
//! - **Io**: filesystem and subprocess spawn errors
//! - **Serde**: serialization/deserialization errors
//! - **Validation**: invalid or missing parameters
//! - **NotFound**: registry lookup miss
//! - **Resolution**: every resolution strategy failed for a plugin
//! - **Build**: the on-demand compile step failed (non-fatal to resolution)
//! - **Subprocess**: the plugin entry point could not be run or exited non-zero
//! - **AlreadyRunning** / **UnsupportedIteration**: iteration-manager misuse
//! - **Internal**: unexpected internal failures

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout Ion.
pub type Result<T> = std::result::Result<T, IonError>;

/// Canonical error enumeration for the Ion runtime.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum IonError {
    /// Errors originating from filesystem or subprocess IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Validation errors triggered by invalid parameters or inputs.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A registry lookup found no handler bound to the identifier.
    #[error("no handler registered for plugin '{plugin}'")]
    NotFound { plugin: String },

    /// Every resolution strategy failed for the plugin.
    #[error("failed to resolve handler for plugin '{plugin}': {message}")]
    Resolution { plugin: String, message: String },

    /// The on-demand compile step exited non-zero or produced no artifact.
    #[error("build failed for plugin '{plugin}': {message}")]
    Build { plugin: String, message: String },

    /// The plugin entry point could not be started or exited non-zero.
    #[error("subprocess failed for plugin '{plugin}': {message}")]
    Subprocess { plugin: String, message: String },

    /// `start` was called on an iteration manager that is already running.
    #[error("iteration is already running")]
    AlreadyRunning,

    /// Iteration was requested for a handler that does not support it.
    #[error("plugin does not support iteration")]
    UnsupportedIteration,

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for IonError {
    fn from(err: io::Error) -> Self {
        IonError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for IonError {
    fn from(err: serde_json::Error) -> Self {
        IonError::Serde(err.to_string())
    }
}

impl IonError {
    /// Helper to construct simple validation errors.
    pub fn validation<T: Into<String>>(message: T) -> Self {
        IonError::Validation {
            message: message.into(),
        }
    }

    /// Helper to construct registry-miss errors.
    pub fn not_found(plugin: impl Into<String>) -> Self {
        IonError::NotFound {
            plugin: plugin.into(),
        }
    }

    /// Helper to construct resolution errors.
    pub fn resolution(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        IonError::Resolution {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Helper to construct build errors.
    pub fn build(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        IonError::Build {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Helper to construct subprocess errors.
    pub fn subprocess(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        IonError::Subprocess {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        IonError::Internal(message.into())
    }
}
