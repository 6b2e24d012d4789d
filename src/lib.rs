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

//! # Ion Runtime Library
//!
//! This is the main library entry point for the Ion plugin runtime. Ion
//! discovers self-describing units of work ("plugins"), resolves each
//! unit's handler through a layered fallback strategy, and optionally
//! drives repeated execution of a unit with cooperative cancellation and
//! accumulated history.
//!
//! ## Module Overview
//!
//! - **errors**: error taxonomy and `Result` alias
//! - **params**: loosely-typed parameter mappings and coercion helpers
//! - **handler**: the callable contract plugins are invoked through
//! - **registry**: concurrent identifier → handler mapping
//! - **config**: iteration policy extraction from parameters
//! - **iteration**: the iteration engine and result history
//! - **module**: dynamic loading of compiled plugin artifacts
//! - **resolver**: the native/module/build/subprocess strategy chain
//! - **builtins**: native handlers for well-known identifiers
//! - **manifest**: plugin self-description and directory discovery
//! - **runtime**: the top-level component owning registry and resolver
//!
//! ## Feature Flags
//!
//! - `dynload`: native dynamic-module loading (enabled by default);
//!   disabling it degrades the compiled-module strategy to an explicit
//!   unsupported fallback
//!
//! ## Quick Start
//!
//! ```ignore
//! use ionx::{IonRuntime, IonRuntimeConfig, IonParams};
//! use serde_json::json;
//!
//! let runtime = IonRuntime::new(IonRuntimeConfig::new("plugins"));
//! runtime.load_plugins().await?;
//!
//! let mut params = IonParams::new();
//! params.insert("host".to_string(), json!("example.com"));
//! let result = runtime.execute("ping", &params).await?;
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: plugin directories are scanned for manifests
//! 2. **Resolution**: native table → compiled module → on-demand build →
//!    subprocess fallback, first success wins
//! 3. **Execution**: a resolved handler runs once, or under the iteration
//!    engine when the parameters request it
//! 4. **History**: iterative runs accumulate timestamped per-step results
//!    retrievable while the run is in progress
//!
//! ## Error Handling
//!
//! All operations return `Result<T, IonError>`. Strategy-level resolution
//! failures and per-iteration execution failures are recovered internally;
//! see the `errors` module for the taxonomy.

pub mod errors;
pub mod params;
pub mod handler;
pub mod registry;
pub mod config;
pub mod iteration;
pub mod module;
pub mod resolver;
pub mod builtins;
pub mod manifest;
pub mod runtime;

pub use errors::{IonError, Result};
pub use params::IonParams;
pub use handler::{IonHandler, IonIterationStep};
pub use registry::IonHandlerRegistry;
pub use config::{extract_config, IonExecutionConfig};
pub use iteration::{run_with_iteration, IonIterationManager, IonIterationResult};
pub use module::{IonCapabilitySet, IonModuleHost, ION_MODULE_ENTRY};
pub use resolver::{IonHandlerResolver, IonResolverConfig};
pub use manifest::{load_manifest, scan_plugins_dir, IonPluginManifest, IonParamSpec};
pub use runtime::{IonRuntime, IonRuntimeConfig};
