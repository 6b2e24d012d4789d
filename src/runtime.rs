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

//! # Ion Runtime Module
//!
//! The top-level component tying the runtime together: it owns the handler
//! registry and the resolver, discovers plugins on disk, and executes them
//! on behalf of front ends.
//!
//! ## Core Concepts
//!
//! - **IonRuntime**: explicitly constructed owner of all runtime state;
//!   there is no process-global registry or hidden one-time initialization
//! - **Discovery**: `load_plugins` scans the plugins directory, resolves a
//!   handler for every manifest-carrying subdirectory, and registers it
//! - **Execution**: `execute` looks a handler up (resolving lazily on a
//!   miss) and honors the iteration policy carried in the parameters

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::errors::Result;
use crate::iteration::run_with_iteration;
use crate::manifest::{scan_plugins_dir, IonPluginManifest};
use crate::params::IonParams;
use crate::registry::IonHandlerRegistry;
use crate::resolver::{IonHandlerResolver, IonResolverConfig};

/// Configuration for an Ion runtime instance.
#[derive(Clone, Debug)]
pub struct IonRuntimeConfig {
    /// Directory whose subdirectories are the installed plugins.
    pub plugins_dir: PathBuf,
    /// Resolver knobs (entry-point name, build command, list parameters).
    pub resolver: IonResolverConfig,
}

impl IonRuntimeConfig {
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        IonRuntimeConfig {
            plugins_dir: plugins_dir.into(),
            resolver: IonResolverConfig::default(),
        }
    }
}

impl Default for IonRuntimeConfig {
    fn default() -> Self {
        IonRuntimeConfig::new("plugins")
    }
}

/// The plugin execution runtime. Constructed once and shared by reference;
/// all mutable state lives behind its own synchronization.
pub struct IonRuntime {
    config: IonRuntimeConfig,
    registry: IonHandlerRegistry,
    resolver: IonHandlerResolver,
    manifests: Mutex<Vec<IonPluginManifest>>,
}

impl IonRuntime {
    pub fn new(config: IonRuntimeConfig) -> Self {
        let resolver = IonHandlerResolver::new(config.resolver.clone());
        IonRuntime {
            config,
            registry: IonHandlerRegistry::new(),
            resolver,
            manifests: Mutex::new(Vec::new()),
        }
    }

    /// The handler registry owned by this runtime.
    pub fn registry(&self) -> &IonHandlerRegistry {
        &self.registry
    }

    /// The resolver owned by this runtime.
    pub fn resolver(&self) -> &IonHandlerResolver {
        &self.resolver
    }

    /// Discovers plugins under the configured directory, resolves a handler
    /// for each, and registers it. A plugin that fails to resolve is logged
    /// and skipped; the scan itself only fails if the directory is
    /// unreadable. Returns the manifests of the plugins now available.
    pub async fn load_plugins(&self) -> Result<Vec<IonPluginManifest>> {
        let found = scan_plugins_dir(&self.config.plugins_dir)?;

        let mut loaded = Vec::new();
        for (dir, manifest) in found {
            match self.resolver.resolve(&dir, &manifest.id).await {
                Ok(handler) => {
                    self.registry.register(&manifest.id, handler);
                    log::info!(
                        "runtime.plugin.registered: handler registered - plugin={}, dir={}",
                        manifest.id,
                        dir.to_string_lossy()
                    );
                    loaded.push(manifest);
                }
                Err(err) => {
                    log::warn!(
                        "runtime.plugin.unresolved: plugin skipped - plugin={}, error={}",
                        manifest.id,
                        err
                    );
                }
            }
        }

        log::info!(
            "runtime.plugins.loaded: discovery pass complete - dir={}, plugin_count={}",
            self.config.plugins_dir.to_string_lossy(),
            loaded.len()
        );

        *self.manifests.lock().unwrap() = loaded.clone();
        Ok(loaded)
    }

    /// Snapshot of the manifests from the last discovery pass.
    pub fn plugins(&self) -> Vec<IonPluginManifest> {
        self.manifests.lock().unwrap().clone()
    }

    /// Executes a plugin with the given parameters, honoring any iteration
    /// policy they carry. An identifier with no registered handler is
    /// resolved lazily against `<plugins_dir>/<plugin_id>` and registered
    /// on success.
    pub async fn execute(&self, plugin_id: &str, params: &IonParams) -> Result<Value> {
        let handler = match self.registry.lookup(plugin_id) {
            Ok(handler) => handler,
            Err(_) => {
                let dir = self.config.plugins_dir.join(plugin_id);
                let handler = self.resolver.resolve(&dir, plugin_id).await?;
                self.registry.register(plugin_id, Arc::clone(&handler));
                handler
            }
        };

        run_with_iteration(handler, params).await
    }
}
