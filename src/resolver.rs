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

//! # Handler Resolver Module
//!
//! Turns a plugin identifier plus its on-disk directory into a callable
//! handler by trying, in priority order:
//!
//! 1. the native handler table (no filesystem access)
//! 2. an already compiled dynamically-loadable artifact in the plugin dir
//! 3. an on-demand build of that artifact, followed by one load retry
//! 4. the plugin's source entry point run as a subprocess
//!
//! Plugins are not trusted to link cleanly into the host process, so
//! resolution degrades gracefully from fastest to slowest-but-available.
//! Each strategy's failure is logged and swallowed; only when every
//! strategy has failed does `resolve` return `Resolution`.
//!
//! ## Parameter Adaptation
//!
//! Some plugin contracts expect a sequence-of-string parameter where
//! dashboards submit a single comma-separated string (multi-target fields
//! such as `ip_list`). The resolver wraps every handler it produces with
//! the same adaptation, so behavior is observably identical no matter
//! which strategy served the request.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::builtins::native_table;
use crate::errors::{IonError, Result};
use crate::handler::{IonHandler, IonIterationStep};
use crate::module::{
    artifact_name, built_artifact_name, default_module_host, IonModuleHost,
};
use crate::params::{split_comma_list, IonParams};

/// Knobs for the resolution strategies.
#[derive(Clone, Debug)]
pub struct IonResolverConfig {
    /// File name of the subprocess entry point inside a plugin directory.
    pub entry_point: String,
    /// External build tool invocation run in the plugin directory to
    /// produce the compiled artifact.
    pub build_command: Vec<String>,
    /// Parameter keys adapted from comma-separated strings to string
    /// sequences before a handler sees them.
    pub list_params: Vec<String>,
}

impl Default for IonResolverConfig {
    fn default() -> Self {
        IonResolverConfig {
            entry_point: "plugin".to_string(),
            build_command: vec![
                "cargo".to_string(),
                "build".to_string(),
                "--release".to_string(),
            ],
            list_params: vec!["ip_list".to_string(), "targets".to_string()],
        }
    }
}

/// Layered handler resolver. Constructed once per runtime with the native
/// table built at startup.
pub struct IonHandlerResolver {
    native: HashMap<String, Arc<dyn IonHandler>>,
    module_host: Arc<dyn IonModuleHost>,
    config: IonResolverConfig,
}

impl IonHandlerResolver {
    pub fn new(config: IonResolverConfig) -> Self {
        let mut native = HashMap::new();
        for (id, handler) in native_table() {
            native.insert(id.to_string(), handler);
        }
        IonHandlerResolver {
            native,
            module_host: default_module_host(),
            config,
        }
    }

    /// Replaces the module host. Intended for embedding and tests.
    pub fn with_module_host(mut self, host: Arc<dyn IonModuleHost>) -> Self {
        self.module_host = host;
        self
    }

    /// Adds or replaces a native-table entry.
    pub fn register_native(&mut self, id: &str, handler: Arc<dyn IonHandler>) {
        self.native.insert(id.to_string(), handler);
    }

    /// Resolves `plugin_id` into a handler, trying each strategy in order.
    /// Idempotent in effect, not in cost: an existing artifact is reused
    /// and never rebuilt.
    pub async fn resolve(
        &self,
        plugin_dir: &Path,
        plugin_id: &str,
    ) -> Result<Arc<dyn IonHandler>> {
        // Strategy 1: native table.
        if let Some(handler) = self.native.get(plugin_id) {
            log::debug!(
                "resolver.native.hit: serving from native table - plugin={}",
                plugin_id
            );
            return Ok(self.adapt(Arc::clone(handler)));
        }

        // Strategy 2: previously compiled artifact.
        let artifact = plugin_dir.join(artifact_name(plugin_id));
        let had_artifact = artifact.exists();
        match self.module_host.load(&artifact, plugin_id) {
            Ok(handler) => {
                log::info!(
                    "resolver.module.loaded: compiled artifact bound - plugin={}, artifact={}",
                    plugin_id,
                    artifact.to_string_lossy()
                );
                return Ok(self.adapt(handler));
            }
            Err(err) => {
                log::debug!(
                    "resolver.module.miss: compiled artifact unavailable - plugin={}, error={}",
                    plugin_id,
                    err
                );
            }
        }

        // Strategy 3: on-demand build, then one load retry. Skipped when
        // the artifact already exists: rebuilding would reproduce the file
        // strategy 2 just rejected.
        if !had_artifact {
            match self.build_module(plugin_dir, plugin_id).await {
                Ok(()) => match self.module_host.load(&artifact, plugin_id) {
                    Ok(handler) => {
                        log::info!(
                            "resolver.build.loaded: artifact built and bound - plugin={}",
                            plugin_id
                        );
                        return Ok(self.adapt(handler));
                    }
                    Err(err) => {
                        log::debug!(
                            "resolver.build.load_failed: built artifact did not bind - plugin={}, error={}",
                            plugin_id,
                            err
                        );
                    }
                },
                Err(err) => {
                    log::warn!(
                        "resolver.build.failed: on-demand build unsuccessful - plugin={}, error={}",
                        plugin_id,
                        err
                    );
                }
            }
        }

        // Strategy 4: subprocess entry point.
        let entry = plugin_dir.join(&self.config.entry_point);
        if entry.exists() {
            log::info!(
                "resolver.subprocess.fallback: serving via entry point - plugin={}, entry={}",
                plugin_id,
                entry.to_string_lossy()
            );
            return Ok(self.adapt(Arc::new(IonSubprocessHandler {
                plugin_id: plugin_id.to_string(),
                entry,
            })));
        }

        Err(IonError::resolution(
            plugin_id,
            "no native handler, loadable module, or entry point",
        ))
    }

    /// Runs the external build tool in the plugin directory and stages the
    /// produced cdylib under the conventional artifact name.
    async fn build_module(&self, plugin_dir: &Path, plugin_id: &str) -> Result<()> {
        let mut parts = self.config.build_command.iter();
        let program = parts
            .next()
            .ok_or_else(|| IonError::build(plugin_id, "empty build command"))?;

        log::info!(
            "resolver.build.start: invoking build tool - plugin={}, command={:?}",
            plugin_id,
            self.config.build_command
        );

        let output = Command::new(program)
            .args(parts)
            .current_dir(plugin_dir)
            .output()
            .await
            .map_err(|e| IonError::build(plugin_id, e.to_string()))?;

        if !output.status.success() {
            return Err(IonError::build(
                plugin_id,
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let artifact = plugin_dir.join(artifact_name(plugin_id));
        if !artifact.exists() {
            let built = plugin_dir
                .join("target")
                .join("release")
                .join(built_artifact_name(plugin_id));
            if !built.exists() {
                return Err(IonError::build(plugin_id, "build produced no artifact"));
            }
            std::fs::copy(&built, &artifact)?;
        }

        Ok(())
    }

    fn adapt(&self, handler: Arc<dyn IonHandler>) -> Arc<dyn IonHandler> {
        if self.config.list_params.is_empty() {
            return handler;
        }
        Arc::new(IonAdaptedHandler {
            inner: handler,
            list_params: self.config.list_params.clone(),
        })
    }
}

/// Handler backed by the plugin's source entry point run as a subprocess.
///
/// Parameters are passed as one JSON object behind `--params`; combined
/// stdout/stderr is parsed as a JSON value, or wrapped as raw text when it
/// is not valid JSON.
struct IonSubprocessHandler {
    plugin_id: String,
    entry: PathBuf,
}

#[async_trait]
impl IonHandler for IonSubprocessHandler {
    async fn execute(&self, params: &IonParams) -> Result<Value> {
        let payload = serde_json::to_string(&Value::Object(params.clone()))?;

        let output = Command::new(&self.entry)
            .arg("--params")
            .arg(&payload)
            .output()
            .await
            .map_err(|e| {
                IonError::subprocess(
                    &self.plugin_id,
                    format!("failed to start entry point: {}", e),
                )
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        if !output.status.success() {
            return Err(IonError::subprocess(
                &self.plugin_id,
                format!("entry point exited with {}: {}", output.status, text),
            ));
        }

        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => Ok(value),
            Err(_) => Ok(json!({
                "result": text,
                "params": params,
            })),
        }
    }
}

/// Wrapper applying the comma-string → string-sequence adaptation before
/// delegating. Wraps every resolved handler so the adaptation is uniform
/// across strategies; the caller's mapping is copied, never mutated.
struct IonAdaptedHandler {
    inner: Arc<dyn IonHandler>,
    list_params: Vec<String>,
}

impl IonAdaptedHandler {
    fn adapt(&self, params: &IonParams) -> IonParams {
        let mut adapted = params.clone();
        for key in &self.list_params {
            let items = match adapted.get(key) {
                Some(Value::String(raw)) => split_comma_list(raw),
                _ => continue,
            };
            adapted.insert(key.clone(), json!(items));
        }
        adapted
    }
}

#[async_trait]
impl IonHandler for IonAdaptedHandler {
    async fn execute(&self, params: &IonParams) -> Result<Value> {
        let adapted = self.adapt(params);
        self.inner.execute(&adapted).await
    }

    fn supports_iteration(&self) -> bool {
        self.inner.supports_iteration()
    }

    async fn execute_iteration(
        &self,
        params: &IonParams,
        iteration: u32,
    ) -> Result<IonIterationStep> {
        let adapted = self.adapt(params);
        self.inner.execute_iteration(&adapted, iteration).await
    }
}
