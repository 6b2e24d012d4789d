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

//! # Module Loading
//!
//! Compiled plugin artifacts are dynamically loaded libraries exporting a
//! single conventional entry symbol. The entry takes no arguments and
//! returns an owned capability set whose `execute` member is the plugin's
//! callable; an optional `iterate` member opts the plugin into stepwise
//! execution.
//!
//! # Example
//!
//! ```ignore
//! use ionx::module::IonCapabilitySet;
//!
//! #[no_mangle]
//! pub extern "C" fn ion_plugin_entry() -> *mut IonCapabilitySet {
//!     Box::into_raw(Box::new(IonCapabilitySet {
//!         execute: my_execute,
//!         iterate: None,
//!     }))
//! }
//! ```
//!
//! Loaded code is inherently untrusted input, so every unsafe operation is
//! confined to this module behind the narrow [`IonModuleHost`] trait. On
//! targets where dynamic loading is unavailable the `dynload` feature can be
//! disabled; the host then reports loading as unsupported and the resolver
//! falls through to its remaining strategies.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::Result;
use crate::handler::IonHandler;
use crate::params::IonParams;

/// Name of the entry symbol a compiled plugin artifact must export.
pub const ION_MODULE_ENTRY: &[u8] = b"ion_plugin_entry";

/// Signature of a module's one-shot execution capability.
pub type IonModuleExecuteFn = fn(&IonParams) -> Result<Value>;

/// Signature of a module's optional iteration capability: returns the step
/// value and whether another step should follow.
pub type IonModuleIterateFn = fn(&IonParams, u32) -> Result<(Value, bool)>;

/// Capability set returned by a module's entry symbol. The host takes
/// ownership of the allocation the entry hands over.
pub struct IonCapabilitySet {
    pub execute: IonModuleExecuteFn,
    pub iterate: Option<IonModuleIterateFn>,
}

/// Entry symbol signature: `ion_plugin_entry()` allocates a capability set
/// with `Box::into_raw` and returns the raw pointer.
pub type IonModuleEntryFn = unsafe extern "C" fn() -> *mut IonCapabilitySet;

/// Narrow boundary for binding a named capability out of a compiled
/// artifact. The runtime never touches loader internals directly.
pub trait IonModuleHost: Send + Sync {
    /// Loads `artifact` and adapts its capability set into a handler.
    fn load(&self, artifact: &Path, plugin_id: &str) -> Result<Arc<dyn IonHandler>>;
}

/// Conventional artifact file name for a plugin, inside its directory.
pub fn artifact_name(plugin_id: &str) -> String {
    format!("{}.{}", plugin_id, std::env::consts::DLL_EXTENSION)
}

/// Conventional cdylib name the build tool produces under `target/release`.
pub fn built_artifact_name(plugin_id: &str) -> String {
    format!(
        "{}{}.{}",
        std::env::consts::DLL_PREFIX,
        plugin_id,
        std::env::consts::DLL_EXTENSION
    )
}

/// Returns the module host for this build: dynamic loading when the
/// `dynload` feature is enabled, an explicit unsupported stub otherwise.
pub fn default_module_host() -> Arc<dyn IonModuleHost> {
    #[cfg(feature = "dynload")]
    {
        Arc::new(dynamic::IonDynamicModuleHost)
    }
    #[cfg(not(feature = "dynload"))]
    {
        Arc::new(IonUnsupportedModuleHost)
    }
}

/// Stub host used when dynamic loading is compiled out. Every load fails,
/// which the resolver treats as an ordinary strategy miss.
#[cfg(not(feature = "dynload"))]
pub struct IonUnsupportedModuleHost;

#[cfg(not(feature = "dynload"))]
impl IonModuleHost for IonUnsupportedModuleHost {
    fn load(&self, _artifact: &Path, plugin_id: &str) -> Result<Arc<dyn IonHandler>> {
        Err(crate::errors::IonError::internal(format!(
            "dynamic module loading is not supported in this build (plugin '{}')",
            plugin_id
        )))
    }
}

#[cfg(feature = "dynload")]
mod dynamic {
    use async_trait::async_trait;
    use libloading::{Library, Symbol};

    use super::*;
    use crate::errors::IonError;
    use crate::handler::IonIterationStep;

    /// libloading-backed module host.
    pub struct IonDynamicModuleHost;

    impl IonModuleHost for IonDynamicModuleHost {
        fn load(&self, artifact: &Path, plugin_id: &str) -> Result<Arc<dyn IonHandler>> {
            if !artifact.exists() {
                return Err(IonError::internal(format!(
                    "no compiled artifact at {}",
                    artifact.to_string_lossy()
                )));
            }

            // Loading and calling into the artifact executes foreign code;
            // the artifact is trusted no further than these two calls.
            let library = unsafe { Library::new(artifact) }.map_err(|e| {
                IonError::internal(format!(
                    "failed to load module for plugin '{}': {}",
                    plugin_id, e
                ))
            })?;

            let capabilities = unsafe {
                let entry: Symbol<IonModuleEntryFn> =
                    library.get(ION_MODULE_ENTRY).map_err(|e| {
                        IonError::internal(format!(
                            "plugin '{}' does not export {}: {}",
                            plugin_id,
                            String::from_utf8_lossy(ION_MODULE_ENTRY),
                            e
                        ))
                    })?;
                let raw = entry();
                if raw.is_null() {
                    return Err(IonError::internal(format!(
                        "plugin '{}' entry returned no capability set",
                        plugin_id
                    )));
                }
                Box::from_raw(raw)
            };

            log::debug!(
                "module.load: capability set bound - plugin={}, artifact={}, iterable={}",
                plugin_id,
                artifact.to_string_lossy(),
                capabilities.iterate.is_some()
            );

            Ok(Arc::new(IonModuleHandler {
                capabilities,
                _library: library,
            }))
        }
    }

    /// Handler adapting a loaded capability set. The library handle is kept
    /// alive for as long as the capability pointers may be called.
    struct IonModuleHandler {
        capabilities: Box<IonCapabilitySet>,
        _library: Library,
    }

    #[async_trait]
    impl IonHandler for IonModuleHandler {
        async fn execute(&self, params: &IonParams) -> Result<Value> {
            (self.capabilities.execute)(params)
        }

        fn supports_iteration(&self) -> bool {
            self.capabilities.iterate.is_some()
        }

        async fn execute_iteration(
            &self,
            params: &IonParams,
            iteration: u32,
        ) -> Result<IonIterationStep> {
            match self.capabilities.iterate {
                Some(iterate) => {
                    let (value, continue_iteration) = iterate(params, iteration)?;
                    Ok(IonIterationStep {
                        value,
                        continue_iteration,
                    })
                }
                None => {
                    let value = self.execute(params).await?;
                    Ok(IonIterationStep {
                        value,
                        continue_iteration: false,
                    })
                }
            }
        }
    }
}

#[cfg(feature = "dynload")]
pub use dynamic::IonDynamicModuleHost;
