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

//! # Handler Registry Module
//!
//! Concurrent mapping from plugin identifier to an in-process handler.
//!
//! ## Registry Operations
//!
//! - Register a handler under an identifier (last writer wins)
//! - Look up a handler by identifier
//! - Snapshot the registered identifiers
//!
//! The registry uses a read-write discipline: many concurrent lookups, one
//! exclusive registration at a time. Handlers are published as `Arc` clones
//! under the write lock, so a lookup can never observe a partially written
//! binding. An instance lives for the duration of the host process and is
//! owned by the runtime rather than held in process-global state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::errors::{IonError, Result};
use crate::handler::IonHandler;

/// Registry mapping plugin identifiers to their handlers.
#[derive(Default)]
pub struct IonHandlerRegistry {
    inner: RwLock<HashMap<String, Arc<dyn IonHandler>>>,
}

impl IonHandlerRegistry {
    pub fn new() -> Self {
        IonHandlerRegistry {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Binds `handler` to `id`, silently replacing any existing binding.
    pub fn register(&self, id: &str, handler: Arc<dyn IonHandler>) {
        let mut inner = self.inner.write().unwrap();
        if inner.insert(id.to_string(), handler).is_some() {
            log::debug!(
                "registry.handler.replaced: existing binding overwritten - plugin={}",
                id
            );
        }
    }

    /// Returns the handler bound to `id`.
    pub fn lookup(&self, id: &str) -> Result<Arc<dyn IonHandler>> {
        self.inner
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| IonError::not_found(id))
    }

    /// Whether a binding exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().unwrap().contains_key(id)
    }

    /// Snapshot of the registered plugin identifiers.
    pub fn ids(&self) -> Vec<String> {
        self.inner.read().unwrap().keys().cloned().collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
