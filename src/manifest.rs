//! Copyright © 2025 Wenze Wei. All Rights Reserved.
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

//! Plugin manifests and directory discovery.
//!
//! Each plugin occupies a directory containing a `plugin.json` manifest
//! describing its identifier, display name, description, and parameter
//! schema. The runtime core consumes only the identifier and the directory
//! path; the rest of the manifest is carried for front ends.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{IonError, Result};

/// Manifest file name inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.json";

/// One declared parameter of a plugin, as presented to front ends. The
/// core performs no schema validation against these.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IonParamSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

/// Self-description of a plugin, loaded from its directory's manifest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IonPluginManifest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub parameters: Vec<IonParamSpec>,
}

/// Loads the manifest from a plugin directory (or directly from a manifest
/// file path).
pub fn load_manifest(path: &Path) -> Result<IonPluginManifest> {
    let manifest_path = if path.is_dir() {
        path.join(MANIFEST_FILE)
    } else {
        path.to_path_buf()
    };

    let text = fs::read_to_string(&manifest_path).map_err(|e| {
        IonError::Io(format!(
            "failed to read {}: {}",
            manifest_path.to_string_lossy(),
            e
        ))
    })?;
    let manifest: IonPluginManifest = serde_json::from_str(&text)?;
    Ok(manifest)
}

/// Scans a plugins directory for plugin subdirectories.
///
/// Entries that are not directories or carry no manifest are ignored;
/// unreadable or malformed manifests are logged and skipped rather than
/// failing the scan.
pub fn scan_plugins_dir(dir: &Path) -> Result<Vec<(PathBuf, IonPluginManifest)>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        IonError::Io(format!(
            "failed to read plugins directory {}: {}",
            dir.to_string_lossy(),
            e
        ))
    })?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() || !path.join(MANIFEST_FILE).exists() {
            continue;
        }
        match load_manifest(&path) {
            Ok(manifest) => found.push((path, manifest)),
            Err(err) => {
                log::warn!(
                    "manifest.scan.skipped: malformed plugin manifest - dir={}, error={}",
                    path.to_string_lossy(),
                    err
                );
            }
        }
    }

    // Directory naming drives identifier stability across restarts; a
    // deterministic order keeps registration reproducible too.
    found.sort_by(|a, b| a.1.id.cmp(&b.1.id));
    Ok(found)
}
