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

//! Loosely-typed parameter mappings and total coercion helpers.
//!
//! Plugins declare their own parameter shapes, so the runtime moves
//! parameters around as a JSON object: `serde_json::Value` is the tagged
//! union (string | number | boolean | sequence | mapping) and no schema is
//! enforced here. The helpers below never fail; a missing or wrong-typed
//! field simply yields `None`.

use serde_json::{Map, Value};

/// Parameter mapping passed from callers to handlers. Caller-constructed
/// and read-only from the runtime's perspective.
pub type IonParams = Map<String, Value>;

/// Reads a string parameter.
pub fn param_str<'a>(params: &'a IonParams, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

/// Reads a boolean parameter.
pub fn param_bool(params: &IonParams, key: &str) -> Option<bool> {
    params.get(key).and_then(Value::as_bool)
}

/// Reads an unsigned integer parameter. JSON front ends routinely encode
/// numbers as floats, so integral floats are accepted as well.
pub fn param_u64(params: &IonParams, key: &str) -> Option<u64> {
    let value = params.get(key)?;
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)
}

/// Reads a list-of-strings parameter. Accepts either a JSON array of
/// strings or a single comma-separated string, which is the form dashboards
/// submit for multi-target fields such as `ip_list`.
pub fn param_string_list(params: &IonParams, key: &str) -> Option<Vec<String>> {
    match params.get(key)? {
        Value::String(s) => Some(split_comma_list(s)),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

/// Splits a comma-separated string into trimmed, non-empty entries.
pub fn split_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
