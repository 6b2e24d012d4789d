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

//! # Built-in Handlers
//!
//! Native handlers for the plugin identifiers the host recognizes
//! explicitly. These are the fastest resolution path: thin wrappers around
//! the standard diagnostic tools, returning a `{command, output, success}`
//! envelope without interpreting the tool output.
//!
//! The table produced by [`native_table`] is built once at startup and fed
//! to the resolver; it is a plain identifier → handler mapping rather than
//! anything dynamic.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::errors::{IonError, Result};
use crate::handler::{IonHandler, IonIterationStep};
use crate::params::{param_str, param_u64, IonParams};

/// Runs a shell command, returning its combined stdout/stderr and whether
/// it exited successfully. Only a spawn failure is an error.
pub async fn run_shell(command: &str) -> Result<(String, bool)> {
    let output = Command::new("bash")
        .arg("-c")
        .arg(command)
        .output()
        .await?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.stderr.is_empty() {
        text.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    Ok((text, output.status.success()))
}

fn command_envelope(command: &str, output: String, success: bool) -> Value {
    json!({
        "command": command,
        "output": output,
        "success": success,
    })
}

/// ICMP reachability probe. Iterable: each step runs one ping burst.
pub struct IonPingHandler;

#[async_trait]
impl IonHandler for IonPingHandler {
    async fn execute(&self, params: &IonParams) -> Result<Value> {
        let host = param_str(params, "host")
            .ok_or_else(|| IonError::validation("host parameter is required"))?;
        let count = param_u64(params, "count").unwrap_or(4);

        let command = format!("ping -c {} {}", count, host);
        let (output, success) = run_shell(&command).await?;
        if !success {
            return Err(IonError::internal(format!("ping failed: {}", output)));
        }
        Ok(command_envelope(&command, output, success))
    }

    fn supports_iteration(&self) -> bool {
        true
    }

    async fn execute_iteration(
        &self,
        params: &IonParams,
        iteration: u32,
    ) -> Result<IonIterationStep> {
        let mut value = self.execute(params).await?;
        if let Value::Object(map) = &mut value {
            map.insert("iteration".to_string(), json!(iteration));
        }
        Ok(IonIterationStep {
            value,
            continue_iteration: true,
        })
    }
}

/// Hop-by-hop route listing. Single-shot.
pub struct IonTracerouteHandler;

#[async_trait]
impl IonHandler for IonTracerouteHandler {
    async fn execute(&self, params: &IonParams) -> Result<Value> {
        let host = param_str(params, "host")
            .ok_or_else(|| IonError::validation("host parameter is required"))?;

        let command = format!("traceroute {}", host);
        let (output, success) = run_shell(&command).await?;
        Ok(command_envelope(&command, output, success))
    }
}

/// DNS record lookup. Iterable for watching propagation over time.
pub struct IonDnsLookupHandler;

#[async_trait]
impl IonHandler for IonDnsLookupHandler {
    async fn execute(&self, params: &IonParams) -> Result<Value> {
        let domain = param_str(params, "domain")
            .ok_or_else(|| IonError::validation("domain parameter is required"))?;

        let command = format!("dig {}", domain);
        let (output, success) = run_shell(&command).await?;
        Ok(command_envelope(&command, output, success))
    }

    fn supports_iteration(&self) -> bool {
        true
    }

    async fn execute_iteration(
        &self,
        params: &IonParams,
        iteration: u32,
    ) -> Result<IonIterationStep> {
        let mut value = self.execute(params).await?;
        if let Value::Object(map) = &mut value {
            map.insert("iteration".to_string(), json!(iteration));
        }
        Ok(IonIterationStep {
            value,
            continue_iteration: true,
        })
    }
}

/// TCP port sweep over the well-known range. Single-shot.
pub struct IonPortScanHandler;

#[async_trait]
impl IonHandler for IonPortScanHandler {
    async fn execute(&self, params: &IonParams) -> Result<Value> {
        let host = param_str(params, "host")
            .ok_or_else(|| IonError::validation("host parameter is required"))?;

        let command = format!("nmap -p 1-1000 {}", host);
        let (output, success) = run_shell(&command).await?;
        Ok(command_envelope(&command, output, success))
    }
}

/// The native handler table, built once at startup. Identifiers here
/// resolve without touching the plugin's directory at all.
pub fn native_table() -> Vec<(&'static str, Arc<dyn IonHandler>)> {
    vec![
        ("ping", Arc::new(IonPingHandler) as Arc<dyn IonHandler>),
        ("traceroute", Arc::new(IonTracerouteHandler)),
        ("dns_lookup", Arc::new(IonDnsLookupHandler)),
        ("port_scanner", Arc::new(IonPortScanHandler)),
    ]
}
