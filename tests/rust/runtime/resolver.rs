//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Ion.
//! The Ion project belongs to the Dunimd Team.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use ionx::errors::{IonError, Result};
use ionx::handler::IonHandler;
use ionx::params::IonParams;
use ionx::resolver::{IonHandlerResolver, IonResolverConfig};

/// Config that keeps tests hermetic: the build step is an immediate
/// failure instead of a real build-tool invocation.
fn test_config() -> IonResolverConfig {
    IonResolverConfig {
        build_command: vec!["false".to_string()],
        ..IonResolverConfig::default()
    }
}

#[cfg(unix)]
fn write_executable(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[tokio::test]
async fn native_identifier_resolves_without_filesystem() {
    let resolver = IonHandlerResolver::new(test_config());
    // The directory does not exist; a native hit must not care.
    let handler = resolver
        .resolve(Path::new("/nonexistent/plugins/ping"), "ping")
        .await
        .unwrap();
    assert!(handler.supports_iteration());
}

#[tokio::test]
async fn exhausted_strategies_fail_resolution() {
    let dir = tempfile::TempDir::new().unwrap();
    let resolver = IonHandlerResolver::new(test_config());

    let err = resolver
        .resolve(dir.path(), "unknown_plugin")
        .await
        .unwrap_err();
    assert!(matches!(err, IonError::Resolution { plugin, .. } if plugin == "unknown_plugin"));
}

#[cfg(unix)]
#[tokio::test]
async fn subprocess_fallback_parses_json_output() {
    let dir = tempfile::TempDir::new().unwrap();
    write_executable(
        &dir.path().join("plugin"),
        "#!/bin/bash\necho '{\"status\":\"ok\"}'\n",
    );

    let resolver = IonHandlerResolver::new(test_config());
    let handler = resolver.resolve(dir.path(), "json_plugin").await.unwrap();

    let value = handler.execute(&IonParams::new()).await.unwrap();
    assert_eq!(value, json!({"status": "ok"}));
}

#[cfg(unix)]
#[tokio::test]
async fn bad_artifact_falls_through_to_subprocess() {
    let dir = tempfile::TempDir::new().unwrap();
    // An artifact exists but is not a loadable library: strategy 2 fails,
    // the build step is skipped (the artifact is already present), and the
    // entry point serves the request.
    let artifact = format!("probe.{}", std::env::consts::DLL_EXTENSION);
    fs::write(dir.path().join(artifact), b"not a shared object").unwrap();
    write_executable(
        &dir.path().join("plugin"),
        "#!/bin/bash\necho '{\"status\":\"ok\"}'\n",
    );

    let resolver = IonHandlerResolver::new(test_config());
    let handler = resolver.resolve(dir.path(), "probe").await.unwrap();

    let value = handler.execute(&IonParams::new()).await.unwrap();
    assert_eq!(value["status"], json!("ok"));
}

#[cfg(unix)]
#[tokio::test]
async fn subprocess_wraps_non_json_output() {
    let dir = tempfile::TempDir::new().unwrap();
    write_executable(&dir.path().join("plugin"), "#!/bin/bash\necho hello world\n");

    let resolver = IonHandlerResolver::new(test_config());
    let handler = resolver.resolve(dir.path(), "texty").await.unwrap();

    let mut params = IonParams::new();
    params.insert("host".to_string(), json!("example.com"));
    let value = handler.execute(&params).await.unwrap();

    assert!(value["result"].as_str().unwrap().contains("hello world"));
    assert_eq!(value["params"]["host"], json!("example.com"));
}

#[cfg(unix)]
#[tokio::test]
async fn subprocess_nonzero_exit_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    write_executable(&dir.path().join("plugin"), "#!/bin/bash\nexit 3\n");

    let resolver = IonHandlerResolver::new(test_config());
    let handler = resolver.resolve(dir.path(), "broken").await.unwrap();

    let err = handler.execute(&IonParams::new()).await.unwrap_err();
    assert!(matches!(err, IonError::Subprocess { plugin, .. } if plugin == "broken"));
}

/// Handler that returns its parameters, for observing the adaptation.
struct EchoParams;

#[async_trait]
impl IonHandler for EchoParams {
    async fn execute(&self, params: &IonParams) -> Result<Value> {
        Ok(Value::Object(params.clone()))
    }
}

#[tokio::test]
async fn list_parameters_are_adapted_uniformly() {
    let mut resolver = IonHandlerResolver::new(test_config());
    resolver.register_native("echo_params", Arc::new(EchoParams));

    let handler = resolver
        .resolve(Path::new("/nonexistent"), "echo_params")
        .await
        .unwrap();

    let mut params = IonParams::new();
    params.insert("ip_list".to_string(), json!("10.0.0.1, 10.0.0.2"));
    params.insert("host".to_string(), json!("a.example"));
    let value = handler.execute(&params).await.unwrap();

    assert_eq!(value["ip_list"], json!(["10.0.0.1", "10.0.0.2"]));
    assert_eq!(value["host"], json!("a.example"));
    // The caller's mapping is untouched.
    assert_eq!(params["ip_list"], json!("10.0.0.1, 10.0.0.2"));
}
