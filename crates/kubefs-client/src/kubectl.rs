// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! kubectl-backed source implementation
//!
//! Listings use `-o name`, which prints one `<type>/<name>` per line and is
//! stable across kubectl versions, unlike the default table output.

use std::process::{Command, Stdio};

use kubefs_core::{Action, ClusterConfig, ContentSource, DataSource, FsResult, ResourceKind};
use tracing::{debug, warn};

use crate::error::ClientError;

/// Cluster client driving the `kubectl` binary
#[derive(Clone, Debug)]
pub struct KubectlClient {
    config: ClusterConfig,
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new(ClusterConfig::default())
    }
}

impl KubectlClient {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Whether the configured binary can be executed
    pub fn is_available(&self) -> bool {
        Command::new(&self.config.kubectl)
            .args(["version", "--client"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Connection flags prepended to every invocation
    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.config.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.to_string_lossy().to_string());
        }
        if let Some(context) = &self.config.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        args
    }

    /// Run kubectl and return its raw stdout
    fn run_kubectl(&self, args: &[&str]) -> Result<Vec<u8>, ClientError> {
        let global = self.global_args();
        debug!(kubectl = %self.config.kubectl, args = ?args, "running kubectl");

        let output = Command::new(&self.config.kubectl)
            .args(&global)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClientError::NotAvailable(self.config.kubectl.clone())
                } else {
                    ClientError::Io(e)
                }
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(args = ?args, status = ?output.status.code(), %stderr, "kubectl failed");
            Err(ClientError::CommandFailed {
                command: format!("kubectl {}", args.join(" ")),
                stderr,
            })
        }
    }

    fn list(&self, args: &[&str]) -> Result<Vec<String>, ClientError> {
        let stdout = self.run_kubectl(args)?;
        Ok(parse_names(&String::from_utf8_lossy(&stdout)))
    }
}

/// Arguments producing the content of one action file
fn action_args<'a>(
    namespace: &'a str,
    kind: ResourceKind,
    name: &'a str,
    action: Action,
    logs_target: &'a str,
) -> Vec<&'a str> {
    match action {
        Action::Describe => vec!["describe", kind.resource_name(), name, "--namespace", namespace],
        Action::Logs => vec!["logs", logs_target, "--namespace", namespace],
        Action::Json => vec!["get", kind.resource_name(), name, "--namespace", namespace, "-o", "json"],
        Action::Yaml => vec!["get", kind.resource_name(), name, "--namespace", namespace, "-o", "yaml"],
    }
}

/// Names from `kubectl get ... -o name` output, in output order.
///
/// The `<type>/` prefix is stripped; blank lines are skipped.
pub fn parse_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.rsplit_once('/') {
            Some((_, name)) => name.to_string(),
            None => line.to_string(),
        })
        .collect()
}

impl DataSource for KubectlClient {
    fn list_namespaces(&self) -> FsResult<Vec<String>> {
        Ok(self.list(&["get", "namespaces", "-o", "name"])?)
    }

    fn list_objects(&self, namespace: &str, kind: ResourceKind) -> FsResult<Vec<String>> {
        Ok(self.list(&["get", kind.resource_name(), "--namespace", namespace, "-o", "name"])?)
    }
}

impl ContentSource for KubectlClient {
    fn render(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
        action: Action,
    ) -> FsResult<Vec<u8>> {
        // kubectl logs accepts `<kind>/<name>` and picks a pod for controllers
        let logs_target = format!("{}/{}", kind.short_name(), name);
        let args = action_args(namespace, kind, name, action, &logs_target);
        Ok(self.run_kubectl(&args)?)
    }
}
