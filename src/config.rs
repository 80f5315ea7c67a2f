//! Suite options
//!
//! Everything the suite needs to know about the target cluster and the
//! operator under test lives here: endpoints, namespaces, resource
//! names, label selectors, and the polling cadences. Options load from a
//! YAML file, every field carries a working default, and the CLI may
//! override the cluster-access fields.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::error::Error;
use crate::poll::PollSpec;

/// Top-level suite options.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteOptions {
    /// How to reach the cluster.
    pub cluster: ClusterOptions,
    /// Names and selectors of the operator under test.
    pub operator: OperatorOptions,
    /// Console and metrics endpoints.
    pub console: ConsoleOptions,
    /// Object storage the stack writes metrics into.
    pub storage: StorageOptions,
    /// Polling cadences.
    pub timing: TimingOptions,
}

/// Cluster access options.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterOptions {
    /// Path to a kubeconfig file. When unset, in-cluster config and the
    /// standard environment fallbacks are used.
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to select. Defaults to the current context.
    pub context: Option<String>,
    /// Accept self-signed certificates on the console endpoints.
    pub accept_invalid_certs: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            // Test-cluster consoles usually terminate TLS with a
            // self-signed certificate.
            accept_invalid_certs: true,
        }
    }
}

/// Names, namespaces, and selectors of the operator under test.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperatorOptions {
    /// Namespace the operator deployment runs in.
    pub namespace: String,
    /// Label selector for the operator's own pods.
    pub pod_selector: String,
    /// apiVersion of the operator's primary custom resource.
    pub api_version: String,
    /// Kind of the operator's primary custom resource.
    pub kind: String,
    /// Name of the primary custom resource instance.
    pub resource_name: String,
    /// Namespace the observability stack is installed into.
    pub observability_namespace: String,
    /// Namespace the metrics addon runs in.
    pub addon_namespace: String,
    /// Label selector for the addon's collector pods.
    pub collector_selector: String,
    /// CRDs that must exist before the stack can be installed.
    pub required_crds: Vec<String>,
    /// apiVersion of the per-cluster addon resource.
    pub addon_api_version: String,
    /// Kind of the per-cluster addon resource.
    pub addon_kind: String,
    /// Name of the per-cluster addon resource.
    pub addon_name: String,
    /// Namespace (managed cluster name) holding the addon resource.
    pub managed_cluster_namespace: String,
    /// Name of the compactor StatefulSet owned by the stack.
    pub compactor_name: String,
    /// Name of the image pull secret the stack expects.
    pub pull_secret_name: String,
    /// Name of the object-storage secret the stack expects.
    pub storage_secret_name: String,
}

impl Default for OperatorOptions {
    fn default() -> Self {
        Self {
            namespace: "open-cluster-management".to_string(),
            pod_selector: "name=multicluster-observability-operator".to_string(),
            api_version: "observability.open-cluster-management.io/v1beta1".to_string(),
            kind: "MulticlusterObservability".to_string(),
            resource_name: "observability".to_string(),
            observability_namespace: "open-cluster-management-observability".to_string(),
            addon_namespace: "open-cluster-management-addon-observability".to_string(),
            collector_selector: "component=metrics-collector".to_string(),
            required_crds: vec![
                "multiclusterobservabilities.observability.open-cluster-management.io".to_string(),
                "observatoria.core.observatorium.io".to_string(),
                "observabilityaddons.observability.open-cluster-management.io".to_string(),
            ],
            addon_api_version: "observability.open-cluster-management.io/v1beta1".to_string(),
            addon_kind: "ObservabilityAddon".to_string(),
            addon_name: "observability-addon".to_string(),
            managed_cluster_namespace: "local-cluster".to_string(),
            compactor_name: "observability-observatorium-thanos-compact".to_string(),
            pull_secret_name: "multiclusterhub-operator-pull-secret".to_string(),
            storage_secret_name: "thanos-object-storage".to_string(),
        }
    }
}

/// Console and metrics endpoints.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleOptions {
    /// Base URL of the Grafana console.
    pub grafana_url: String,
    /// Path of the range-query endpoint, relative to `grafana_url`.
    pub query_path: String,
    /// Metrics query that must return data while the addon is enabled.
    pub managed_cluster_query: String,
    /// Bearer token for the query endpoint, when required.
    pub token: Option<String>,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            grafana_url: "http://127.0.0.1:3001".to_string(),
            query_path: "/api/datasources/proxy/1/api/v1/query".to_string(),
            managed_cluster_query: "node_memory_MemAvailable_bytes{cluster=\"local-cluster\"}"
                .to_string(),
            token: None,
        }
    }
}

/// Object storage handed to the stack through the Thanos secret.
///
/// The defaults match the in-cluster minio deployment the suite is
/// normally pointed at.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageOptions {
    /// Bucket metrics are written into.
    pub bucket: String,
    /// Object store endpoint, host:port.
    pub endpoint: String,
    /// Access key.
    pub access_key: String,
    /// Secret key.
    pub secret_key: String,
    /// Skip TLS when talking to the object store.
    pub insecure: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            bucket: "thanos".to_string(),
            endpoint: "minio:9000".to_string(),
            access_key: "minio".to_string(),
            secret_key: "minio123".to_string(),
            insecure: true,
        }
    }
}

/// Polling cadences for the three patience classes the suite uses.
///
/// Quick checks (state that should already hold), convergence checks
/// (state the operator must reconcile into existence), and slow checks
/// (teardown and addon propagation, which cross cluster boundaries).
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingOptions {
    /// Cadence for quick checks, in seconds.
    pub interval_secs: u64,
    /// Budget for quick checks, in seconds.
    pub deadline_secs: u64,
    /// Cadence for convergence checks, in seconds.
    pub convergence_interval_secs: u64,
    /// Budget for convergence checks, in seconds.
    pub convergence_deadline_secs: u64,
    /// Cadence for slow checks, in seconds.
    pub slow_interval_secs: u64,
    /// Budget for slow checks, in seconds.
    pub slow_deadline_secs: u64,
}

impl Default for TimingOptions {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            deadline_secs: 60,
            convergence_interval_secs: 5,
            convergence_deadline_secs: 300,
            slow_interval_secs: 5,
            slow_deadline_secs: 600,
        }
    }
}

impl TimingOptions {
    /// Spec for checks of state that should already hold.
    pub fn quick(&self) -> Result<PollSpec> {
        PollSpec::from_secs(self.interval_secs, self.deadline_secs)
    }

    /// Spec for checks of state the operator must reconcile into being.
    pub fn convergence(&self) -> Result<PollSpec> {
        PollSpec::from_secs(self.convergence_interval_secs, self.convergence_deadline_secs)
    }

    /// Spec for teardown and cross-cluster propagation checks.
    pub fn slow(&self) -> Result<PollSpec> {
        PollSpec::from_secs(self.slow_interval_secs, self.slow_deadline_secs)
    }
}

impl SuiteOptions {
    /// Load options from a YAML file and validate them.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read options file {}: {e}", path.display()))
        })?;
        let options: SuiteOptions = serde_yaml::from_str(&raw)?;
        options.validate()?;
        Ok(options)
    }

    /// Check invariants the rest of the suite relies on.
    pub fn validate(&self) -> Result<()> {
        if self.operator.namespace.is_empty() {
            return Err(Error::config_field(
                "namespace must not be empty",
                "operator.namespace",
            ));
        }
        if self.operator.observability_namespace.is_empty() {
            return Err(Error::config_field(
                "namespace must not be empty",
                "operator.observability_namespace",
            ));
        }
        if self.operator.resource_name.is_empty() {
            return Err(Error::config_field(
                "resource name must not be empty",
                "operator.resource_name",
            ));
        }
        if self.operator.required_crds.is_empty() {
            return Err(Error::config_field(
                "at least one required CRD must be named",
                "operator.required_crds",
            ));
        }
        if self.storage.bucket.is_empty() {
            return Err(Error::config_field(
                "bucket must not be empty",
                "storage.bucket",
            ));
        }
        if self.storage.endpoint.is_empty() {
            return Err(Error::config_field(
                "endpoint must not be empty",
                "storage.endpoint",
            ));
        }
        // Surfaces zero durations at startup instead of mid-scenario.
        self.timing.quick()?;
        self.timing.convergence()?;
        self.timing.slow()?;
        Ok(())
    }
}
