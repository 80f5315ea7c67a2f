//! Cluster access
//!
//! A [`Cluster`] bundles the two clients a scenario needs: a `kube`
//! client for the API server and a `reqwest` client for the console
//! endpoints. Handles are constructed explicitly, per scenario, and
//! passed down; no module-level client state exists anywhere in the
//! crate.

use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use tracing::debug;

use crate::Result;
use crate::config::ClusterOptions;
use crate::error::Error;

/// Default connect timeout for the kube client
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for the kube client
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Explicitly-constructed cluster handle: kube client plus HTTP client.
#[derive(Clone)]
pub struct Cluster {
    client: Client,
    http: reqwest::Client,
}

impl Cluster {
    /// Connect using the given cluster options.
    ///
    /// With a kubeconfig path the file is read and the requested context
    /// selected; otherwise in-cluster config and the standard environment
    /// fallbacks apply. Both paths get explicit connect/read timeouts so
    /// a dead API server turns into a classifiable read error instead of
    /// a hang.
    pub async fn connect(options: &ClusterOptions) -> Result<Self> {
        let mut config = match &options.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    Error::config(format!("failed to read kubeconfig: {e}"))
                })?;
                let context_options = KubeConfigOptions {
                    context: options.context.clone(),
                    ..KubeConfigOptions::default()
                };
                Config::from_custom_kubeconfig(kubeconfig, &context_options)
                    .await
                    .map_err(|e| Error::config(format!("failed to load kubeconfig: {e}")))?
            }
            None => Config::infer()
                .await
                .map_err(|e| Error::config(format!("failed to infer kube config: {e}")))?,
        };
        config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
        config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

        debug!(cluster_url = %config.cluster_url, "Connecting to cluster");
        let client = Client::try_from(config)
            .map_err(|e| Error::config(format!("failed to create kube client: {e}")))?;

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(DEFAULT_READ_TIMEOUT)
            .build()?;

        Ok(Self { client, http })
    }

    /// The Kubernetes API client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The HTTP client for console endpoints.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    #[cfg(test)]
    pub(crate) fn from_parts(client: Client, http: reqwest::Client) -> Self {
        Self { client, http }
    }
}

/// Split an apiVersion into (group, version). Core resources have an
/// empty group.
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Build an `ApiResource` from an explicit apiVersion and kind.
///
/// For resources named in the options file the apiVersion is always
/// known up front, so no discovery round-trip is needed.
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Lowercase-pluralize a kind the way the API server names resources.
fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        // observability -> observabilities, but not gateway -> gateways
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}
