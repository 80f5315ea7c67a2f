//! Shared setup for cluster-backed tests

use vigil::Result;
use vigil::cluster::Cluster;
use vigil::config::SuiteOptions;

/// Suite options for the cluster the run points at. Everything comes
/// from defaults plus the standard environment (KUBECONFIG).
pub fn test_options() -> SuiteOptions {
    SuiteOptions::default()
}

/// Connect to the cluster the environment points at.
pub async fn connect() -> Result<Cluster> {
    Cluster::connect(&test_options().cluster).await
}
