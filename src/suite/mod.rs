//! The scenario catalog and the runner that drives it.
//!
//! Scenarios are registered here in narrative order: install depends on
//! the operator being up, the console checks depend on the install, and
//! teardown depends on everything before it. The runner is fail-fast
//! across scenarios for the same reason the driver is fail-fast across
//! steps: once the shared cluster state has diverged from the story,
//! later scenarios can only produce noise.

pub mod observability;

use std::time::Instant;

use tracing::{info, warn};

use crate::cluster::Cluster;
use crate::config::SuiteOptions;
use crate::report::SuiteReport;
use crate::scenario::Scenario;
use crate::{Error, Result};

/// One catalog entry: a named scenario and how to build it.
#[derive(Debug)]
pub struct ScenarioEntry {
    name: &'static str,
    summary: &'static str,
    build: fn(&Cluster, &SuiteOptions) -> Result<Scenario>,
}

impl ScenarioEntry {
    /// Scenario name, as accepted by `--only`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// One-line description for listings.
    pub fn summary(&self) -> &'static str {
        self.summary
    }

    /// Build the scenario against a connected cluster.
    pub fn build(&self, cluster: &Cluster, options: &SuiteOptions) -> Result<Scenario> {
        (self.build)(cluster, options)
    }
}

/// All scenarios, in the order the suite runs them.
pub fn catalog() -> Vec<ScenarioEntry> {
    vec![
        ScenarioEntry {
            name: "operator-running",
            summary: "exactly one operator pod is up",
            build: observability::operator_running,
        },
        ScenarioEntry {
            name: "crds-established",
            summary: "the operator's CRDs are served",
            build: observability::crds_established,
        },
        ScenarioEntry {
            name: "stack-deployed",
            summary: "secrets and the instance go in, the stack reports Ready",
            build: observability::stack_deployed,
        },
        ScenarioEntry {
            name: "console-reachable",
            summary: "the Grafana console answers",
            build: observability::console_reachable,
        },
        ScenarioEntry {
            name: "retention-applied",
            summary: "a retention change reaches the compactor arguments",
            build: observability::retention_applied,
        },
        ScenarioEntry {
            name: "metrics-available",
            summary: "managed cluster metrics arrive in the console",
            build: observability::metrics_available,
        },
        ScenarioEntry {
            name: "addon-disabled",
            summary: "disabling the addon drains collectors and their metrics",
            build: observability::addon_disabled,
        },
        ScenarioEntry {
            name: "availability-basic",
            summary: "Basic availability scales the stack down to single replicas",
            build: observability::availability_basic,
        },
        ScenarioEntry {
            name: "uninstalled",
            summary: "deleting the instance tears everything down",
            build: observability::uninstalled,
        },
    ]
}

/// Run the suite, or the `only` subset of it, against the configured
/// cluster.
///
/// Every scenario gets a freshly connected [`Cluster`], so credential
/// or endpoint drift shows up at the scenario that hits it rather than
/// poisoning a long-lived client.
pub async fn run(options: &SuiteOptions, only: &[String]) -> Result<SuiteReport> {
    let entries = select(catalog(), only)?;
    let planned = entries.len();
    let mut reports = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        println!(
            "\n[Scenario {}/{}] {}: {}",
            index + 1,
            planned,
            entry.name(),
            entry.summary()
        );
        info!(scenario = %entry.name(), "Connecting");
        let cluster = Cluster::connect(&options.cluster).await?;

        let scenario = entry.build(&cluster, options)?;
        let started = Instant::now();
        let report = scenario.run().await;
        report.render();

        let passed = report.passed();
        info!(
            scenario = %entry.name(),
            passed,
            elapsed = ?started.elapsed(),
            "Scenario finished"
        );
        reports.push(report);
        if !passed {
            warn!(scenario = %entry.name(), "Stopping at first failed scenario");
            break;
        }
    }

    Ok(SuiteReport { reports, planned })
}

fn select(catalog: Vec<ScenarioEntry>, only: &[String]) -> Result<Vec<ScenarioEntry>> {
    if only.is_empty() {
        return Ok(catalog);
    }
    for wanted in only {
        if !catalog.iter().any(|entry| entry.name() == wanted) {
            return Err(Error::config(format!(
                "no scenario named '{wanted}' (see --list for the catalog)"
            )));
        }
    }
    Ok(catalog
        .into_iter()
        .filter(|entry| only.iter().any(|wanted| wanted == entry.name()))
        .collect())
}
