//! Stories about whole scenarios and the full catalog
//!
//! These require a hub cluster with the multicluster observability
//! operator deployed (the operator-running check is the suite's own
//! first assertion, so a bare cluster fails immediately and visibly).

use vigil::suite;

use super::helpers::{connect, test_options};

/// Story: the first scenario of the narrative passes on a prepared hub.
///
/// Expected behavior:
/// - The operator pod check converges within its quick budget
/// - The report carries one verified step
#[tokio::test]
#[ignore = "requires a hub with the operator - run with: cargo test --test e2e -- --ignored"]
async fn story_operator_check_passes_on_prepared_hub() {
    let options = test_options();
    let cluster = connect().await.expect("failed to connect");

    let entry = suite::catalog()
        .into_iter()
        .find(|entry| entry.name() == "operator-running")
        .expect("catalog has the operator check");
    let scenario = entry.build(&cluster, &options).expect("scenario builds");

    let report = scenario.run().await;
    report.render();
    assert!(report.passed(), "operator check failed");
}

/// Story: a subset selection runs exactly the named scenarios.
#[tokio::test]
#[ignore = "requires a hub with the operator - run with: cargo test --test e2e -- --ignored"]
async fn story_subset_runs_only_named_scenarios() {
    let options = test_options();

    let report = suite::run(&options, &["operator-running".to_string()])
        .await
        .expect("suite runs");

    assert_eq!(report.planned, 1);
    assert_eq!(report.reports.len(), 1);
    assert_eq!(report.reports[0].name, "operator-running");
}

/// Story: the complete narrative, install through teardown, on a hub
/// prepared with the operator and an object store.
///
/// This is the long one. Budget roughly forty minutes of polling
/// deadlines on a slow hub.
#[tokio::test]
#[ignore = "requires a hub with the operator - run with: cargo test --test e2e -- --ignored"]
async fn story_full_narrative_passes() {
    let options = test_options();
    let started = std::time::Instant::now();

    let report = suite::run(&options, &[]).await.expect("suite runs");
    report.render_summary(started.elapsed());

    assert!(report.passed(), "full narrative failed");
    assert_eq!(report.reports.len(), report.planned);
}
