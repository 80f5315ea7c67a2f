//! Stories about readers and convergence against a live API server
//!
//! Any reachable cluster works for these; they touch only kube-system
//! and a scratch namespace they create and remove themselves.

use std::time::Duration;

use vigil::mutate::{DeleteResource, EnsureNamespace, Mutation};
use vigil::observe::ObservedState;
use vigil::poll::{self, PollSpec};
use vigil::predicate;
use vigil::reader::StateReader;
use vigil::reader::kube::{NamespaceByName, PodSet};

use super::helpers::connect;

const SCRATCH_NAMESPACE: &str = "vigil-e2e-scratch";

/// Story: a pod reader projects live state into the snapshot shape
/// predicates expect.
///
/// Expected behavior:
/// - kube-system always has pods, so the observation is a snapshot
/// - The projection carries a count and per-pod name/phase
#[tokio::test]
#[ignore = "requires a cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_reader_observes_kube_system_pods() {
    let cluster = connect().await.expect("failed to connect");
    let reader = PodSet::all(cluster.client().clone(), "kube-system");

    let observation = reader.read().await.expect("pod list should succeed");

    let snapshot = observation.as_snapshot().expect("kube-system has pods");
    assert!(snapshot["count"].as_u64().expect("count field") >= 1);
    assert!(snapshot["pods"][0]["name"].is_string());
}

/// Story: a 404 from a real API server is classified as an observation,
/// not an error.
#[tokio::test]
#[ignore = "requires a cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_missing_namespace_is_an_observation() {
    let cluster = connect().await.expect("failed to connect");
    let reader = NamespaceByName::new(cluster.client().clone(), "vigil-does-not-exist");

    let observation = reader.read().await.expect("read should classify the 404");

    assert_eq!(*observation.state(), ObservedState::Missing);
}

/// Story: create a namespace, watch it converge to present, delete it,
/// watch it converge to gone. The whole mutation/verification loop
/// against real eventual consistency.
#[tokio::test]
#[ignore = "requires a cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_namespace_lifecycle_converges() {
    let cluster = connect().await.expect("failed to connect");
    let client = cluster.client().clone();

    EnsureNamespace::new(client.clone(), SCRATCH_NAMESPACE)
        .apply()
        .await
        .expect("namespace apply");

    let present = poll::converge(
        &NamespaceByName::new(client.clone(), SCRATCH_NAMESPACE),
        &predicate::presence("scratch namespace active", |ns| ns["phase"] == "Active"),
        PollSpec::from_secs(1, 30).expect("valid spec"),
    )
    .await;
    assert!(present.is_satisfied(), "namespace never became active");

    DeleteResource::new(client.clone(), "v1", "Namespace", None, SCRATCH_NAMESPACE)
        .apply()
        .await
        .expect("namespace delete");

    // Namespace finalization takes a while on a busy cluster.
    let gone = poll::converge(
        &NamespaceByName::new(client, SCRATCH_NAMESPACE),
        &predicate::absence("scratch namespace deleted"),
        PollSpec::new(Duration::from_secs(2), Duration::from_secs(120)).expect("valid spec"),
    )
    .await;
    assert!(gone.is_satisfied(), "namespace never went away");
}

/// Story: deleting something already gone is a no-op, so teardown steps
/// are safe to re-run.
#[tokio::test]
#[ignore = "requires a cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_delete_tolerates_absence() {
    let cluster = connect().await.expect("failed to connect");

    DeleteResource::new(
        cluster.client().clone(),
        "v1",
        "Namespace",
        None,
        "vigil-does-not-exist",
    )
    .apply()
    .await
    .expect("deleting a missing resource should succeed");
}
