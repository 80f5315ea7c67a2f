//! Integration tests for the convergence harness
//!
//! These tests drive the public polling and scenario APIs with scripted
//! readers and real (millisecond-scale) timings. No cluster is needed;
//! they verify the attempt-count and deadline behavior every scenario
//! relies on.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use vigil::Result;
use vigil::mutate::Mutation;
use vigil::observe::Observation;
use vigil::poll::{self, PollSpec};
use vigil::predicate::{self, Predicate, Verdict};
use vigil::reader::StateReader;
use vigil::scenario::Scenario;

// =============================================================================
// Test Fixtures
// =============================================================================

/// Reader that replays a fixed script of observations, then repeats the
/// last one forever.
struct ScriptedReader {
    calls: Arc<AtomicU32>,
    script: Vec<Observation>,
}

impl ScriptedReader {
    fn new(script: Vec<Observation>) -> (Self, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let reader = Self {
            calls: calls.clone(),
            script,
        };
        (reader, calls)
    }
}

#[async_trait]
impl StateReader for ScriptedReader {
    fn target(&self) -> String {
        "scripted state".to_string()
    }

    async fn read(&self) -> Result<Observation> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let observation = self
            .script
            .get(call)
            .or_else(|| self.script.last())
            .cloned()
            .expect("script must not be empty");
        Ok(observation)
    }
}

/// Reader whose backend is down: every read errors at the transport
/// level.
struct DownReader {
    calls: Arc<AtomicU32>,
}

impl DownReader {
    fn new() -> (Self, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let reader = Self {
            calls: calls.clone(),
        };
        (reader, calls)
    }
}

#[async_trait]
impl StateReader for DownReader {
    fn target(&self) -> String {
        "unreachable endpoint".to_string()
    }

    async fn read(&self) -> Result<Observation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(vigil::Error::endpoint("connection refused"))
    }
}

/// Mutation that records its execution, optionally failing.
struct RecordingMutation {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

#[async_trait]
impl Mutation for RecordingMutation {
    fn describe(&self) -> String {
        self.name.to_string()
    }

    async fn apply(&self) -> Result<()> {
        self.log
            .lock()
            .expect("log lock")
            .push(self.name.to_string());
        if self.fail {
            Err(vigil::Error::mutation(self.name, "simulated apply failure"))
        } else {
            Ok(())
        }
    }
}

fn running_pods() -> Observation {
    Observation::snapshot(
        "pods",
        json!({ "count": 1, "pods": [{ "name": "operator-abc", "phase": "Running" }] }),
    )
}

fn one_running_pod() -> impl Predicate {
    predicate::presence("exactly one pod running", |pods| pods["count"] == 1)
}

// =============================================================================
// Convergence Timing Stories
// =============================================================================

/// Story: state that converges after a few cycles is reported with the
/// attempt count and elapsed time the wait actually took.
///
/// Expected behavior:
/// - One read per cycle, no reads after the verdict turns terminal
/// - Elapsed covers the sleeps between the pending cycles
#[tokio::test]
async fn story_pending_cycles_then_satisfied() {
    let (reader, calls) = ScriptedReader::new(vec![
        Observation::missing("pods"),
        Observation::missing("pods"),
        Observation::missing("pods"),
        running_pods(),
    ]);
    let spec = PollSpec::new(Duration::from_millis(30), Duration::from_secs(5))
        .expect("valid spec");

    let outcome = poll::converge(&reader, &one_running_pod(), spec).await;

    assert!(outcome.is_satisfied());
    assert!(!outcome.timed_out());
    assert_eq!(outcome.attempts(), 4);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(outcome.elapsed() >= Duration::from_millis(90));
    assert!(outcome.elapsed() < Duration::from_secs(5));
}

/// Story: state that never converges exhausts the deadline.
///
/// Expected behavior:
/// - The reported verdict is a failure naming the deadline
/// - Attempts never exceed deadline/interval + 1
/// - Elapsed is at least the deadline, so timeout reports never
///   understate how long the suite actually waited
#[tokio::test]
async fn story_deadline_bounds_the_attempts() {
    let (reader, calls) = ScriptedReader::new(vec![Observation::missing("pods")]);
    let spec = PollSpec::new(Duration::from_millis(25), Duration::from_millis(200))
        .expect("valid spec");

    let outcome = poll::converge(&reader, &one_running_pod(), spec).await;

    assert!(!outcome.is_satisfied());
    assert!(outcome.timed_out());
    assert!(matches!(outcome.verdict(), Verdict::Failed(reason) if reason.contains("deadline")));
    let attempts = outcome.attempts();
    assert!((2..=9).contains(&attempts), "attempts = {attempts}");
    assert_eq!(calls.load(Ordering::SeqCst), attempts);
    assert!(outcome.elapsed() >= Duration::from_millis(200));
}

/// Story: a deadline shorter than the interval still buys exactly one
/// observation cycle rather than zero.
#[tokio::test]
async fn story_short_deadline_still_observes_once() {
    let (reader, calls) = ScriptedReader::new(vec![Observation::missing("pods")]);
    let spec = PollSpec::new(Duration::from_secs(5), Duration::from_millis(50))
        .expect("valid spec");

    let outcome = poll::converge(&reader, &one_running_pod(), spec).await;

    assert_eq!(outcome.attempts(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(outcome.timed_out());
    // The clamp keeps the wait at the deadline, not the interval.
    assert!(outcome.elapsed() >= Duration::from_millis(50));
    assert!(outcome.elapsed() < Duration::from_secs(5));
}

/// Story: a permanent rejection stops the poll immediately. Retrying a
/// malformed query cannot change the answer.
#[tokio::test]
async fn story_permanent_rejection_is_not_retried() {
    let (reader, calls) = ScriptedReader::new(vec![Observation::rejected(
        "query",
        "400 Bad Request: parse error at char 3",
    )]);
    let spec = PollSpec::new(Duration::from_millis(20), Duration::from_secs(5))
        .expect("valid spec");

    let outcome = poll::converge(&reader, &one_running_pod(), spec).await;

    assert!(!outcome.is_satisfied());
    assert!(!outcome.timed_out());
    assert_eq!(outcome.attempts(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(
        matches!(outcome.verdict(), Verdict::Failed(reason) if reason.contains("parse error"))
    );
    assert!(outcome.elapsed() < Duration::from_secs(1));
}

// =============================================================================
// Outage Classification Stories
// =============================================================================

/// Story: a flapping API server is absorbed as pending cycles. The
/// assertion only fails when the deadline passes, and the report shows
/// the last transport error.
#[tokio::test]
async fn story_reader_errors_absorbed_until_deadline() {
    let (reader, calls) = DownReader::new();
    let spec = PollSpec::new(Duration::from_millis(25), Duration::from_millis(150))
        .expect("valid spec");

    let outcome = poll::converge(&reader, &one_running_pod(), spec).await;

    assert!(outcome.timed_out());
    assert!(calls.load(Ordering::SeqCst) >= 2);
    let last = outcome.last_observation();
    assert_eq!(last.state().label(), "unreachable");
    let rendered = serde_json::to_string(last).expect("serialize observation");
    assert!(rendered.contains("connection refused"));
}

/// Story: an outage must never satisfy an absence check. "I could not
/// reach the store" and "the store has no data" are different answers,
/// and only the second one counts as gone.
#[tokio::test]
async fn story_outage_never_satisfies_absence() {
    let (reader, _calls) = DownReader::new();
    let gone = predicate::absence("collector pods drained");
    let spec = PollSpec::new(Duration::from_millis(20), Duration::from_millis(120))
        .expect("valid spec");

    let outcome = poll::converge(&reader, &gone, spec).await;

    assert!(!outcome.is_satisfied());
    assert!(outcome.timed_out());
}

/// Story: an authoritative empty answer satisfies an absence check on
/// the very first cycle.
#[tokio::test]
async fn story_absence_satisfied_by_authoritative_no_data() {
    let (reader, calls) = ScriptedReader::new(vec![Observation::no_data(
        "query",
        "no matching series for query",
    )]);
    let gone = predicate::absence("managed cluster metric stops arriving");
    let spec = PollSpec::default();

    let outcome = poll::converge(&reader, &gone, spec).await;

    assert!(outcome.is_satisfied());
    assert_eq!(outcome.attempts(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Story: predicates are pure. Judging the same observation twice gives
/// the same verdict, so a re-render of a report never disagrees with
/// the run that produced it.
#[test]
fn story_predicates_are_deterministic() {
    let observation = running_pods();
    let predicate = one_running_pod();
    assert_eq!(
        predicate.evaluate(&observation),
        predicate.evaluate(&observation)
    );

    let gone = predicate::absence("pods drained");
    let missing = Observation::missing("pods");
    assert_eq!(gone.evaluate(&missing), gone.evaluate(&missing));
    assert_eq!(gone.evaluate(&missing), Verdict::Satisfied);
}

// =============================================================================
// Scenario Driver Stories
// =============================================================================

/// Story: a scenario runs mutations and verifications in order and
/// reports every executed step.
#[tokio::test]
async fn story_scenario_runs_steps_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (reader, calls) = ScriptedReader::new(vec![running_pods()]);

    let scenario = Scenario::new("install")
        .mutate(RecordingMutation {
            name: "create namespace",
            log: log.clone(),
            fail: false,
        })
        .verify(
            reader,
            one_running_pod(),
            PollSpec::new(Duration::from_millis(10), Duration::from_secs(2))
                .expect("valid spec"),
        );

    let report = scenario.run().await;

    assert!(report.passed());
    assert_eq!(report.steps.len(), 2);
    assert_eq!(*log.lock().expect("log lock"), vec!["create namespace"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Story: a failed mutation aborts the scenario before the following
/// steps touch the cluster.
#[tokio::test]
async fn story_failed_mutation_aborts_scenario() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (reader, calls) = ScriptedReader::new(vec![running_pods()]);

    let scenario = Scenario::new("install")
        .mutate(RecordingMutation {
            name: "apply instance",
            log: log.clone(),
            fail: true,
        })
        .verify(
            reader,
            one_running_pod(),
            PollSpec::default(),
        )
        .mutate(RecordingMutation {
            name: "never reached",
            log: log.clone(),
            fail: false,
        });

    let report = scenario.run().await;

    assert!(!report.passed());
    assert_eq!(report.planned, 3);
    assert_eq!(report.steps.len(), 1);
    // The verification after the failed mutation never read anything.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(*log.lock().expect("log lock"), vec!["apply instance"]);
}

/// Story: a verification that cannot converge fails its scenario with
/// the timeout outcome attached.
#[tokio::test]
async fn story_failed_verification_carries_outcome() {
    let (reader, _calls) = ScriptedReader::new(vec![Observation::missing("pods")]);

    let scenario = Scenario::new("uninstall").verify(
        reader,
        one_running_pod(),
        PollSpec::new(Duration::from_millis(20), Duration::from_millis(100))
            .expect("valid spec"),
    );

    let report = scenario.run().await;

    assert!(!report.passed());
    let step = report.steps.first().expect("one executed step");
    assert!(!step.passed());
}
