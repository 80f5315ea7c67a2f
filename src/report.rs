//! Outcome reporting
//!
//! Human-readable pass/fail rendering for CI logs. Progress lines go to
//! stdout; structured detail rides on `tracing`. A failed verification
//! prints its reason, attempt count, elapsed time, and the last
//! observation as pretty JSON, which is usually enough to diagnose a
//! stuck rollout without touching the cluster.

use std::time::Duration;

use crate::observe::Observation;
use crate::poll::Outcome;
use crate::predicate::Verdict;

/// Result of one executed scenario step.
#[derive(Debug)]
pub enum StepResult {
    /// A mutation ran; `error` is set when it failed.
    Mutation {
        /// Rendered error when the mutation failed.
        error: Option<String>,
    },
    /// A verification ran to a terminal outcome.
    Verification {
        /// The scheduler's outcome.
        outcome: Outcome,
    },
}

/// One executed step, as reported by the scenario driver.
#[derive(Debug)]
pub struct StepReport {
    /// The step's human-readable description.
    pub name: String,
    /// What happened.
    pub result: StepResult,
}

impl StepReport {
    /// Report a successful mutation.
    pub fn mutation_ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: StepResult::Mutation { error: None },
        }
    }

    /// Report a failed mutation.
    pub fn mutation_failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: StepResult::Mutation {
                error: Some(error.into()),
            },
        }
    }

    /// Report a verification outcome, satisfied or not.
    pub fn verification(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            result: StepResult::Verification { outcome },
        }
    }

    /// Whether this step succeeded.
    pub fn passed(&self) -> bool {
        match &self.result {
            StepResult::Mutation { error } => error.is_none(),
            StepResult::Verification { outcome } => outcome.is_satisfied(),
        }
    }

    /// Print this step's one-or-more report lines.
    pub fn render(&self) {
        match &self.result {
            StepResult::Mutation { error: None } => {
                println!("  mutation ok: {}", self.name);
            }
            StepResult::Mutation { error: Some(error) } => {
                println!("  FAILED: {}", self.name);
                println!("    {error}");
            }
            StepResult::Verification { outcome } if outcome.is_satisfied() => {
                println!(
                    "  verified: {} ({} {}, {:?})",
                    self.name,
                    outcome.attempts(),
                    attempts_noun(outcome.attempts()),
                    outcome.elapsed()
                );
            }
            StepResult::Verification { outcome } => {
                if outcome.timed_out() {
                    println!(
                        "  FAILED: {} (timed out after {} {} over {:?})",
                        self.name,
                        outcome.attempts(),
                        attempts_noun(outcome.attempts()),
                        outcome.elapsed()
                    );
                } else {
                    let reason = match outcome.verdict() {
                        Verdict::Failed(reason) => reason.as_str(),
                        _ => "unknown",
                    };
                    println!(
                        "  FAILED: {} ({} after {} {})",
                        self.name,
                        reason,
                        outcome.attempts(),
                        attempts_noun(outcome.attempts())
                    );
                }
                println!("    last observation:");
                for line in pretty_observation(outcome.last_observation()).lines() {
                    println!("      {line}");
                }
            }
        }
    }
}

fn attempts_noun(attempts: u32) -> &'static str {
    if attempts == 1 { "attempt" } else { "attempts" }
}

fn pretty_observation(observation: &Observation) -> String {
    serde_json::to_string_pretty(observation)
        .unwrap_or_else(|_| format!("{observation:?}"))
}

/// Everything that happened while driving one scenario.
#[derive(Debug)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Reports for the steps that actually executed.
    pub steps: Vec<StepReport>,
    /// How many steps the scenario planned. When a step fails, the
    /// remainder is skipped and `steps.len() < planned`.
    pub planned: usize,
    /// Wall-clock time the scenario took.
    pub elapsed: Duration,
}

impl ScenarioReport {
    /// Whether every planned step executed and passed.
    pub fn passed(&self) -> bool {
        self.steps.len() == self.planned && self.steps.iter().all(StepReport::passed)
    }

    /// Print the step lines and the scenario footer.
    pub fn render(&self) {
        for step in &self.steps {
            step.render();
        }
        if self.passed() {
            println!("  Scenario passed in {:?}", self.elapsed);
        } else {
            println!(
                "  Scenario FAILED at step {}/{} after {:?}",
                self.steps.len(),
                self.planned,
                self.elapsed
            );
        }
    }
}

/// Summary of a whole suite run.
#[derive(Debug)]
pub struct SuiteReport {
    /// Reports for the scenarios that ran, in order.
    pub reports: Vec<ScenarioReport>,
    /// How many scenarios the run planned. Fail-fast skips the rest.
    pub planned: usize,
}

impl SuiteReport {
    /// Whether every planned scenario ran and passed.
    pub fn passed(&self) -> bool {
        self.reports.len() == self.planned && self.reports.iter().all(ScenarioReport::passed)
    }

    /// Print the closing summary block.
    pub fn render_summary(&self, elapsed: Duration) {
        let passed = self.reports.iter().filter(|r| r.passed()).count();
        let failed = self.reports.len() - passed;
        let skipped = self.planned - self.reports.len();

        if self.passed() {
            println!("\n=== Verification complete ===");
        } else {
            println!("\n=== Verification FAILED ===");
        }
        println!("Scenarios: {passed} passed, {failed} failed, {skipped} skipped");
        println!("Duration: {elapsed:?}");
    }
}
