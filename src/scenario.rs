//! Scenario driver
//!
//! A [`Scenario`] is a named, ordered sequence of steps. Each step is
//! either a [`Mutation`] (fallible, never retried) or a verification:
//! a reader, a predicate, and a poll spec handed to the scheduler.
//!
//! Execution is strictly sequential and fail-fast. The first mutation
//! error or unsatisfied outcome stops the scenario; remaining steps are
//! skipped and the report says so. There are no parallel branches and no
//! rollback: later scenarios see whatever state the cluster is actually
//! in.

use std::time::Instant;

use tracing::{error, info};

use crate::error::Error;
use crate::mutate::Mutation;
use crate::poll::{self, PollSpec};
use crate::predicate::Predicate;
use crate::reader::StateReader;
use crate::report::{ScenarioReport, StepReport};

enum Step {
    Mutate(Box<dyn Mutation>),
    Verify {
        reader: Box<dyn StateReader>,
        predicate: Box<dyn Predicate>,
        spec: PollSpec,
    },
}

/// A named, ordered sequence of mutations and verifications.
pub struct Scenario {
    name: String,
    steps: Vec<Step>,
}

impl Scenario {
    /// Start an empty scenario. An empty scenario passes vacuously.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a mutation step.
    pub fn mutate(mut self, mutation: impl Mutation + 'static) -> Self {
        self.steps.push(Step::Mutate(Box::new(mutation)));
        self
    }

    /// Append a verification step.
    pub fn verify(
        mut self,
        reader: impl StateReader + 'static,
        predicate: impl Predicate + 'static,
        spec: PollSpec,
    ) -> Self {
        self.steps.push(Step::Verify {
            reader: Box::new(reader),
            predicate: Box::new(predicate),
            spec,
        });
        self
    }

    /// The scenario's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many steps this scenario will attempt.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the scenario has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, stopping at the first failure.
    pub async fn run(&self) -> ScenarioReport {
        info!(scenario = %self.name, steps = self.steps.len(), "Scenario starting");
        let started = Instant::now();
        let mut steps = Vec::new();

        for step in &self.steps {
            match step {
                Step::Mutate(mutation) => {
                    let name = mutation.describe();
                    info!(scenario = %self.name, step = %name, "Mutating");
                    match mutation.apply().await {
                        Ok(()) => steps.push(StepReport::mutation_ok(name)),
                        Err(e) => {
                            let wrapped = Error::mutation(&name, e.to_string());
                            error!(
                                scenario = %self.name,
                                step = %name,
                                error = %wrapped,
                                "Mutation failed, aborting scenario"
                            );
                            steps.push(StepReport::mutation_failed(name, wrapped.to_string()));
                            break;
                        }
                    }
                }
                Step::Verify {
                    reader,
                    predicate,
                    spec,
                } => {
                    let name = predicate.describe();
                    info!(
                        scenario = %self.name,
                        step = %name,
                        target = %reader.target(),
                        "Verifying"
                    );
                    let outcome = poll::converge(reader.as_ref(), predicate.as_ref(), *spec).await;
                    let satisfied = outcome.is_satisfied();
                    if !satisfied {
                        error!(
                            scenario = %self.name,
                            step = %name,
                            attempts = outcome.attempts(),
                            timed_out = outcome.timed_out(),
                            "Verification failed, aborting scenario"
                        );
                    }
                    steps.push(StepReport::verification(name, outcome));
                    if !satisfied {
                        break;
                    }
                }
            }
        }

        let report = ScenarioReport {
            name: self.name.clone(),
            steps,
            planned: self.steps.len(),
            elapsed: started.elapsed(),
        };
        info!(
            scenario = %self.name,
            passed = report.passed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Scenario finished"
        );
        report
    }
}
