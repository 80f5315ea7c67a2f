//! Verdicts and predicates over observations
//!
//! A [`Predicate`] is a pure function from an [`Observation`] to a
//! [`Verdict`]. The verdict is deliberately tri-state: `Pending` means
//! "not there yet, keep polling", which is the normal answer against an
//! eventually-consistent control plane, and is distinct from `Failed`,
//! which means the desired state is impossible and polling should stop.
//!
//! Two shapes cover almost every assertion in the suite:
//!
//! - [`presence`]: the target must exist and its snapshot must satisfy a
//!   check. Absence and empty results are `Pending`, never `Failed`; the
//!   deadline is the only thing that turns a missing target into a
//!   failure.
//! - [`absence`]: the target must be gone. An authoritative miss or an
//!   empty query result is `Satisfied`.
//!
//! Both shapes fail fast on [`ObservedState::Rejected`], the one
//! classification that cannot improve with time.

#[cfg(test)]
use mockall::automock;

use crate::observe::{Observation, ObservedState};
use serde::Serialize;
use serde_json::Value;

/// Tri-state result of evaluating a predicate against one observation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The desired state holds; polling stops successfully.
    Satisfied,
    /// The desired state does not hold yet; poll again after the interval.
    Pending,
    /// The desired state is unreachable; polling stops with this reason.
    Failed(String),
}

impl Verdict {
    /// Create a failed verdict with the given reason
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Whether this verdict stops the poll loop
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Verdict::Pending)
    }
}

/// An assertion about observed state, evaluated once per polling cycle.
///
/// Implementations must be pure: evaluating the same observation twice
/// yields the same verdict, with no side effects. The scheduler relies on
/// this when it re-evaluates nothing and sleeps between cycles.
#[cfg_attr(test, automock)]
pub trait Predicate: Send + Sync {
    /// Human-readable statement of the expected condition, for reports.
    fn describe(&self) -> String;

    /// Judge one observation.
    fn evaluate(&self, observation: &Observation) -> Verdict;
}

/// Presence-shaped predicate: the target must exist and its snapshot must
/// satisfy `check`.
pub struct Presence<F> {
    description: String,
    check: F,
}

/// Build a presence predicate from a snapshot check.
///
/// ```ignore
/// let ready = presence("exactly one operator pod running", |pods| {
///     pods["count"] == 1
/// });
/// ```
pub fn presence<F>(description: impl Into<String>, check: F) -> Presence<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    Presence {
        description: description.into(),
        check,
    }
}

impl<F> Predicate for Presence<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn evaluate(&self, observation: &Observation) -> Verdict {
        match observation.state() {
            ObservedState::Snapshot(value) if (self.check)(value) => Verdict::Satisfied,
            ObservedState::Snapshot(_) => Verdict::Pending,
            // Not there yet is the expected transient answer for presence.
            ObservedState::Missing | ObservedState::NoData { .. } => Verdict::Pending,
            ObservedState::Rejected { detail } => {
                Verdict::failed(format!("request permanently rejected: {detail}"))
            }
            ObservedState::Unreachable { .. } => Verdict::Pending,
        }
    }
}

/// Absence-shaped predicate: the target must be gone.
pub struct Absence {
    description: String,
}

/// Build an absence predicate.
///
/// An authoritative miss and an empty query result both count as gone.
/// A snapshot means the target still exists, which is pending, not
/// failed.
pub fn absence(description: impl Into<String>) -> Absence {
    Absence {
        description: description.into(),
    }
}

impl Predicate for Absence {
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn evaluate(&self, observation: &Observation) -> Verdict {
        match observation.state() {
            ObservedState::Missing | ObservedState::NoData { .. } => Verdict::Satisfied,
            ObservedState::Snapshot(_) => Verdict::Pending,
            ObservedState::Rejected { detail } => {
                Verdict::failed(format!("request permanently rejected: {detail}"))
            }
            ObservedState::Unreachable { .. } => Verdict::Pending,
        }
    }
}

/// Predicate built from an arbitrary verdict function.
///
/// The escape hatch for assertions the presence/absence shapes cannot
/// express, and the way integration tests script verdict sequences.
pub struct FnPredicate<F> {
    description: String,
    judge: F,
}

/// Build a predicate from a closure over the whole observation.
pub fn from_fn<F>(description: impl Into<String>, judge: F) -> FnPredicate<F>
where
    F: Fn(&Observation) -> Verdict + Send + Sync,
{
    FnPredicate {
        description: description.into(),
        judge,
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Observation) -> Verdict + Send + Sync,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn evaluate(&self, observation: &Observation) -> Verdict {
        (self.judge)(observation)
    }
}

/// Presence predicate over a resource's status conditions: satisfied when
/// an entry of the wanted type carries status `"True"`.
pub fn status_condition_true(condition_type: impl Into<String>) -> impl Predicate {
    let wanted = condition_type.into();
    let description = format!("status condition '{wanted}' is True");
    presence(description, move |snapshot| {
        snapshot["status"]["conditions"]
            .as_array()
            .map(|conditions| {
                conditions.iter().any(|c| {
                    c["type"].as_str() == Some(wanted.as_str())
                        && c["status"].as_str() == Some("True")
                })
            })
            .unwrap_or(false)
    })
}
