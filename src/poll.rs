//! Poll scheduler: bounded-deadline convergence polling
//!
//! The scheduler drives one assertion to a terminal result. Each cycle it
//! reads the target's state through a [`StateReader`], judges it with a
//! [`Predicate`], and either stops (terminal verdict) or sleeps and goes
//! again, for as long as the [`PollSpec`] deadline allows.
//!
//! Two rules keep the loop honest against an eventually-consistent
//! control plane:
//!
//! - A read error is a pending cycle, never a failure. The API server
//!   flaking must not fail an assertion the deadline would have saved.
//! - The sleep is clamped to the remaining budget. A deadline shorter
//!   than the interval therefore costs exactly one evaluation cycle, and
//!   a timeout is always reported with `elapsed >= deadline`.
//!
//! The result is an immutable [`Outcome`] carrying the final verdict, the
//! last observation, the attempt count, and the elapsed wall-clock time.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::Result;
use crate::error::Error;
use crate::observe::Observation;
use crate::predicate::{Predicate, Verdict};
use crate::reader::StateReader;

/// Failure reason reported when the deadline expires before convergence.
pub const DEADLINE_EXCEEDED: &str = "deadline exceeded";

/// Cadence and patience for one assertion.
///
/// Both durations must be strictly positive. `interval > deadline` is
/// legal and degenerates to a single evaluation cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSpec {
    interval: Duration,
    deadline: Duration,
}

impl PollSpec {
    /// Create a poll spec, rejecting zero durations.
    pub fn new(interval: Duration, deadline: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::config_field(
                "poll interval must be positive",
                "interval",
            ));
        }
        if deadline.is_zero() {
            return Err(Error::config_field(
                "poll deadline must be positive",
                "deadline",
            ));
        }
        Ok(Self { interval, deadline })
    }

    /// Create a poll spec from whole seconds.
    pub fn from_secs(interval_secs: u64, deadline_secs: u64) -> Result<Self> {
        Self::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(deadline_secs),
        )
    }

    /// Time to wait between evaluation cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total wall-clock budget for the assertion.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl Default for PollSpec {
    /// One-second cadence with a one-minute budget.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            deadline: Duration::from_secs(60),
        }
    }
}

/// Terminal result of one scheduler run. Created once, then read-only.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    verdict: Verdict,
    last: Observation,
    attempts: u32,
    elapsed: Duration,
    timed_out: bool,
}

impl Outcome {
    pub(crate) fn new(
        verdict: Verdict,
        last: Observation,
        attempts: u32,
        elapsed: Duration,
        timed_out: bool,
    ) -> Self {
        Self {
            verdict,
            last,
            attempts,
            elapsed,
            timed_out,
        }
    }

    /// The final verdict: satisfied or failed, never pending.
    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    /// The last observation made before termination.
    pub fn last_observation(&self) -> &Observation {
        &self.last
    }

    /// How many evaluation cycles ran.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wall-clock time from first read to termination.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether termination was caused by deadline expiry rather than a
    /// terminal verdict. Lets reports distinguish "never converged" from
    /// "converged to the wrong state".
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Whether the assertion converged.
    pub fn is_satisfied(&self) -> bool {
        self.verdict == Verdict::Satisfied
    }
}

/// Poll `reader` under `spec` until `predicate` reaches a terminal
/// verdict or the deadline expires.
///
/// Never returns early on read errors; those become unreachable
/// observations with a pending verdict. The predicate is only consulted
/// on successful reads.
pub async fn converge(
    reader: &dyn StateReader,
    predicate: &dyn Predicate,
    spec: PollSpec,
) -> Outcome {
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let (observation, verdict) = match reader.read().await {
            Ok(observation) => {
                let verdict = predicate.evaluate(&observation);
                (observation, verdict)
            }
            Err(error) => {
                debug!(
                    target = %reader.target(),
                    attempt = attempts,
                    error = %error,
                    "Read failed, counting cycle as pending"
                );
                let observation = Observation::unreachable(reader.target(), error.to_string());
                (observation, Verdict::Pending)
            }
        };

        match verdict {
            Verdict::Satisfied => {
                debug!(
                    target = %reader.target(),
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Assertion satisfied"
                );
                return Outcome::new(
                    Verdict::Satisfied,
                    observation,
                    attempts,
                    started.elapsed(),
                    false,
                );
            }
            Verdict::Failed(reason) => {
                debug!(
                    target = %reader.target(),
                    attempts,
                    reason = %reason,
                    "Assertion failed terminally"
                );
                return Outcome::new(
                    Verdict::Failed(reason),
                    observation,
                    attempts,
                    started.elapsed(),
                    false,
                );
            }
            Verdict::Pending => {
                let elapsed = started.elapsed();
                if elapsed >= spec.deadline {
                    return timed_out(observation, attempts, elapsed);
                }
                trace!(
                    target = %reader.target(),
                    attempt = attempts,
                    state = observation.state().label(),
                    "Still pending"
                );
                let remaining = spec.deadline - elapsed;
                tokio::time::sleep(spec.interval.min(remaining)).await;
                if started.elapsed() >= spec.deadline {
                    return timed_out(observation, attempts, started.elapsed());
                }
            }
        }
    }
}

fn timed_out(last: Observation, attempts: u32, elapsed: Duration) -> Outcome {
    debug!(
        target = %last.target(),
        attempts,
        elapsed_ms = elapsed.as_millis() as u64,
        "Deadline exceeded"
    );
    Outcome::new(
        Verdict::failed(DEADLINE_EXCEEDED),
        last,
        attempts,
        elapsed,
        true,
    )
}
