//! Observation model for polling cycles
//!
//! An [`Observation`] is what a state reader saw on a single polling
//! cycle: the target it looked at plus a classification of the result.
//! Readers classify rather than error wherever the remote answered
//! authoritatively. A 404 on a named resource is not a failure, it is an
//! observation that the resource is absent; a metrics query that ran and
//! matched no series is not a failure, it is an observation that there is
//! no data. Only transport-level problems surface as `Err` from a reader,
//! and those are folded into [`ObservedState::Unreachable`] by the poll
//! scheduler rather than by readers themselves.
//!
//! Observations are transient. They live for one cycle, except the last
//! one, which the scheduler keeps inside the final outcome for
//! diagnostics.

use serde::Serialize;
use serde_json::Value;

/// A snapshot of remote state fetched during one polling cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Observation {
    target: String,
    state: ObservedState,
}

/// Reader-side classification of what a polling cycle saw.
///
/// This enumeration is the contract between readers and predicates.
/// Predicates never inspect raw error strings; any fragile signature
/// matching (HTTP status classes, "no matching series" style responses)
/// happens once, inside the reader that owns the protocol.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedState {
    /// The target exists; carries a compact JSON projection of its state.
    Snapshot(Value),

    /// The API answered authoritatively that the target does not exist
    /// (a 404 on a named resource, or an empty label-selector match).
    Missing,

    /// The backing store executed the query and explicitly reported an
    /// empty result set, e.g. a metrics query with no matching series.
    NoData {
        /// The store's own wording, kept for diagnostics.
        detail: String,
    },

    /// The remote permanently rejected the request, e.g. a malformed
    /// query. Retrying cannot change this.
    Rejected {
        /// The rejection message.
        detail: String,
    },

    /// The read failed at the transport level. Constructed only by the
    /// poll scheduler from a reader error; treated as a pending cycle.
    Unreachable {
        /// Display form of the underlying error.
        error: String,
    },
}

impl Observation {
    /// An observation carrying a JSON projection of existing state.
    pub fn snapshot(target: impl Into<String>, state: Value) -> Self {
        Self {
            target: target.into(),
            state: ObservedState::Snapshot(state),
        }
    }

    /// An observation that the target authoritatively does not exist.
    pub fn missing(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: ObservedState::Missing,
        }
    }

    /// An observation that the query ran and matched nothing.
    pub fn no_data(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: ObservedState::NoData {
                detail: detail.into(),
            },
        }
    }

    /// An observation that the remote permanently rejected the request.
    pub fn rejected(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: ObservedState::Rejected {
                detail: detail.into(),
            },
        }
    }

    /// An observation standing in for a failed read. Used by the poll
    /// scheduler so the last observation always exists, even when the
    /// very first read errored.
    pub fn unreachable(target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: ObservedState::Unreachable {
                error: error.into(),
            },
        }
    }

    /// The human-readable identifier of what was observed.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The classified state seen this cycle.
    pub fn state(&self) -> &ObservedState {
        &self.state
    }

    /// The JSON projection, when the target was seen to exist.
    pub fn as_snapshot(&self) -> Option<&Value> {
        match &self.state {
            ObservedState::Snapshot(value) => Some(value),
            _ => None,
        }
    }
}

impl ObservedState {
    /// Short label for log fields and report lines.
    pub fn label(&self) -> &'static str {
        match self {
            ObservedState::Snapshot(_) => "snapshot",
            ObservedState::Missing => "missing",
            ObservedState::NoData { .. } => "no-data",
            ObservedState::Rejected { .. } => "rejected",
            ObservedState::Unreachable { .. } => "unreachable",
        }
    }
}
