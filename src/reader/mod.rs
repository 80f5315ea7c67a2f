//! State readers: the observation boundary
//!
//! A [`StateReader`] owns one observable target and knows how to fetch
//! its current state. The resource reference (namespace, name, kind,
//! label selector, or query) is fixed at construction, the same way a
//! `kube::Api` binds its scope up front; `read` takes no arguments.
//!
//! Readers classify what they saw into an [`Observation`]
//! (see [`crate::observe::ObservedState`]). `Err` is reserved for
//! transport-level failures the reader cannot classify; the poll
//! scheduler records those as unreachable cycles and keeps polling.

pub mod http;
pub mod kube;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;
use crate::observe::Observation;

/// Fetches the current state of one observable target.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Human-readable identifier of the target, used in logs and reports.
    fn target(&self) -> String;

    /// Fetch and classify the target's current state.
    async fn read(&self) -> Result<Observation>;
}
