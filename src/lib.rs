//! Vigil - eventual-consistency verification harness for the multicluster
//! observability stack
//!
//! Vigil drives an operator-managed cluster through an install, exercise,
//! and teardown narrative, verifying after every mutation that the cluster
//! converges to the expected state within a bounded polling budget.
//!
//! # Architecture
//!
//! Every check is the same shape:
//! - A [`reader::StateReader`] observes one piece of cluster state
//! - A [`predicate::Predicate`] judges the observation as satisfied,
//!   pending, or failed
//! - [`poll::converge`] repeats the read/judge cycle on an interval until
//!   the verdict is terminal or the deadline passes
//!
//! Scenarios sequence mutations and verifications and stop at the first
//! failure, because later steps assume the state earlier steps produced.
//!
//! # Modules
//!
//! - [`observe`] - Observations and the states a reader can report
//! - [`predicate`] - Verdicts and the predicate shapes scenarios use
//! - [`poll`] - Poll specs, outcomes, and the convergence loop
//! - [`reader`] - State readers over the Kubernetes API and HTTP endpoints
//! - [`mutate`] - Cluster mutations (apply, patch, copy, delete)
//! - [`scenario`] - The fail-fast step driver
//! - [`report`] - Step, scenario, and suite reporting
//! - [`cluster`] - Cluster connection handles
//! - [`config`] - Suite options and polling cadences
//! - [`suite`] - The scenario catalog and runner
//! - [`error`] - Error types for the harness

#![deny(missing_docs)]

pub mod cluster;
pub mod config;
pub mod error;
pub mod mutate;
pub mod observe;
pub mod poll;
pub mod predicate;
pub mod reader;
pub mod report;
pub mod scenario;
pub mod suite;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager name for server-side apply patches
///
/// Everything the harness applies is owned by this manager, so a forced
/// apply can take fields back after a manual kubectl edit.
pub const FIELD_MANAGER: &str = "vigil";
