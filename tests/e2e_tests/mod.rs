//! End-to-end tests against a live cluster
//!
//! These tests tell the story of how the suite behaves against real
//! cluster state, from single readers up to the full narrative.
//!
//! # Test Organization
//!
//! - `checks`: Stories about individual readers, mutations, and the
//!   convergence loop against live API-server answers (any cluster)
//!
//! - `suite_flow`: Stories about driving whole scenarios and the full
//!   catalog (requires the observability operator on the hub)
//!
//! # Running These Tests
//!
//! These tests are ignored by default because they require a cluster:
//!
//! ```bash
//! # Reader and convergence stories (any reachable cluster)
//! cargo test --test e2e checks -- --ignored --nocapture
//!
//! # Full narrative (hub with the operator installed)
//! cargo test --test e2e suite_flow -- --ignored --nocapture
//! ```

mod checks;
mod helpers;
mod suite_flow;
