//! Error types for the verification harness

use thiserror::Error;

/// Main error type for harness operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// HTTP error from the console or metrics endpoint
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered, but with a transient protocol-level error
    #[error("endpoint error: {0}")]
    Endpoint(String),

    /// Suite options error
    #[error("configuration error: {0}")]
    Config(String),

    /// Scenario mutation error (mutations are never retried)
    #[error("mutation error: {0}")]
    Mutation(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a configuration error pointing at a specific options field
    pub fn config_field(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config(format!("{} (field: {})", msg.into(), field.into()))
    }

    /// Create a mutation error carrying the failed step's name
    pub fn mutation(step: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Mutation(format!("{}: {}", step.into(), msg.into()))
    }

    /// Create an endpoint error with the given message
    pub fn endpoint(msg: impl Into<String>) -> Self {
        Self::Endpoint(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
