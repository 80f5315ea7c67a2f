//! HTTP-backed state readers
//!
//! Two readers cover the suite's HTTP boundary: a plain availability
//! probe for the console, and a Prometheus-style query reader for the
//! metrics store.
//!
//! The query reader owns the only protocol-specific classification in
//! the crate: an empty result set becomes [`Observation::no_data`] and a
//! `bad_data` rejection becomes [`Observation::rejected`]. Predicates
//! never look at response wording; they judge the classified state.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::trace;

use crate::Result;
use crate::error::Error;
use crate::observe::Observation;
use crate::reader::StateReader;

/// Probes one URL and observes the response status.
///
/// Any response at all, even a 503, is a snapshot; the predicate decides
/// which status counts as ready. Only transport failures (refused,
/// timeout, TLS) surface as errors.
pub struct HttpProbe {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpProbe {
    /// Probe for `url`, optionally sending a bearer token.
    pub fn new(http: reqwest::Client, url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http,
            url: url.into(),
            token,
        }
    }
}

#[async_trait]
impl StateReader for HttpProbe {
    fn target(&self) -> String {
        format!("console {}", self.url)
    }

    async fn read(&self) -> Result<Observation> {
        let mut request = self.http.get(&self.url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        trace!(url = %self.url, status, "Console probe answered");
        Ok(Observation::snapshot(
            self.target(),
            json!({ "url": self.url, "status": status }),
        ))
    }
}

/// Runs one instant query against a Prometheus-compatible endpoint and
/// classifies the result.
pub struct MetricQuery {
    http: reqwest::Client,
    endpoint: String,
    query: String,
    token: Option<String>,
}

impl MetricQuery {
    /// Query reader against `endpoint` (the full query URL, without the
    /// `query` parameter).
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        query: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            query: query.into(),
            token,
        }
    }
}

#[async_trait]
impl StateReader for MetricQuery {
    fn target(&self) -> String {
        format!("metrics query {}", self.query)
    }

    async fn read(&self) -> Result<Observation> {
        let mut request = self
            .http
            .get(&self.endpoint)
            .query(&[("query", self.query.as_str())]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 422 {
            // The query itself is malformed; no amount of waiting fixes it.
            let detail = response.text().await.unwrap_or_default();
            return Ok(Observation::rejected(
                self.target(),
                format!("{status}: {detail}"),
            ));
        }
        let response = response.error_for_status()?;
        let body: Value = response.json().await?;
        classify_query_body(self.target(), &self.query, &body)
    }
}

/// Classify a Prometheus-style query response body.
///
/// `{"status":"success","data":{"result":[]}}` means the store answered
/// and found nothing: that is the "no matching series" case, and it is
/// an observation, not an error. A store-side execution error is the
/// opposite: the store did NOT answer the question, so it must stay an
/// error and keep the poll pending. Only a `bad_data` rejection is
/// terminal.
fn classify_query_body(target: String, query: &str, body: &Value) -> Result<Observation> {
    if body["status"].as_str() == Some("error") {
        let detail = format!(
            "{}: {}",
            body["errorType"].as_str().unwrap_or("error"),
            body["error"].as_str().unwrap_or("unknown query error"),
        );
        if body["errorType"].as_str() == Some("bad_data") {
            return Ok(Observation::rejected(target, detail));
        }
        return Err(Error::endpoint(detail));
    }

    match body["data"]["result"].as_array() {
        Some(result) if result.is_empty() => {
            Ok(Observation::no_data(target, "no matching series for query"))
        }
        Some(result) => Ok(Observation::snapshot(
            target,
            json!({
                "query": query,
                "series": result.len(),
                "sample": result[0],
            }),
        )),
        // Anything that is not a well-formed query response must stay an
        // error; only an explicit empty result may satisfy absence.
        None => Err(Error::endpoint(format!(
            "unexpected query response shape: {body}"
        ))),
    }
}
