//! HTTP collaborators: the submit-scan and fetch-graph endpoints.
//!
//! Responses are decoded into typed values here; nothing upstream ever
//! probes loosely-shaped JSON.

use crate::error::{Result, ScanError};
use netmap_core::model::GraphWire;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Outcome of a scan submission. The server answers 200 when a finished
/// result already exists for the domain and 202 when it just scheduled a
/// new scan; both carry the session id to fetch with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ready { session_id: String },
    Accepted { session_id: String },
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    domain: &'a str,
    depth: u8,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(deserialize_with = "session_id_as_string")]
    session_id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// The server serializes session ids as integers; older deployments used
/// strings. Accept either.
fn session_id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Num(n) => n.to_string(),
        Raw::Str(s) => s,
    })
}

pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self> {
        Self::with_timeout(base, 10)
    }

    pub fn with_timeout(base: &str, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("netmap/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(4)
            .build()?;
        Ok(Self {
            http,
            base: Url::parse(base)?,
        })
    }

    /// POST /api/domains/scan/ with `{domain, depth}`. 200 means a result
    /// for this domain already exists, 202 means the job was scheduled;
    /// anything else is surfaced with the server's error message.
    pub async fn submit_scan(&self, domain: &str, depth: u8) -> Result<SubmitOutcome> {
        let url = self.base.join("/api/domains/scan/")?;
        debug!("submitting scan for {} (depth {})", domain, depth);
        let response = self
            .http
            .post(url)
            .json(&SubmitRequest { domain, depth })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        match status {
            StatusCode::OK => {
                let parsed: SubmitResponse = serde_json::from_str(&body)?;
                Ok(SubmitOutcome::Ready {
                    session_id: parsed.session_id,
                })
            }
            StatusCode::ACCEPTED => {
                let parsed: SubmitResponse = serde_json::from_str(&body)?;
                Ok(SubmitOutcome::Accepted {
                    session_id: parsed.session_id,
                })
            }
            _ => {
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .map(|e| e.error)
                    .unwrap_or_else(|_| format!("unexpected status {status}"));
                Err(ScanError::Server(message))
            }
        }
    }

    /// GET /api/links/graph/?domain=..&session_id=.. A body that does not
    /// parse as a graph yet is "no data", not an error; only transport
    /// failures and error statuses bubble up.
    pub async fn fetch_graph(&self, domain: &str, session_id: &str) -> Result<GraphWire> {
        let mut url = self.base.join("/api/links/graph/")?;
        url.query_pairs_mut()
            .append_pair("domain", domain)
            .append_pair("session_id", session_id);
        debug!("fetching graph for {} (session {})", domain, session_id);
        let response = self.http.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            debug!("graph body not parseable yet: {}", e);
            GraphWire::default()
        }))
    }
}
