use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::api_types::{ArchivePayload, EventsPayload, LatestPayload, LeaderboardPayload};

/// Loader failures, kept apart so callers can message transport problems
/// and payload problems differently. None of these escape a view boundary
/// as a panic; the orchestrator turns them into status fragments.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("http status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid payload from {url}: {detail}")]
    Decode { url: String, detail: String },
}

/// Fetches registry JSON with client-side caching disabled. Freshness
/// beyond the no-cache header comes from the resolver's cache-busting
/// query parameter.
pub struct Loader {
    client: Client,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Fetch one JSON document. Non-success statuses and undecodable
    /// bodies reject with a typed error carrying the request URL.
    pub async fn load(&self, url: &str) -> Result<Value, FetchError> {
        let start = std::time::Instant::now();
        debug!("Fetching registry - url={}", url);

        let resp = self
            .client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let value: Value = resp.json().await.map_err(|e| FetchError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        info!(
            "Registry fetch completed - url={}, duration={:.2}s",
            url,
            start.elapsed().as_secs_f32()
        );
        Ok(value)
    }

    pub async fn load_events(&self, url: &str) -> Result<EventsPayload, FetchError> {
        let value = self.load(url).await?;
        decode(url, value, "events")
    }

    pub async fn load_archive(&self, url: &str) -> Result<ArchivePayload, FetchError> {
        let value = self.load(url).await?;
        decode(url, value, "items")
    }

    pub async fn load_latest(&self, url: &str) -> Result<LatestPayload, FetchError> {
        let value = self.load(url).await?;
        decode(url, value, "items")
    }

    pub async fn load_leaderboard(&self, url: &str) -> Result<LeaderboardPayload, FetchError> {
        let value = self.load(url).await?;
        decode(url, value, "risks")
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape check then typed decode. A document missing its expected array is
/// a decode failure even though the transport succeeded; logged distinctly
/// so registry corruption is diagnosable apart from outages.
fn decode<T: serde::de::DeserializeOwned>(
    url: &str,
    value: Value,
    array_field: &str,
) -> Result<T, FetchError> {
    if !value.get(array_field).map(Value::is_array).unwrap_or(false) {
        error!(
            "Registry shape mismatch - url={}, missing '{}' array",
            url, array_field
        );
        return Err(FetchError::Decode {
            url: url.to_string(),
            detail: format!("missing '{array_field}' array"),
        });
    }
    serde_json::from_value(value).map_err(|e| {
        error!("Registry decode failed - url={}, error={}", url, e);
        FetchError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        }
    })
}
