//! Sync bridge: optimistic local mutations are persisted to the server with
//! fire-and-forget saves. A failed save is logged and surfaced as an error
//! event; local state is deliberately never rolled back, and concurrent saves
//! are not coalesced (they are idempotent full-state overwrites).

use std::fmt;
use std::sync::mpsc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};

use crate::store::ProgressData;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:4000";
pub const INIT_RETRY_ATTEMPTS: u32 = 5;
pub const INIT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Payload of `GET /api/node/:id`; variants carry type-specific fields and
/// unknown types degrade to `Other` instead of failing the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeInteraction {
    Question {
        prompt: String,
        options: Vec<String>,
    },
    Event {
        description: String,
    },
    Reward {
        reputation: u32,
        skill_points: u32,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug)]
pub enum ApiError {
    Status(StatusCode),
    Http(hyper::http::Error),
    Transport(hyper_util::client::legacy::Error),
    Body(hyper::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Status(code) => write!(f, "server answered {code}"),
            ApiError::Http(e) => write!(f, "request build failed: {e}"),
            ApiError::Transport(e) => write!(f, "request failed: {e}"),
            ApiError::Body(e) => write!(f, "response body failed: {e}"),
            ApiError::Json(e) => write!(f, "bad json payload: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<hyper::http::Error> for ApiError {
    fn from(e: hyper::http::Error) -> Self {
        ApiError::Http(e)
    }
}

impl From<hyper_util::client::legacy::Error> for ApiError {
    fn from(e: hyper_util::client::legacy::Error) -> Self {
        ApiError::Transport(e)
    }
}

impl From<hyper::Error> for ApiError {
    fn from(e: hyper::Error) -> Self {
        ApiError::Body(e)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Json(e)
    }
}

/// Thin typed client over the consumed REST contract.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    pub fn from_env() -> Self {
        let base = std::env::var("MEDPHYS_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        Self::new(base)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(format!("{}{path}", self.base_url))
            .body(Full::new(Bytes::new()))?;

        let res = self.client.request(req).await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        let body = res.into_body().collect().await?.to_bytes();
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn load_progress(&self) -> Result<ProgressData, ApiError> {
        self.get_json("/api/skill-progress").await
    }

    pub async fn save_progress(&self, progress: &ProgressData) -> Result<(), ApiError> {
        let body = serde_json::to_vec(progress)?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("{}/api/skill-progress", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))?;

        let res = self.client.request(req).await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        Ok(())
    }

    pub async fn node_interaction(&self, id: &str) -> Result<NodeInteraction, ApiError> {
        self.get_json(&format!("/api/node/{id}")).await
    }
}

/// Outcome of the bounded initial load, polled by the widget once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(ProgressData),
    Failed(String),
}

pub struct SyncBridge {
    client: ApiClient,
    handle: tokio::runtime::Handle,
    load_rx: Option<mpsc::Receiver<LoadOutcome>>,
    failure_tx: mpsc::Sender<String>,
    failure_rx: mpsc::Receiver<String>,
}

impl SyncBridge {
    pub fn new(client: ApiClient, handle: tokio::runtime::Handle) -> Self {
        let (failure_tx, failure_rx) = mpsc::channel();
        Self {
            client,
            handle,
            load_rx: None,
            failure_tx,
            failure_rx,
        }
    }

    /// Starts the initial progress load: a bounded number of attempts with a
    /// fixed delay between them, ending in exactly one `LoadOutcome`.
    pub fn begin_load(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.load_rx = Some(rx);

        let client = self.client.clone();
        self.handle.spawn(async move {
            let mut last_err = String::new();
            for attempt in 1..=INIT_RETRY_ATTEMPTS {
                match client.load_progress().await {
                    Ok(progress) => {
                        let _ = tx.send(LoadOutcome::Loaded(progress));
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(
                            "progress load attempt {attempt}/{INIT_RETRY_ATTEMPTS} failed: {err}"
                        );
                        last_err = err.to_string();
                    }
                }
                if attempt < INIT_RETRY_ATTEMPTS {
                    tokio::time::sleep(INIT_RETRY_DELAY).await;
                }
            }
            let _ = tx.send(LoadOutcome::Failed(last_err));
        });
    }

    /// Non-blocking; `None` while the load is still in flight.
    pub fn poll_load(&mut self) -> Option<LoadOutcome> {
        let outcome = self.load_rx.as_ref()?.try_recv().ok()?;
        self.load_rx = None;
        Some(outcome)
    }

    /// Fire-and-forget save of the full progress snapshot. Failures are
    /// logged and queued for the widget's error event; the optimistic local
    /// state stands either way.
    pub fn save(&self, progress: ProgressData) {
        let client = self.client.clone();
        let failures = self.failure_tx.clone();
        self.handle.spawn(async move {
            if let Err(err) = client.save_progress(&progress).await {
                tracing::warn!("progress save failed: {err}");
                let _ = failures.send(err.to_string());
            }
        });
    }

    /// Drains save failures observed since the last poll.
    pub fn poll_save_failures(&self) -> Vec<String> {
        let mut failures = Vec::new();
        while let Ok(msg) = self.failure_rx.try_recv() {
            failures.push(msg);
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_interaction_unknown_type_degrades_to_other() {
        let json = r#"{"type":"bossFight","hp":300}"#;
        let payload: NodeInteraction = serde_json::from_str(json).unwrap();
        assert_eq!(payload, NodeInteraction::Other);
    }

    #[test]
    fn api_client_strips_trailing_slashes_from_base_url() {
        let client = ApiClient::new("http://127.0.0.1:4000///");
        assert_eq!(client.base_url(), "http://127.0.0.1:4000");
    }

    #[test]
    fn progress_wire_format_is_camel_case() {
        let progress = ProgressData {
            version: 1,
            reputation: 12,
            skill_points_available: 3,
            unlocked_skills: vec!["core".to_string()],
            active_skills: vec![],
        };
        let json = serde_json::to_string(&progress).unwrap();
        assert!(json.contains("\"skillPointsAvailable\":3"));
        assert!(json.contains("\"unlockedSkills\""));
    }
}
