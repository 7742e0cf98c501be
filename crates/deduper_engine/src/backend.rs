use std::time::Duration;

use deduper_core::{ConnectionStatus, UploadBatch};
use deduper_logging::{deduper_debug, deduper_warn};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::upload::{PhotoCollector, StoredBatch};
use crate::{BackendError, FailureKind};

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Raw `Cookie` header carrying the web app's session.
    pub session_cookie: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            session_cookie: None,
        }
    }
}

/// Parameters for the backend's duplicate analysis task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOptions {
    pub resolution: u32,
    pub similarity_threshold: f64,
    pub download_original: bool,
    pub chunk_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_store_path: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            resolution: 224,
            similarity_threshold: 0.9,
            download_original: false,
            chunk_size: 1000,
            image_store_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalysisStarted {
    task_id: String,
}

/// HTTP client for the deduper web app's extension endpoints.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| BackendError::new(FailureKind::InvalidUrl, err.to_string()))?;
        // Keep any path prefix when joining endpoint paths.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        if let Some(cookie) = &settings.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|err| BackendError::new(FailureKind::InvalidConfig, err.to_string()))?;
            headers.insert(COOKIE, value);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| BackendError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { base, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|err| BackendError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    /// Probes the session endpoint. Any answer other than success means the
    /// user is not logged in; no answer means the backend is unreachable.
    pub async fn connection_status(&self) -> ConnectionStatus {
        let url = match self.endpoint("auth/me") {
            Ok(url) => url,
            Err(err) => {
                deduper_warn!("Cannot build session url: {}", err);
                return ConnectionStatus::Unreachable;
            }
        };
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => ConnectionStatus::Connected,
            Ok(response) => {
                deduper_debug!("Session check answered {}", response.status());
                ConnectionStatus::NotLoggedIn
            }
            Err(err) => {
                deduper_warn!("Backend not reachable: {}", err);
                ConnectionStatus::Unreachable
            }
        }
    }

    /// Starts duplicate analysis over the uploaded photos and returns the task id.
    pub async fn start_analysis(&self, options: &AnalysisOptions) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.endpoint("api/extension/analyze")?)
            .json(options)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(response).await);
        }

        let started: AnalysisStarted = response.json().await.map_err(map_reqwest_error)?;
        Ok(started.task_id)
    }
}

#[async_trait::async_trait]
impl PhotoCollector for BackendClient {
    async fn store_batch(&self, batch: &UploadBatch<'_>) -> Result<StoredBatch, BackendError> {
        let response = self
            .client
            .post(self.endpoint("api/extension/photos")?)
            .json(batch)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        response.json().await.map_err(map_reqwest_error)
    }
}

/// Error for a non-success answer, preferring the body's `message` field,
/// then its `error` code, then the status line.
async fn rejection(response: Response) -> BackendError {
    let status = response.status();
    let body = response.json::<Value>().await.ok();
    let message = body
        .as_ref()
        .and_then(|body| ["message", "error"].iter().find_map(|key| body.get(*key)?.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string());
    BackendError::new(FailureKind::HttpStatus(status.as_u16()), message)
}

fn map_reqwest_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        return BackendError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return BackendError::new(FailureKind::Decode, err.to_string());
    }
    BackendError::new(FailureKind::Network, err.to_string())
}
