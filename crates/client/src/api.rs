// crates/client/src/api.rs
//! Round trips to the job server.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use stepwatch_jobs::{StartProcessResponse, StatusSnapshot};

use crate::error::ClientError;

/// The two calls a polling client makes.
#[async_trait]
pub trait ProgressApi: Send + Sync {
    /// Start a job run.
    async fn start(&self) -> Result<StartProcessResponse, ClientError>;

    /// Read the current run's snapshot.
    async fn status(&self) -> Result<StatusSnapshot, ClientError>;
}

/// [`ProgressApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProgressApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProgressApi {
    /// `base_url` is the server root, e.g. `http://localhost:8444`.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::transport(base_url.clone(), e))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(
        url: String,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::transport(url.clone(), e))?;

        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| ClientError::Decode { url, source })
    }
}

#[async_trait]
impl ProgressApi for HttpProgressApi {
    async fn start(&self) -> Result<StartProcessResponse, ClientError> {
        let url = self.url("start-process");
        tracing::debug!(%url, "Starting process");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| ClientError::transport(url.clone(), e))?;
        Self::decode(url, response).await
    }

    async fn status(&self) -> Result<StatusSnapshot, ClientError> {
        let url = self.url("status");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::transport(url.clone(), e))?;
        Self::decode(url, response).await
    }
}
