//! HTTP client for the OpinionLens REST API.

use crate::models::types::{
    DownloadRequest, LoadedModel, ModelId, PredictRequest, PredictResponse, RegistryEntry,
    Sentiment,
};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid API url {0:?}")]
    InvalidUrl(String),

    #[error("batch returned {received} labels for {sent} texts")]
    BatchMismatch { sent: usize, received: usize },
}

impl ClientError {
    /// Status code of a rejected request, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, None)
    }

    /// A `None` timeout leaves requests unbounded.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list_registry(&self) -> Result<Vec<RegistryEntry>, ClientError> {
        let resp = self.client.get(self.url("/api/v1/models/registry")).send().await?;
        json_body(resp).await
    }

    pub async fn list_loaded(&self) -> Result<Vec<LoadedModel>, ClientError> {
        let resp = self
            .client
            .get(self.url("/api/v1/models/"))
            .query(&[("brief", "true")])
            .send()
            .await?;
        json_body(resp).await
    }

    /// Full backend record for one loaded model.
    pub async fn model_details(&self, model_id: &ModelId) -> Result<serde_json::Value, ClientError> {
        let resp = self
            .client
            .get(self.url("/api/v1/models/"))
            .query(&[("model_id", model_id.as_str())])
            .send()
            .await?;
        json_body(resp).await
    }

    pub async fn about(&self) -> Result<serde_json::Value, ClientError> {
        let resp = self.client.get(self.url("/api/v1/about")).send().await?;
        json_body(resp).await
    }

    /// Raw download/activate exchange. Status interpretation is left to the caller.
    pub async fn post_model(&self, request: &DownloadRequest) -> Result<Response, ClientError> {
        debug!(
            "POST model {} v{} (set_default={})",
            request.model_name, request.model_version, request.set_default
        );
        Ok(self
            .client
            .post(self.url("/api/v1/models/"))
            .json(request)
            .send()
            .await?)
    }

    pub async fn delete_model(&self, model_id: &ModelId) -> Result<Response, ClientError> {
        debug!("DELETE model {}", model_id);
        Ok(self
            .client
            .delete(self.url("/api/v1/models/"))
            .query(&[("model_id", model_id.as_str())])
            .send()
            .await?)
    }

    pub async fn predict(&self, text: &str) -> Result<Sentiment, ClientError> {
        Ok(self.predict_timed(text).await?.0)
    }

    /// Like `predict`, also returning the time from sending the request to
    /// receiving the response head. Reading and decoding the body is not counted.
    pub async fn predict_timed(&self, text: &str) -> Result<(Sentiment, Duration), ClientError> {
        let started = Instant::now();
        let resp = self
            .client
            .post(self.url("/api/v1/inference/predict"))
            .json(&PredictRequest { text })
            .send()
            .await?;
        let elapsed = started.elapsed();
        let body: PredictResponse = json_body(resp).await?;
        Ok((body.prediction, elapsed))
    }

    pub async fn batch_predict(&self, texts: &[String]) -> Result<Vec<Sentiment>, ClientError> {
        let resp = self
            .client
            .post(self.url("/api/v1/inference/batch_predict"))
            .json(texts)
            .send()
            .await?;
        json_body(resp).await
    }
}

async fn json_body<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status != StatusCode::OK {
        let message = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.url("/api/v1/models/registry"),
            "http://localhost:8000/api/v1/models/registry"
        );
    }

    #[test]
    fn non_http_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("localhost:8000"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn api_error_exposes_status() {
        let err = ClientError::Api {
            status: 503,
            message: "down".into(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "API error (503): down");
    }

    #[test]
    fn batch_mismatch_names_both_counts() {
        let err = ClientError::BatchMismatch { sent: 3, received: 2 };
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "batch returned 2 labels for 3 texts");
    }
}
