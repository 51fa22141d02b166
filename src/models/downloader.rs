use super::types::{DownloadRequest, FetchModelResponse, LoadedModel, MessageResponse, ModelId};
use crate::client::{ApiClient, ClientError};
use reqwest::StatusCode;
use std::fmt;
use tracing::{error, info};

/// Result of a mutating model command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Created,
    Deleted,
    ClientError(u16),
    TransportError(String),
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Created | ActionOutcome::Deleted)
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Created => f.write_str("model fetched"),
            ActionOutcome::Deleted => f.write_str("model deleted"),
            ActionOutcome::ClientError(status) => write!(f, "rejected with status {status}"),
            ActionOutcome::TransportError(e) => write!(f, "request failed: {e}"),
        }
    }
}

impl From<ClientError> for ActionOutcome {
    fn from(err: ClientError) -> Self {
        match err.status() {
            Some(status) => ActionOutcome::ClientError(status),
            None => ActionOutcome::TransportError(err.to_string()),
        }
    }
}

/// Issues download, set-active and delete commands. One exchange each,
/// never retried.
pub struct ModelDownloader {
    client: ApiClient,
}

impl ModelDownloader {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn download_model(&self, request: &DownloadRequest) -> ActionOutcome {
        let outcome = match self.client.post_model(request).await {
            Ok(resp) if resp.status() == StatusCode::CREATED => {
                if let Ok(body) = resp.json::<FetchModelResponse>().await {
                    info!("{} ({})", body.message, body.model_id);
                }
                ActionOutcome::Created
            }
            Ok(resp) => ActionOutcome::ClientError(resp.status().as_u16()),
            Err(e) => e.into(),
        };

        if !outcome.is_success() {
            error!(
                "Failed to download model {} v{}: {}",
                request.model_name, request.model_version, outcome
            );
        }
        outcome
    }

    /// Re-posts an already loaded version with `set_default` forced on.
    pub async fn set_active(&self, model: &LoadedModel) -> ActionOutcome {
        let request = DownloadRequest {
            model_name: model.name.clone(),
            model_version: model.version,
            set_default: true,
        };
        self.download_model(&request).await
    }

    pub async fn delete_model(&self, model_id: &ModelId) -> ActionOutcome {
        let outcome = match self.client.delete_model(model_id).await {
            Ok(resp) if resp.status() == StatusCode::OK => {
                if let Ok(body) = resp.json::<MessageResponse>().await {
                    info!("{}", body.message);
                }
                ActionOutcome::Deleted
            }
            Ok(resp) => ActionOutcome::ClientError(resp.status().as_u16()),
            Err(e) => e.into(),
        };

        if !outcome.is_success() {
            error!("Delete failed for {}: {}", model_id, outcome);
        }
        outcome
    }
}
