use crate::busy::{Busy, BusyFlag};
use crate::client::{ApiClient, ClientError};
use crate::models::types::Sentiment;
use std::time::Duration;
use tracing::error;

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter some text before submitting.";
pub const FAILURE_MESSAGE: &str = "Failed to evaluate text. Check the API or network.";

/// What the console shows after one evaluation. Result and latency are only
/// present together, and never alongside an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InferenceView {
    pub result: Option<Sentiment>,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl InferenceView {
    fn failed(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn result_class(&self) -> Option<&'static str> {
        self.result.map(|s| s.css_class())
    }

    pub fn latency_text(&self) -> Option<String> {
        self.latency_ms.map(|ms| format!("Latency: {ms} ms"))
    }
}

pub struct InferenceConsole {
    client: ApiClient,
    busy: BusyFlag,
}

impl InferenceConsole {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            busy: BusyFlag::new(),
        }
    }

    /// `false` while an evaluation is in flight.
    pub fn is_ready(&self) -> bool {
        !self.busy.is_busy()
    }

    pub async fn evaluate(&self, text: &str) -> Result<InferenceView, Busy> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(InferenceView::failed(EMPTY_INPUT_MESSAGE));
        }

        let _guard = self.busy.try_acquire()?;
        match self.client.predict_timed(text).await {
            Ok((sentiment, elapsed)) => Ok(InferenceView {
                result: Some(sentiment),
                latency_ms: Some(round_millis(elapsed)),
                error: None,
            }),
            Err(e) => {
                error!("Inference error: {}", e);
                Ok(InferenceView::failed(FAILURE_MESSAGE))
            }
        }
    }

    /// Blank entries are skipped; the result pairs each sent text with its label.
    /// A reply with a different number of labels than texts sent is an error.
    pub async fn evaluate_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<(String, Sentiment)>, ClientError> {
        let batch: Vec<String> = texts
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let labels = self.client.batch_predict(&batch).await.map_err(|e| {
            error!("Batch inference error: {}", e);
            e
        })?;
        if labels.len() != batch.len() {
            let err = ClientError::BatchMismatch {
                sent: batch.len(),
                received: labels.len(),
            };
            error!("Batch inference error: {}", err);
            return Err(err);
        }
        Ok(batch.into_iter().zip(labels).collect())
    }
}

fn round_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}
