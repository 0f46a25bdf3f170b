use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::models::{ReportError, RunReport};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Encode(#[from] ReportError),

    #[error("could not reach collector at {endpoint}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("collector rejected the report ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Producer side of the transport: sends one serialized report to a collector.
#[derive(Debug, Clone)]
pub struct Submitter {
    client: reqwest::Client,
    endpoint: String,
}

impl Submitter {
    /// `collector_url` is the collector's base URL, e.g. `http://127.0.0.1:3030`.
    pub fn new(collector_url: &str) -> Result<Self, SubmitError> {
        let endpoint = format!("{}/submit", collector_url.trim_end_matches('/'));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| SubmitError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn submit(&self, report: &RunReport) -> Result<(), SubmitError> {
        let body = report.to_json()?;
        tracing::debug!(endpoint = %self.endpoint, bytes = body.len(), "submitting report");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| self.transport(source))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(SubmitError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    fn transport(&self, source: reqwest::Error) -> SubmitError {
        SubmitError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        }
    }
}
