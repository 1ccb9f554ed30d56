//! Salesforce Bulk API client
//!
//! [`SalesforceBulkClient`] implements [`BulkClient`] against the
//! asynchronous Bulk API endpoint (`/services/async/{version}/`):
//!
//! - create job: `POST job` with a `jobInfo` document
//! - post batch: `POST job/{jobId}/batch` with the CSV or JSON payload
//! - wait: poll `GET job/{jobId}/batch/{batchId}` until a terminal state
//! - close: `POST job/{jobId}` with `state=Closed`
//!
//! The client owns the session and is built once, then passed by reference
//! to every submission.

mod wire;

use crate::client::{BatchHandle, BatchState, BatchStatus, BulkClient, BulkClientError, RemoteJob};
use crate::payload::{ContentType, Payload};
use async_trait::async_trait;
use loadbridge_common::config::BulkConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

/// Header carrying the session id on every Bulk API request
pub const SESSION_HEADER: &str = "X-SFDC-Session";

/// Longest slice of an unrecognised error body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Bulk API client bound to one instance and session
pub struct SalesforceBulkClient {
    http: Client,
    base_url: String,
    session_id: String,
    poll_interval: Duration,
    wait_timeout: Option<Duration>,
}

impl SalesforceBulkClient {
    /// Build a client from validated configuration
    pub fn new(config: &BulkConfig) -> Result<Self, BulkClientError> {
        let http = Client::builder().timeout(config.http_timeout).build()?;

        Ok(Self {
            http,
            base_url: config.bulk_base_url(),
            session_id: config.session_id.clone(),
            poll_interval: config.poll_interval,
            wait_timeout: config.wait_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request with the session header and return the body of a 2xx
    /// response
    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<String, BulkClientError> {
        let response = request.header(SESSION_HEADER, &self.session_id).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        if let Some(fault) = wire::parse_fault(&body) {
            return Err(BulkClientError::Remote {
                status: status.as_u16(),
                code: fault.exception_code,
                message: fault.exception_message,
            });
        }

        if matches!(
            status,
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
        ) {
            return Err(BulkClientError::unsupported(format!(
                "{} (HTTP {})",
                operation,
                status.as_u16()
            )));
        }

        Err(BulkClientError::Remote {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("HTTP error").to_string(),
            message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }

    async fn batch_status(&self, job: &RemoteJob, batch_id: &str) -> Result<BatchStatus, BulkClientError> {
        let request = self
            .http
            .get(self.url(&format!("job/{}/batch/{}", job.id(), batch_id)));
        let body = self.send(request, "batch_status").await?;
        let info = wire::parse_batch_info(&body, job.content_type())?;

        let state = BatchState::from_remote(&info.state)
            .ok_or_else(|| BulkClientError::InvalidResponse(format!("unknown batch state '{}'", info.state)))?;

        Ok(BatchStatus {
            batch_id: info.id,
            state,
            records_processed: info.number_records_processed,
            records_failed: info.number_records_failed,
            message: info.state_message.filter(|m| !m.trim().is_empty()),
        })
    }
}

#[async_trait]
impl BulkClient for SalesforceBulkClient {
    #[instrument(skip(self))]
    async fn create_insert_job(
        &self,
        object: &str,
        content_type: ContentType,
    ) -> Result<RemoteJob, BulkClientError> {
        let request = self
            .http
            .post(self.url("job"))
            .header(CONTENT_TYPE, wire::XML_MIME_TYPE)
            .body(wire::create_job_request(object, content_type));

        let body = self.send(request, "create_insert_job").await?;
        let info = wire::parse_job_info(&body)?;
        debug!(job_id = %info.id, state = ?info.state, "Job opened");

        Ok(RemoteJob::new(info.id, object, content_type))
    }

    #[instrument(skip(self, job, payload), fields(job_id = %job.id(), bytes = payload.len()))]
    async fn post_batch(&self, job: &RemoteJob, payload: &Payload) -> Result<BatchHandle, BulkClientError> {
        let request = self
            .http
            .post(self.url(&format!("job/{}/batch", job.id())))
            .header(CONTENT_TYPE, job.content_type().mime_type())
            .body(payload.as_bytes().to_vec());

        let body = self.send(request, "post_batch").await?;
        let info = wire::parse_batch_info(&body, job.content_type())?;
        let state = BatchState::from_remote(&info.state).unwrap_or(BatchState::Queued);
        debug!(batch_id = %info.id, state = %state, "Batch accepted");

        Ok(BatchHandle { id: info.id, state })
    }

    #[instrument(skip(self, job, batch), fields(job_id = %job.id(), batch_id = %batch.id))]
    async fn wait_for_completion(
        &self,
        job: &RemoteJob,
        batch: &BatchHandle,
    ) -> Result<BatchStatus, BulkClientError> {
        let started = Instant::now();

        loop {
            let status = self.batch_status(job, &batch.id).await?;
            match status.state {
                BatchState::Completed => {
                    info!(
                        records_processed = status.records_processed,
                        records_failed = status.records_failed,
                        "Batch completed"
                    );
                    return Ok(status);
                },
                state if state.is_terminal() => {
                    return Err(BulkClientError::BatchFailed {
                        batch_id: status.batch_id,
                        message: status
                            .message
                            .unwrap_or_else(|| format!("batch ended in state {}", state)),
                    });
                },
                _ => {},
            }

            let waited = started.elapsed();
            if let Some(limit) = self.wait_timeout {
                if waited >= limit {
                    return Err(BulkClientError::Timeout {
                        batch_id: batch.id.clone(),
                        waited,
                    });
                }
            }

            debug!(state = %status.state, waited_secs = waited.as_secs(), "Batch still running");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    #[instrument(skip(self, job), fields(job_id = %job.id()))]
    async fn close_job(&self, job: RemoteJob) -> Result<(), BulkClientError> {
        let request = self
            .http
            .post(self.url(&format!("job/{}", job.id())))
            .header(CONTENT_TYPE, wire::XML_MIME_TYPE)
            .body(wire::close_job_request());

        let body = self.send(request, "close_job").await?;
        let info = wire::parse_job_info(&body)?;
        debug!(state = ?info.state, "Job close acknowledged");
        Ok(())
    }
}
