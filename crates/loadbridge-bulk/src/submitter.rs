//! Batch submission
//!
//! [`BatchSubmitter::submit`] sends one drained batch as one remote insert
//! job. Once a job has been created it is closed on every exit path, after
//! which the captured outcome is returned. Nothing is retried.

use crate::client::{BatchHandle, BatchState, BatchStatus, BulkClient, BulkClientError, JobState, RemoteJob};
use crate::payload::{self, ContentType, Payload, PayloadError};
use crate::record::StagedRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Successful result of a submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing to send; no remote call was made
    NoOp,
    /// The job completed and was closed
    Completed(SubmitReport),
}

impl SubmitOutcome {
    /// Number of records sent (zero for a no-op)
    pub fn records(&self) -> usize {
        match self {
            SubmitOutcome::NoOp => 0,
            SubmitOutcome::Completed(report) => report.records,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, SubmitOutcome::NoOp)
    }
}

/// Summary of a completed job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitReport {
    pub object: String,
    pub job_id: String,
    pub batch_id: String,
    /// Records in the submitted batch
    pub records: usize,
    /// Records the service reports as processed
    pub records_processed: u64,
    /// Records the service rejected inside an otherwise completed batch
    pub records_failed: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl SubmitReport {
    pub fn duration_secs(&self) -> f64 {
        (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Submission failures
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The service refused to open a job. There is nothing to release.
    #[error("failed to open insert job for '{object}': {source}")]
    JobCreationFailed {
        object: String,
        source: BulkClientError,
    },

    /// The batch was rejected. The job was closed before this was returned.
    #[error("failed to post batch to job {job_id}: {source}")]
    PostFailed {
        job_id: String,
        source: BulkClientError,
    },

    /// The batch was accepted but did not complete. The job was closed.
    ///
    /// Whether the service kept any of the records is unknown; re-submitting
    /// the same batch may insert duplicates.
    #[error("job {job_id} did not complete: {source}")]
    WaitFailed {
        job_id: String,
        source: BulkClientError,
    },

    /// The client lacks a capability the submission needs
    #[error("bulk client does not support {operation}")]
    UnsupportedOperation {
        operation: &'static str,
        job_id: Option<String>,
        source: BulkClientError,
    },

    /// The batch could not be encoded; no remote call was made
    #[error("failed to encode batch: {0}")]
    Serialization(#[from] PayloadError),
}

impl SubmitError {
    /// Id of the job opened before the failure, if any
    pub fn job_id(&self) -> Option<&str> {
        match self {
            SubmitError::PostFailed { job_id, .. } | SubmitError::WaitFailed { job_id, .. } => Some(job_id),
            SubmitError::UnsupportedOperation { job_id, .. } => job_id.as_deref(),
            SubmitError::JobCreationFailed { .. } | SubmitError::Serialization(_) => None,
        }
    }

    fn from_step(step: Step, job: &RemoteJob, source: BulkClientError) -> Self {
        let job_id = job.id().to_string();
        if source.is_unsupported() {
            return SubmitError::UnsupportedOperation {
                operation: step.operation(),
                job_id: Some(job_id),
                source,
            };
        }
        match step {
            Step::Post => SubmitError::PostFailed { job_id, source },
            Step::Wait => SubmitError::WaitFailed { job_id, source },
        }
    }
}

/// Client calls made after a job exists
#[derive(Debug, Clone, Copy)]
enum Step {
    Post,
    Wait,
}

impl Step {
    fn operation(self) -> &'static str {
        match self {
            Step::Post => "post_batch",
            Step::Wait => "wait_for_completion",
        }
    }
}

/// Drives one batch through the remote job lifecycle
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSubmitter {
    content_type: ContentType,
}

impl BatchSubmitter {
    pub fn new(content_type: ContentType) -> Self {
        Self { content_type }
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Submit `batch` to `object` through `client`.
    ///
    /// An empty batch, or one whose records have no fields, returns
    /// [`SubmitOutcome::NoOp`] without contacting the client.
    #[instrument(skip(self, batch, client), fields(records = batch.len(), content_type = %self.content_type))]
    pub async fn submit<C>(
        &self,
        object: &str,
        batch: Vec<StagedRecord>,
        client: &C,
    ) -> Result<SubmitOutcome, SubmitError>
    where
        C: BulkClient + ?Sized,
    {
        if batch.is_empty() {
            info!("No records staged; nothing to submit");
            return Ok(SubmitOutcome::NoOp);
        }

        let payload = payload::encode(&batch, self.content_type)?;
        if payload.is_empty() {
            info!("Staged records carry no fields; nothing to submit");
            return Ok(SubmitOutcome::NoOp);
        }

        let started_at = Utc::now();
        let job = client
            .create_insert_job(object, self.content_type)
            .await
            .map_err(|source| {
                if source.is_unsupported() {
                    SubmitError::UnsupportedOperation {
                        operation: "create_insert_job",
                        job_id: None,
                        source,
                    }
                } else {
                    SubmitError::JobCreationFailed {
                        object: object.to_string(),
                        source,
                    }
                }
            })?;
        let job_id = job.id().to_string();
        info!(job_id = %job_id, object, "Bulk insert job created");

        let mut state = JobState::Created;
        let result = run_job(client, &job, &payload, &mut state).await;

        match client.close_job(job).await {
            Ok(()) => debug!(job_id = %job_id, state = %state, "Bulk job closed"),
            Err(err) => warn!(job_id = %job_id, state = %state, error = %err, "Failed to close bulk job"),
        }
        drop(payload);

        let (batch_handle, status) = result?;
        if status.records_failed > 0 {
            warn!(
                job_id = %job_id,
                batch_id = %batch_handle.id,
                records_failed = status.records_failed,
                "Batch completed with rejected records"
            );
        }

        let report = SubmitReport {
            object: object.to_string(),
            job_id,
            batch_id: batch_handle.id,
            records: batch.len(),
            records_processed: status.records_processed,
            records_failed: status.records_failed,
            started_at,
            completed_at: Utc::now(),
        };
        info!(
            job_id = %report.job_id,
            records = report.records,
            duration_secs = report.duration_secs(),
            "Bulk operation completed"
        );

        Ok(SubmitOutcome::Completed(report))
    }
}

/// Post and wait, tracking the job state. Never closes the job.
async fn run_job<C>(
    client: &C,
    job: &RemoteJob,
    payload: &Payload,
    state: &mut JobState,
) -> Result<(BatchHandle, BatchStatus), SubmitError>
where
    C: BulkClient + ?Sized,
{
    let batch = match client.post_batch(job, payload).await {
        Ok(batch) => batch,
        Err(source) => {
            *state = JobState::Failed;
            return Err(SubmitError::from_step(Step::Post, job, source));
        },
    };
    *state = JobState::BatchPosted;
    debug!(job_id = %job.id(), batch_id = %batch.id, rows = payload.row_count(), "Batch posted");

    let status = match client.wait_for_completion(job, &batch).await {
        Ok(status) if status.state == BatchState::Completed => status,
        Ok(status) => {
            *state = JobState::Failed;
            let message = status
                .message
                .unwrap_or_else(|| format!("batch finished in state {}", status.state));
            return Err(SubmitError::from_step(
                Step::Wait,
                job,
                BulkClientError::BatchFailed {
                    batch_id: status.batch_id,
                    message,
                },
            ));
        },
        Err(source) => {
            *state = JobState::Failed;
            return Err(SubmitError::from_step(Step::Wait, job, source));
        },
    };
    *state = JobState::Completed;

    Ok((batch, status))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_error_is_distinct() {
        let job = RemoteJob::new("750A", "Load__c", ContentType::Csv);
        let err = SubmitError::from_step(
            Step::Wait,
            &job,
            BulkClientError::unsupported("wait_for_completion"),
        );

        assert!(matches!(err, SubmitError::UnsupportedOperation { operation: "wait_for_completion", .. }));
        assert_eq!(err.job_id(), Some("750A"));
    }

    #[test]
    fn test_post_and_wait_failures_keep_job_id() {
        let job = RemoteJob::new("750B", "Load__c", ContentType::Csv);
        let post = SubmitError::from_step(
            Step::Post,
            &job,
            BulkClientError::InvalidResponse("truncated".into()),
        );
        let wait = SubmitError::from_step(
            Step::Wait,
            &job,
            BulkClientError::BatchFailed {
                batch_id: "751B".into(),
                message: "InvalidBatch".into(),
            },
        );

        assert!(matches!(post, SubmitError::PostFailed { .. }));
        assert!(matches!(wait, SubmitError::WaitFailed { .. }));
        assert_eq!(wait.job_id(), Some("750B"));
    }

    #[test]
    fn test_outcome_record_count() {
        assert_eq!(SubmitOutcome::NoOp.records(), 0);
        assert!(SubmitOutcome::NoOp.is_noop());
    }
}
