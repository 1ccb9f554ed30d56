//! Remote bulk service contract
//!
//! [`BulkClient`] is the seam between the submitter and whatever service
//! stores the records. The submitter drives it strictly in sequence:
//! `create_insert_job` → `post_batch` → `wait_for_completion` → `close_job`.

use crate::payload::{ContentType, Payload};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Lifecycle of a remote job as seen by one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    BatchPosted,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::BatchPosted => "batch_posted",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to an open bulk insert job.
///
/// Not `Clone`: the handle is owned by the submission that opened it and is
/// consumed by [`BulkClient::close_job`], so a job can be closed only once.
#[derive(Debug, PartialEq, Eq)]
pub struct RemoteJob {
    id: String,
    object: String,
    content_type: ContentType,
}

impl RemoteJob {
    pub fn new(id: impl Into<String>, object: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            id: id.into(),
            object: object.into(),
            content_type,
        }
    }

    /// Remote job id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Target object type, e.g. "Load__c"
    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}

/// Remote processing state of a posted batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Queued,
    InProgress,
    Completed,
    Failed,
    NotProcessed,
}

impl BatchState {
    /// Parse the remote state name ("Queued", "InProgress", "Not Processed", ...)
    pub fn from_remote(state: &str) -> Option<Self> {
        match state.trim() {
            "Queued" => Some(BatchState::Queued),
            "InProgress" => Some(BatchState::InProgress),
            "Completed" => Some(BatchState::Completed),
            "Failed" => Some(BatchState::Failed),
            "Not Processed" | "NotProcessed" => Some(BatchState::NotProcessed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchState::Queued => "Queued",
            BatchState::InProgress => "InProgress",
            BatchState::Completed => "Completed",
            BatchState::Failed => "Failed",
            BatchState::NotProcessed => "Not Processed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchState::Completed | BatchState::Failed | BatchState::NotProcessed
        )
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement of a posted batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchHandle {
    pub id: String,
    pub state: BatchState,
}

/// Final report for a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchStatus {
    pub batch_id: String,
    pub state: BatchState,
    pub records_processed: u64,
    pub records_failed: u64,
    pub message: Option<String>,
}

/// Errors reported by a [`BulkClient`]
#[derive(Error, Debug)]
pub enum BulkClientError {
    /// The client or the remote endpoint lacks this capability
    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the request
    #[error("remote error (HTTP {status}) {code}: {message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },

    /// The batch was accepted but the service failed to process it
    #[error("batch {batch_id} failed: {message}")]
    BatchFailed { batch_id: String, message: String },

    #[error("batch {batch_id} did not finish within {waited:?}")]
    Timeout { batch_id: String, waited: Duration },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BulkClientError {
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported(operation.into())
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, BulkClientError::Unsupported(_))
    }
}

/// Bulk insert capability of a remote record store
#[async_trait]
pub trait BulkClient: Send + Sync {
    /// Open an insert job against `object`
    async fn create_insert_job(
        &self,
        object: &str,
        content_type: ContentType,
    ) -> Result<RemoteJob, BulkClientError>;

    /// Post the whole payload as a single batch
    async fn post_batch(&self, job: &RemoteJob, payload: &Payload) -> Result<BatchHandle, BulkClientError>;

    /// Block until the batch reaches a terminal state.
    ///
    /// Clients that cannot observe batch progress keep this default, which
    /// reports the capability as unsupported.
    async fn wait_for_completion(
        &self,
        job: &RemoteJob,
        batch: &BatchHandle,
    ) -> Result<BatchStatus, BulkClientError> {
        let _ = (job, batch);
        Err(BulkClientError::unsupported("wait_for_completion"))
    }

    /// Release the job. Consumes the handle.
    async fn close_job(&self, job: RemoteJob) -> Result<(), BulkClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_state_from_remote() {
        assert_eq!(BatchState::from_remote("Not Processed"), Some(BatchState::NotProcessed));
        assert_eq!(BatchState::from_remote(" InProgress "), Some(BatchState::InProgress));
        assert_eq!(BatchState::from_remote("Paused"), None);
        assert!(BatchState::Failed.is_terminal());
        assert!(!BatchState::Queued.is_terminal());
    }

    #[test]
    fn test_job_state_display() {
        assert_eq!(JobState::BatchPosted.to_string(), "batch_posted");
        assert_eq!(JobState::Failed.to_string(), "failed");
    }
}
