//! Loadbridge Bulk Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Stages freight records in memory and submits them to a remote record
//! store as a single bulk insert job.
//!
//! - [`RecordStager`] buffers [`StagedRecord`]s while rows are transformed
//! - [`BatchSubmitter`] encodes a drained batch, opens a job, posts the
//!   batch, waits for completion, and always closes the job
//! - [`BulkClient`] is the remote service contract;
//!   [`salesforce::SalesforceBulkClient`] implements it over the Bulk API
//!
//! # Example
//!
//! ```no_run
//! use loadbridge_bulk::salesforce::SalesforceBulkClient;
//! use loadbridge_bulk::{RecordStager, StagedRecord, SubmitOutcome};
//! use loadbridge_common::config::BulkConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SalesforceBulkClient::new(&BulkConfig::from_env()?)?;
//!
//!     let mut stager = RecordStager::new();
//!     stager.stage(
//!         StagedRecord::new()
//!             .with("Load_Number__c", "4471")
//!             .with("LINEHAUL_RATE__c", 2150.0)
//!             .with("EQUIPMENT_TYPE__c", "DRY VAN"),
//!     );
//!
//!     if let SubmitOutcome::Completed(report) = stager.submit("Load__c", &client).await? {
//!         tracing::info!(job_id = %report.job_id, records = report.records, "Loads inserted");
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod loader;
pub mod payload;
pub mod record;
pub mod salesforce;
pub mod stager;
pub mod submitter;

pub use client::{BatchHandle, BatchState, BatchStatus, BulkClient, BulkClientError, JobState, RemoteJob};
pub use payload::{ContentType, Payload, PayloadError};
pub use record::{FieldValue, StagedRecord};
pub use stager::RecordStager;
pub use submitter::{BatchSubmitter, SubmitError, SubmitOutcome, SubmitReport};
