//! Batch payload encoding
//!
//! Turns a batch of [`StagedRecord`]s into the bytes posted to the remote
//! job. The column set is the union of every record's keys in first-seen
//! order, so encoding the same batch twice yields identical bytes.

use crate::record::StagedRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Transfer encoding of a batch payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Csv,
    Json,
}

impl ContentType {
    /// Tag used by the remote job API
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Csv => "CSV",
            ContentType::Json => "JSON",
        }
    }

    /// HTTP media type of the batch body
    pub fn mime_type(self) -> &'static str {
        match self {
            ContentType::Csv => "text/csv; charset=UTF-8",
            ContentType::Json => "application/json",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ContentType::Csv),
            "json" => Ok(ContentType::Json),
            other => Err(format!("unsupported content type '{}', expected csv or json", other)),
        }
    }
}

/// Errors raised while encoding a batch
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to flush payload buffer: {0}")]
    Flush(String),
}

/// Encoded batch, ready to post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    content_type: ContentType,
    columns: Vec<String>,
    rows: usize,
    bytes: Vec<u8>,
}

impl Payload {
    fn empty(content_type: ContentType) -> Self {
        Self {
            content_type,
            columns: Vec::new(),
            rows: 0,
            bytes: Vec::new(),
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Column names in header order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of data rows (records), excluding any header
    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when there is nothing worth posting
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode `records` in the given content type.
///
/// Records without fields still count as rows, but a batch whose records
/// carry no fields at all encodes to an empty payload.
pub fn encode(records: &[StagedRecord], content_type: ContentType) -> Result<Payload, PayloadError> {
    let columns = union_columns(records);
    if columns.is_empty() {
        return Ok(Payload::empty(content_type));
    }

    let bytes = match content_type {
        ContentType::Csv => encode_csv(records, &columns)?,
        ContentType::Json => serde_json::to_vec(records)?,
    };

    Ok(Payload {
        content_type,
        columns,
        rows: records.len(),
        bytes,
    })
}

/// Union of all record keys, in first-seen order
pub fn union_columns(records: &[StagedRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for key in records.iter().flat_map(StagedRecord::keys) {
        if seen.insert(key) {
            columns.push(key.to_string());
        }
    }
    columns
}

fn encode_csv(records: &[StagedRecord], columns: &[String]) -> Result<Vec<u8>, PayloadError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|column| {
            record
                .get(column)
                .map(|value| value.to_csv_field())
                .unwrap_or_default()
        }))?;
    }

    writer
        .into_inner()
        .map_err(|e| PayloadError::Flush(e.to_string()))
}
