//! JSON Lines record input and submission reports
//!
//! Input files hold one flat JSON object per line; blank lines are skipped.
//! Each submitted job can be appended to a report file, also as JSON Lines.

use crate::record::StagedRecord;
use crate::submitter::SubmitReport;
use loadbridge_common::{LoadbridgeError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Load every record from a JSON Lines file
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<StagedRecord>> {
    let path = path.as_ref();
    let records = read_records(File::open(path)?)?;
    debug!(path = %path.display(), records = records.len(), "Loaded records");
    Ok(records)
}

/// Read records from any JSON Lines source
pub fn read_records<R: Read>(reader: R) -> Result<Vec<StagedRecord>> {
    let mut records = Vec::new();
    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str::<StagedRecord>(&line)
            .map_err(|e| LoadbridgeError::parse(index + 1, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

/// Append one report line to `path`, creating the file if needed
pub fn append_report(path: impl AsRef<Path>, report: &SubmitReport) -> Result<()> {
    serde_jsonlines::append_json_lines(path, [report])?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    #[test]
    fn test_read_records_skips_blank_lines() {
        let input = "{\"Name\":\"4471\",\"LINEHAUL_RATE__c\":2150.5}\n\n{\"Name\":\"4472\"}\n";
        let records = read_records(input.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("LINEHAUL_RATE__c"), Some(&FieldValue::Float(2150.5)));
        assert_eq!(records[1].get("Name"), Some(&FieldValue::from("4472")));
    }

    #[test]
    fn test_read_records_reports_line_number() {
        let input = "{\"Name\":\"4471\"}\n{\"stops\":{\"pickup\":\"Reno\"}}\n";
        let err = read_records(input.as_bytes()).unwrap_err();

        assert!(matches!(err, LoadbridgeError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_top_level_array_is_rejected() {
        let err = read_records("[1, 2]\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadbridgeError::Parse { line: 1, .. }));
    }
}
