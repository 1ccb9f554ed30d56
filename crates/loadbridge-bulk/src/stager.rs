//! In-memory record staging

use crate::client::BulkClient;
use crate::record::StagedRecord;
use crate::submitter::{BatchSubmitter, SubmitError, SubmitOutcome};

/// Buffers records between transformation and submission.
///
/// The stager holds no client and does no locking. `submit` borrows it
/// mutably, so nothing can be staged while a submission is in flight.
#[derive(Debug, Default)]
pub struct RecordStager {
    records: Vec<StagedRecord>,
}

impl RecordStager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Never fails.
    pub fn stage(&mut self, record: StagedRecord) {
        self.records.push(record);
    }

    /// Take every staged record, leaving the stager empty
    pub fn drain(&mut self) -> Vec<StagedRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Pending records, in staging order
    pub fn records(&self) -> &[StagedRecord] {
        &self.records
    }

    /// Drain and submit with a default (CSV) submitter
    pub async fn submit<C>(&mut self, object: &str, client: &C) -> Result<SubmitOutcome, SubmitError>
    where
        C: BulkClient + ?Sized,
    {
        self.submit_with(&BatchSubmitter::default(), object, client).await
    }

    /// Drain and submit through `submitter`.
    ///
    /// The stager is empty afterwards whatever the outcome.
    pub async fn submit_with<C>(
        &mut self,
        submitter: &BatchSubmitter,
        object: &str,
        client: &C,
    ) -> Result<SubmitOutcome, SubmitError>
    where
        C: BulkClient + ?Sized,
    {
        let batch = self.drain();
        submitter.submit(object, batch, client).await
    }
}

impl Extend<StagedRecord> for RecordStager {
    fn extend<I: IntoIterator<Item = StagedRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    #[test]
    fn test_drain_resets_state() {
        let mut stager = RecordStager::new();
        stager.stage(StagedRecord::new().with("Name", "L-1"));
        stager.stage(StagedRecord::new().with("Name", "L-2"));
        assert_eq!(stager.len(), 2);

        let drained = stager.drain();

        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].get("Name"), Some(&FieldValue::from("L-1")));
        assert!(stager.is_empty());
        assert!(stager.drain().is_empty());
    }

    #[test]
    fn test_extend_keeps_order() {
        let mut stager = RecordStager::new();
        stager.stage(StagedRecord::new().with("n", 1));
        stager.extend((2..=3_i64).map(|n| StagedRecord::new().with("n", n)));

        let order: Vec<_> = stager.records().iter().map(|r| r.get("n").cloned()).collect();
        assert_eq!(
            order,
            vec![
                Some(FieldValue::Integer(1)),
                Some(FieldValue::Integer(2)),
                Some(FieldValue::Integer(3)),
            ]
        );
    }
}
