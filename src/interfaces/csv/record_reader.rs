use crate::domain::record::{RecordOrigin, StatusRecord};
use crate::error::{Result, StatusError};
use crate::infrastructure::in_memory::InMemoryPaymentLookup;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use tracing::warn;

/// One row of a status fixture: `origin, reference, status, amount, currency`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct RecordRow {
    pub origin: RecordOrigin,
    pub reference: String,
    pub status: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
}

impl RecordRow {
    pub fn into_record(self) -> (String, StatusRecord) {
        let record = StatusRecord {
            origin: self.origin,
            status: self.status,
            amount: self.amount,
            currency: self.currency,
        };
        (self.reference, record)
    }
}

/// Reads status records from a CSV source.
///
/// A fixture is a snapshot of the backend tables: when several rows share an
/// origin and reference, the last one wins.
pub struct RecordReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RecordReader<R> {
    /// Creates a new `RecordReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes rows.
    pub fn rows(self) -> impl Iterator<Item = Result<RecordRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(StatusError::from))
    }

    /// Writes every readable row into `lookup`. Malformed rows are logged and
    /// skipped; returns the number of rows loaded.
    pub async fn load_into(self, lookup: &InMemoryPaymentLookup) -> usize {
        let mut loaded = 0;
        for row in self.rows() {
            match row {
                Ok(row) => {
                    let (reference, record) = row.into_record();
                    lookup.put(&reference, record).await;
                    loaded += 1;
                }
                Err(e) => warn!(error = %e, "skipping malformed status row"),
            }
        }
        loaded
    }
}
