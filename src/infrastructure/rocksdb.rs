use crate::domain::ports::PaymentLookup;
use crate::domain::record::{RecordOrigin, StatusRecord};
use crate::domain::reference::{OrderReference, PaymentReference};
use crate::error::{Result, StatusError};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for payment records keyed by payment reference.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for order records keyed by order reference.
pub const CF_ORDERS: &str = "orders";

/// A local, persistent mirror of the backend's payment and order rows.
///
/// Records are stored as JSON under their reference. Read failures surface as
/// [`StatusError::LookupUnavailable`] so a watch treats them as transient.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbPaymentLookup {
    db: Arc<DB>,
}

fn cf_for(origin: RecordOrigin) -> &'static str {
    match origin {
        RecordOrigin::Payment => CF_PAYMENTS,
        RecordOrigin::Order => CF_ORDERS,
    }
}

impl RocksDbPaymentLookup {
    /// Opens or creates a RocksDB instance at the specified path, with the
    /// "payments" and "orders" column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_orders])?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Writes `record` under `reference` in the column family of its origin.
    pub fn put(&self, reference: &str, record: &StatusRecord) -> Result<()> {
        let name = cf_for(record.origin);
        let cf = self.db.cf_handle(name).ok_or_else(|| missing_cf(name))?;
        let value = serde_json::to_vec(record)?;
        self.db.put_cf(&cf, reference.as_bytes(), value)?;
        Ok(())
    }

    fn get(&self, origin: RecordOrigin, reference: &str) -> Result<Option<StatusRecord>> {
        let name = cf_for(origin);
        let cf = self.db.cf_handle(name).ok_or_else(|| missing_cf(name))?;

        let bytes = self
            .db
            .get_cf(&cf, reference.as_bytes())
            .map_err(|e| StatusError::LookupUnavailable(format!("RocksDB read failed: {e}")))?;

        match bytes {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes).map_err(|e| {
                    StatusError::LookupUnavailable(format!("Corrupt {origin} record: {e}"))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

fn missing_cf(name: &str) -> StatusError {
    StatusError::LookupUnavailable(format!("Column family {name} not found"))
}

#[async_trait]
impl PaymentLookup for RocksDbPaymentLookup {
    async fn get_by_payment_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<StatusRecord>> {
        self.get(RecordOrigin::Payment, reference.as_str())
    }

    async fn get_by_order_reference(
        &self,
        reference: &OrderReference,
    ) -> Result<Option<StatusRecord>> {
        self.get(RecordOrigin::Order, reference.as_str())
    }
}
