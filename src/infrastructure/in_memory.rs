use crate::domain::ports::{PaymentLookup, ReferenceHandoff};
use crate::domain::record::{RecordOrigin, StatusRecord};
use crate::domain::reference::{OrderReference, PaymentReference};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type RowKey = (RecordOrigin, String);

/// An in-memory stand-in for the backend's payment and order tables.
///
/// Uses `Arc<RwLock<HashMap<(RecordOrigin, String), StatusRecord>>>` so clones
/// share one table. Lookups only take the read lock and never change a row.
#[derive(Default, Clone)]
pub struct InMemoryPaymentLookup {
    rows: Arc<RwLock<HashMap<RowKey, StatusRecord>>>,
}

impl InMemoryPaymentLookup {
    /// Creates a new, empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the row for `reference` in the table of the
    /// record's origin.
    pub async fn put(&self, reference: &str, record: StatusRecord) {
        let mut rows = self.rows.write().await;
        rows.insert((record.origin, reference.to_string()), record);
    }

    async fn get(&self, origin: RecordOrigin, reference: &str) -> Option<StatusRecord> {
        let rows = self.rows.read().await;
        rows.get(&(origin, reference.to_string())).cloned()
    }
}

#[async_trait]
impl PaymentLookup for InMemoryPaymentLookup {
    async fn get_by_payment_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<StatusRecord>> {
        Ok(self.get(RecordOrigin::Payment, reference.as_str()).await)
    }

    async fn get_by_order_reference(
        &self,
        reference: &OrderReference,
    ) -> Result<Option<StatusRecord>> {
        Ok(self.get(RecordOrigin::Order, reference.as_str()).await)
    }
}

/// A handoff slot kept in process memory, like a tab's session storage.
#[derive(Default, Clone)]
pub struct InMemoryHandoff {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryHandoff {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferenceHandoff for InMemoryHandoff {
    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.lock().await;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>> {
        let mut slots = self.slots.lock().await;
        Ok(slots.remove(key))
    }
}
