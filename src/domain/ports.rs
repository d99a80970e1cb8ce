use super::record::StatusRecord;
use super::reference::{OrderReference, PaymentReference};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Read-only view of the backend's payment and order rows.
///
/// Both lookups are idempotent: a read never changes what the next read
/// returns. An unknown reference is `Ok(None)`, never an
/// error; errors are reserved for transport or backend failures and should be
/// reported as [`crate::error::StatusError::LookupUnavailable`].
#[async_trait]
pub trait PaymentLookup: Send + Sync {
    async fn get_by_payment_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<StatusRecord>>;

    async fn get_by_order_reference(
        &self,
        reference: &OrderReference,
    ) -> Result<Option<StatusRecord>>;
}

/// Storage slot used to carry references across a processor redirect.
///
/// `take` is single-use: it returns the stored value and clears the slot.
#[async_trait]
pub trait ReferenceHandoff: Send + Sync {
    async fn put(&self, key: &str, value: &str) -> Result<()>;
    async fn take(&self, key: &str) -> Result<Option<String>>;
}

pub type SharedPaymentLookup = Arc<dyn PaymentLookup>;
pub type ReferenceHandoffBox = Box<dyn ReferenceHandoff>;
