//! Recovering references when the result view opens.
//!
//! References arrive either on the query string after a processor redirect
//! or through a one-shot handoff slot written before the redirect.

use crate::domain::ports::ReferenceHandoff;
use crate::domain::reference::ReferencePair;
use crate::error::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const QUERY_PAYMENT_ID: &str = "paymentId";
pub const QUERY_ORDER_ID: &str = "orderId";
pub const QUERY_TRANSACTION_ID: &str = "transactionId";

pub const HANDOFF_PAYMENT_KEY: &str = "pending_payment_id";
pub const HANDOFF_ORDER_KEY: &str = "pending_order_id";

/// References found on the arrival query string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArrivalQuery {
    pub payment_id: Option<String>,
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
}

impl ArrivalQuery {
    /// Parses a form-encoded query string, with or without a leading `?`.
    ///
    /// Values are percent-decoded. Unknown keys are ignored and blank values
    /// count as absent. When a key repeats, the first occurrence wins.
    pub fn parse(query: &str) -> Self {
        let pairs: Vec<(String, String)> =
            match serde_urlencoded::from_str(query.trim_start_matches('?')) {
                Ok(pairs) => pairs,
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable arrival query");
                    return Self::default();
                }
            };

        let mut parsed = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_str() {
                QUERY_PAYMENT_ID => &mut parsed.payment_id,
                QUERY_ORDER_ID => &mut parsed.order_id,
                QUERY_TRANSACTION_ID => &mut parsed.transaction_id,
                _ => continue,
            };
            slot.get_or_insert_with(|| value.to_string());
        }
        parsed
    }

    /// The processor's transaction id stands in for a missing payment id.
    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_id
            .as_deref()
            .or(self.transaction_id.as_deref())
    }

    pub fn order_reference(&self) -> Option<&str> {
        self.order_id.as_deref()
    }
}

/// What the result view should do on arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arrival {
    /// Start watching these references.
    Resolve(ReferencePair),
    /// Nothing to watch: navigate to the order list after `after`.
    Fallback { after: Duration },
}

impl Arrival {
    /// Combines query references with the handoff slot.
    ///
    /// Both handoff keys are always taken, so the slot is cleared even when
    /// the query string already has everything. Query values win over
    /// handoff values, reference by reference. A handoff that cannot be read
    /// is logged and treated as empty.
    pub async fn recover(
        query: &ArrivalQuery,
        handoff: &dyn ReferenceHandoff,
        grace: Duration,
    ) -> Self {
        let stashed_payment = take_or_warn(handoff, HANDOFF_PAYMENT_KEY).await;
        let stashed_order = take_or_warn(handoff, HANDOFF_ORDER_KEY).await;
        debug!(
            stashed_payment = stashed_payment.is_some(),
            stashed_order = stashed_order.is_some(),
            "consumed reference handoff"
        );

        let payment = query.payment_reference().or(stashed_payment.as_deref());
        let order = query.order_reference().or(stashed_order.as_deref());

        match ReferencePair::from_raw(payment, order) {
            Ok(pair) => Arrival::Resolve(pair),
            Err(_) => {
                info!(?grace, "no payment or order reference on arrival");
                Arrival::Fallback { after: grace }
            }
        }
    }
}

/// An unreadable slot counts as empty; the query string may still carry the
/// references.
async fn take_or_warn(handoff: &dyn ReferenceHandoff, key: &str) -> Option<String> {
    match handoff.take(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "reference handoff unreadable, ignoring it");
            None
        }
    }
}

/// Writes the handoff slot before redirecting to the payment processor.
pub async fn stash(handoff: &dyn ReferenceHandoff, pair: &ReferencePair) -> Result<()> {
    if let Some(payment) = pair.payment() {
        handoff.put(HANDOFF_PAYMENT_KEY, payment.as_str()).await?;
    }
    if let Some(order) = pair.order() {
        handoff.put(HANDOFF_ORDER_KEY, order.as_str()).await?;
    }
    Ok(())
}
