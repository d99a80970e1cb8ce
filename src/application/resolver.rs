use crate::application::watch::{Watch, WatchConfig};
use crate::domain::ports::SharedPaymentLookup;
use crate::domain::record::{RecordOrigin, StatusRecord};
use crate::domain::reference::ReferencePair;
use crate::domain::settlement::{self, SettlementState};
use crate::error::Result;
use tracing::{debug, warn};

/// Outcome of a single resolution, with the record that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub state: SettlementState,
    /// `None` when neither lookup found a record.
    pub record: Option<StatusRecord>,
}

impl Resolution {
    fn not_found() -> Self {
        Self {
            state: SettlementState::Unknown,
            record: None,
        }
    }

    pub fn origin(&self) -> Option<RecordOrigin> {
        self.record.as_ref().map(|r| r.origin)
    }
}

/// Determines the settlement state of an order from its references.
///
/// The lookup collaborator is injected; cloning the resolver shares it.
#[derive(Clone)]
pub struct PaymentStatusResolver {
    lookup: SharedPaymentLookup,
}

impl PaymentStatusResolver {
    pub fn new(lookup: SharedPaymentLookup) -> Self {
        Self { lookup }
    }

    /// Resolves once from raw, possibly blank, references.
    ///
    /// Fails with [`crate::error::StatusError::InvalidReference`] before touching the
    /// lookup when both are blank.
    pub async fn resolve_once(
        &self,
        payment: Option<&str>,
        order: Option<&str>,
    ) -> Result<SettlementState> {
        let pair = ReferencePair::from_raw(payment, order)?;
        Ok(self.resolve(&pair).await?.state)
    }

    /// Resolves once, preferring the payment record over the order record.
    ///
    /// The order record is only consulted when there is no payment reference
    /// or the payment lookup finds nothing. A missing record is `Unknown`.
    pub async fn resolve(&self, pair: &ReferencePair) -> Result<Resolution> {
        if let Some(payment) = pair.payment()
            && let Some(record) = self.lookup.get_by_payment_reference(payment).await?
        {
            return Ok(Self::classify(record));
        }

        if let Some(order) = pair.order()
            && let Some(record) = self.lookup.get_by_order_reference(order).await?
        {
            return Ok(Self::classify(record));
        }

        debug!(references = %pair, "no record found yet");
        Ok(Resolution::not_found())
    }

    fn classify(record: StatusRecord) -> Resolution {
        let state = match settlement::normalize(record.origin, &record.status) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "treating unrecognized status as unknown");
                SettlementState::Unknown
            }
        };
        Resolution {
            state,
            record: Some(record),
        }
    }

    /// Starts a watch over raw references. Nothing runs until the watch is
    /// polled.
    pub fn watch(
        &self,
        payment: Option<&str>,
        order: Option<&str>,
        config: WatchConfig,
    ) -> Result<Watch> {
        let pair = ReferencePair::from_raw(payment, order)?;
        Watch::new(self.clone(), pair, config)
    }
}
