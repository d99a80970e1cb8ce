use super::record::RecordOrigin;
use crate::error::{Result, StatusError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized payment lifecycle stage of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementState {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Cancelled,
    /// No record found yet, or a status outside the known vocabulary.
    Unknown,
}

impl SettlementState {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SettlementState::Succeeded | SettlementState::Failed | SettlementState::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SettlementState::Pending => "pending",
            SettlementState::Processing => "processing",
            SettlementState::Succeeded => "succeeded",
            SettlementState::Failed => "failed",
            SettlementState::Cancelled => "cancelled",
            SettlementState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw statuses reported by the payment processor.
pub const PAYMENT_STATUS_TABLE: &[(&str, SettlementState)] = &[
    ("initiated", SettlementState::Pending),
    ("pending", SettlementState::Pending),
    ("requires_action", SettlementState::Pending),
    ("authorized", SettlementState::Processing),
    ("processing", SettlementState::Processing),
    ("in_progress", SettlementState::Processing),
    ("captured", SettlementState::Succeeded),
    ("paid", SettlementState::Succeeded),
    ("succeeded", SettlementState::Succeeded),
    ("success", SettlementState::Succeeded),
    ("completed", SettlementState::Succeeded),
    ("failed", SettlementState::Failed),
    ("declined", SettlementState::Failed),
    ("rejected", SettlementState::Failed),
    ("expired", SettlementState::Failed),
    ("cancelled", SettlementState::Cancelled),
    ("canceled", SettlementState::Cancelled),
    ("voided", SettlementState::Cancelled),
];

/// Raw statuses stored on the orders table.
pub const ORDER_STATUS_TABLE: &[(&str, SettlementState)] = &[
    ("pending", SettlementState::Pending),
    ("awaiting_payment", SettlementState::Pending),
    ("payment_processing", SettlementState::Processing),
    ("paid", SettlementState::Succeeded),
    ("confirmed", SettlementState::Succeeded),
    ("preparing", SettlementState::Succeeded),
    ("out_for_delivery", SettlementState::Succeeded),
    ("delivered", SettlementState::Succeeded),
    ("payment_failed", SettlementState::Failed),
    ("failed", SettlementState::Failed),
    ("cancelled", SettlementState::Cancelled),
    ("canceled", SettlementState::Cancelled),
];

fn table_for(origin: RecordOrigin) -> &'static [(&'static str, SettlementState)] {
    match origin {
        RecordOrigin::Payment => PAYMENT_STATUS_TABLE,
        RecordOrigin::Order => ORDER_STATUS_TABLE,
    }
}

/// Maps a raw backend status to a [`SettlementState`].
///
/// Matching ignores case and surrounding whitespace. Values outside the table
/// return [`StatusError::UnrecognizedStatusValue`]; callers decide whether that
/// becomes `Unknown`.
pub fn normalize(origin: RecordOrigin, raw: &str) -> Result<SettlementState> {
    let key = raw.trim().to_ascii_lowercase();
    table_for(origin)
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, state)| *state)
        .ok_or_else(|| StatusError::UnrecognizedStatusValue {
            origin,
            raw: raw.to_string(),
        })
}
