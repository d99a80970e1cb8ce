use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backend table a status record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    Payment,
    Order,
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordOrigin::Payment => f.write_str("payment"),
            RecordOrigin::Order => f.write_str("order"),
        }
    }
}

/// A payment or order row as the backend reports it.
///
/// `status` is kept in the backend's own vocabulary; normalization happens
/// in [`crate::domain::settlement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub origin: RecordOrigin,
    pub status: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl StatusRecord {
    pub fn new(origin: RecordOrigin, status: impl Into<String>) -> Self {
        Self {
            origin,
            status: status.into(),
            amount: None,
            currency: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal, currency: impl Into<String>) -> Self {
        self.amount = Some(amount);
        self.currency = Some(currency.into());
        self
    }
}
