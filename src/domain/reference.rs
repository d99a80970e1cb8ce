use crate::error::{Result, StatusError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a payment attempt, minted by the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentReference(String);

/// Identifier of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderReference(String);

macro_rules! opaque_reference {
    ($name:ident) => {
        impl $name {
            /// Returns `None` for empty or whitespace-only input.
            pub fn parse(raw: &str) -> Option<Self> {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_reference!(PaymentReference);
opaque_reference!(OrderReference);

/// The identifiers a caller holds for one order.
///
/// At least one side is always present; a pair with neither cannot be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePair {
    payment: Option<PaymentReference>,
    order: Option<OrderReference>,
}

impl ReferencePair {
    pub fn new(payment: Option<PaymentReference>, order: Option<OrderReference>) -> Result<Self> {
        if payment.is_none() && order.is_none() {
            return Err(StatusError::InvalidReference);
        }
        Ok(Self { payment, order })
    }

    /// Builds a pair from raw strings, treating blank values as absent.
    pub fn from_raw(payment: Option<&str>, order: Option<&str>) -> Result<Self> {
        Self::new(
            payment.and_then(PaymentReference::parse),
            order.and_then(OrderReference::parse),
        )
    }

    pub fn payment(&self) -> Option<&PaymentReference> {
        self.payment.as_ref()
    }

    pub fn order(&self) -> Option<&OrderReference> {
        self.order.as_ref()
    }
}

impl fmt::Display for ReferencePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.payment, &self.order) {
            (Some(p), Some(o)) => write!(f, "payment={p} order={o}"),
            (Some(p), None) => write!(f, "payment={p}"),
            (None, Some(o)) => write!(f, "order={o}"),
            (None, None) => f.write_str("<none>"),
        }
    }
}
