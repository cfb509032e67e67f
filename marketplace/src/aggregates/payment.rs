//! Lender payment records.

use crate::types::{AccountId, Money, OrderId, PaymentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settlement state of a lender payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LendPaymentStatus {
    /// Captured when the rental went out for delivery
    Received,
}

/// Money a lender received for a dispatched rental.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendPayment {
    /// Payment id
    pub id: PaymentId,
    /// Rental order paid for
    pub order: OrderId,
    /// Receiving lender
    pub lender: AccountId,
    /// Amount captured
    pub amount: Money,
    /// Settlement state
    pub status: LendPaymentStatus,
    /// Capture time
    pub created_at: DateTime<Utc>,
}

impl LendPayment {
    /// A payment received now
    #[must_use]
    pub fn received(order: OrderId, lender: AccountId, amount: Money, now: DateTime<Utc>) -> Self {
        Self {
            id: PaymentId::new(),
            order,
            lender,
            amount,
            status: LendPaymentStatus::Received,
            created_at: now,
        }
    }
}
