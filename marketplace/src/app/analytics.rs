//! Lender revenue analytics.

use crate::aggregates::payment::LendPaymentStatus;
use crate::error::MarketResult;
use crate::store::PaymentLedger;
use crate::types::{AccountId, Money};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Months reported, ending with the current one.
pub const REVENUE_MONTHS: u32 = 6;

/// Revenue for one calendar month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    /// Abbreviated month name ("Oct")
    pub month: String,
    /// Payments received in the month
    pub revenue: Money,
}

/// `(year, month)` shifted back `months_back` calendar months.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn month_back(year: i32, month: u32, months_back: u32) -> (i32, u32) {
    let index = i64::from(year) * 12 + i64::from(month) - 1 - i64::from(months_back);
    (index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1)
}

fn month_name(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map_or_else(String::new, |date| date.format("%b").to_string())
}

/// Revenue of `lender` over the trailing six months, oldest first.
///
/// Months without received payments report zero.
///
/// # Errors
///
/// Returns the ledger error.
pub async fn lender_revenue(
    ledger: &dyn PaymentLedger,
    lender: &AccountId,
    now: DateTime<Utc>,
) -> MarketResult<Vec<MonthlyRevenue>> {
    let mut totals: HashMap<(i32, u32), Money> = HashMap::new();
    for payment in ledger.for_lender(lender).await? {
        if payment.status != LendPaymentStatus::Received {
            continue;
        }
        let key = (payment.created_at.year(), payment.created_at.month());
        let total = totals.entry(key).or_default();
        *total = total.checked_add(payment.amount).unwrap_or(*total);
    }

    Ok((0..REVENUE_MONTHS)
        .rev()
        .map(|back| {
            let (year, month) = month_back(now.year(), now.month(), back);
            MonthlyRevenue {
                month: month_name(year, month),
                revenue: totals.get(&(year, month)).copied().unwrap_or_default(),
            }
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::aggregates::payment::LendPayment;
    use crate::store::InMemoryStore;
    use crate::types::OrderId;
    use chrono::TimeZone;

    #[test]
    fn test_month_back_crosses_year() {
        assert_eq!(month_back(2025, 3, 0), (2025, 3));
        assert_eq!(month_back(2025, 3, 3), (2024, 12));
        assert_eq!(month_back(2025, 1, 5), (2024, 8));
    }

    #[tokio::test]
    async fn test_six_months_zero_filled_oldest_first() {
        let store = InMemoryStore::new();
        let lender = AccountId::new("l1");
        let now = Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap();

        for (when, rupees) in [
            (Utc.with_ymd_and_hms(2025, 10, 2, 0, 0, 0).unwrap(), 100),
            (Utc.with_ymd_and_hms(2025, 10, 9, 0, 0, 0).unwrap(), 50),
            (Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(), 80),
            (Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), 999),
        ] {
            store
                .record(LendPayment::received(OrderId::new(), lender.clone(), Money::from_rupees(rupees), when))
                .await
                .unwrap();
        }
        store
            .record(LendPayment::received(OrderId::new(), AccountId::new("l2"), Money::from_rupees(7), now))
            .await
            .unwrap();

        let report = lender_revenue(&store, &lender, now).await.unwrap();

        let months: Vec<&str> = report.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, vec!["May", "Jun", "Jul", "Aug", "Sep", "Oct"]);
        let revenue: Vec<u64> = report.iter().map(|r| r.revenue.rupees()).collect();
        assert_eq!(revenue, vec![0, 0, 80, 0, 0, 150]);
    }
}
