use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

pub type UserId = i64;
pub type InvoiceId = i64;

pub const DEFAULT_INVOICE_STATUS: &str = "DRAFT";

/// Fields accepted at registration. `password` is plaintext and never stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Identity returned by a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
}

impl AuthenticatedUser {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub user_id: UserId,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: String,
}

/// One row of a user's invoice listing, in its wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRecord {
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub status: String,
}

/// Monetary amounts are kept with two fractional digits and must fit a
/// DECIMAL(10,2) column.
pub mod money {
    use super::*;

    const SCALE: u32 = 2;
    const MAX_MINOR_UNITS: i64 = 9_999_999_999;

    /// Converts an amount to cents, rounding half away from zero.
    /// Returns `None` when the amount does not fit.
    pub fn to_minor_units(amount: Decimal) -> Option<i64> {
        let cents = amount
            .round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)?
            .to_i64()?;
        (cents.abs() <= MAX_MINOR_UNITS).then_some(cents)
    }

    pub fn from_minor_units(cents: i64) -> Decimal {
        Decimal::new(cents, SCALE)
    }

}
