//! Prices are exchanged as `Decimal` with two places and persisted as integer cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::error::DomainError;

pub const SCALE: u32 = 2;

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, SCALE)
}

/// `None` when the amount has sub-cent precision or overflows `i64` cents.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    if amount.normalize().scale() > SCALE {
        return None;
    }
    amount.checked_mul(Decimal::ONE_HUNDRED)?.trunc().to_i64()
}

/// Check a seller-supplied price and bring it to the canonical two-place form.
pub fn validate_price(price: Decimal) -> Result<Decimal, DomainError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation("price", "must not be negative"));
    }
    let cents = to_cents(price).ok_or_else(|| {
        DomainError::validation("price", "must have at most two decimal places")
    })?;
    Ok(from_cents(cents))
}
