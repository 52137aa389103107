use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// Largest amount a single bill or budget may carry.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Positive and no larger than [`MAX_AMOUNT`]. `what` names the record in
/// the message.
pub fn check_amount(what: &str, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation(format!(
            "{what} amount must be positive, got {amount}"
        )));
    }
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(Error::validation(format!(
            "{what} amount must be at most {MAX_AMOUNT}, got {amount}"
        )));
    }
    Ok(())
}

// Rows written before the cap existed, or by other tools, can still be
// large enough to overflow, so sums are checked rather than trusted.

pub fn add_amounts(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| Error::validation(format!("amount overflow adding {b} to {a}")))
}

pub fn sub_amounts(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b)
        .ok_or_else(|| Error::validation(format!("amount overflow subtracting {b} from {a}")))
}
