use rust_decimal::Decimal;
use serde::Serialize;

use super::Month;
use crate::error::{Error, Result};

/// A monthly spending cap. `category_id == None` is the month's total budget,
/// covering every expense category.
#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub amount: Decimal,
    pub month: Month,
    pub created_at: String,
    pub updated_at: String,
}

impl Budget {
    pub fn is_total(&self) -> bool {
        self.category_id.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewBudget {
    pub category_id: Option<i64>,
    pub amount: Decimal,
    pub month: Month,
}

impl NewBudget {
    pub fn total(amount: Decimal, month: Month) -> Self {
        Self {
            category_id: None,
            amount,
            month,
        }
    }

    pub fn for_category(category_id: i64, amount: Decimal, month: Month) -> Self {
        Self {
            category_id: Some(category_id),
            amount,
            month,
        }
    }
}

/// Spend against a budget for its month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetUsage {
    pub used_amount: Decimal,
    pub percentage: Decimal,
}

impl BudgetUsage {
    /// `used / amount * 100`, or zero when the budget amount is not positive.
    /// A percentage too large for `Decimal` is a validation error.
    pub fn compute(used_amount: Decimal, amount: Decimal) -> Result<Self> {
        let percentage = if amount <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            used_amount
                .checked_div(amount)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or_else(|| {
                    Error::validation(format!(
                        "usage of {used_amount} against a budget of {amount} is out of range"
                    ))
                })?
        };
        Ok(Self {
            used_amount,
            percentage,
        })
    }

    pub fn remaining(&self, amount: Decimal) -> Decimal {
        amount - self.used_amount
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetWithUsage {
    #[serde(flatten)]
    pub budget: Budget,
    #[serde(flatten)]
    pub usage: BudgetUsage,
}
