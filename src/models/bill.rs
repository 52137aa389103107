use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::EntryType;

#[derive(Debug, Clone, Serialize)]
pub struct Bill {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub date: NaiveDate,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    pub category_name: String,
}

impl Bill {
    pub fn is_expense(&self) -> bool {
        self.kind == EntryType::Expense
    }

    /// Amount with the sign of its direction: income positive, expense negative.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            EntryType::Income => self.amount,
            EntryType::Expense => -self.amount,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub category_id: i64,
    pub amount: Decimal,
    pub kind: EntryType,
    pub date: NaiveDate,
    pub description: String,
}

/// Optional filters for listing bills. `page` is 1-based and only applies
/// together with `page_size`.
#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub kind: Option<EntryType>,
    pub category_id: Option<i64>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillPage {
    pub bills: Vec<Bill>,
    pub total: i64,
}
