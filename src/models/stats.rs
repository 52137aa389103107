use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{EntryType, Month};

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub category_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub icon: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyStats {
    pub month: Month,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
    pub categories: Vec<CategoryTotal>,
    pub daily: Vec<DailyTotal>,
}
