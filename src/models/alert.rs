use rust_decimal::Decimal;
use serde::Serialize;

pub const MIN_THRESHOLD: i64 = 1;
pub const MAX_THRESHOLD: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct BudgetAlert {
    pub id: i64,
    pub user_id: i64,
    pub budget_id: i64,
    /// Percentage of the budget amount, 1-100.
    pub threshold: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub budget_id: i64,
    pub threshold: i64,
    pub is_active: bool,
}

impl NewAlert {
    pub fn new(budget_id: i64, threshold: i64) -> Self {
        Self {
            budget_id,
            threshold,
            is_active: true,
        }
    }

    pub fn threshold_in_range(&self) -> bool {
        (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&self.threshold)
    }
}

/// Figures shared by every triggered alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertReading {
    pub alert_id: i64,
    pub budget_id: i64,
    pub threshold: i64,
    pub used_percent: Decimal,
    pub used_amount: Decimal,
    pub budget_amount: Decimal,
}

/// An alert whose budget has reached its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "budget_type", rename_all = "lowercase")]
pub enum TriggeredAlert {
    Category {
        #[serde(flatten)]
        reading: AlertReading,
        category_id: i64,
        category_name: String,
    },
    Total {
        #[serde(flatten)]
        reading: AlertReading,
    },
}

impl TriggeredAlert {
    pub fn reading(&self) -> &AlertReading {
        match self {
            Self::Category { reading, .. } | Self::Total { reading } => reading,
        }
    }

    pub fn budget_type(&self) -> &'static str {
        match self {
            Self::Category { .. } => "category",
            Self::Total { .. } => "total",
        }
    }
}
