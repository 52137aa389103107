use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::auth::UserId;
use crate::error::Result;
use crate::models::{Budget, BudgetAlert, Category, Month, NewAlert, NewBudget};

/// Storage the budget engine reads and writes through.
///
/// Every lookup is scoped to the owning user; a record owned by someone
/// else is reported as absent. Implementations must enforce budget-slot and
/// alert-threshold uniqueness themselves and report a violation as
/// [`crate::error::Error::Conflict`], since the engine's pre-write checks
/// can race with a concurrent writer.
pub(crate) trait BudgetStore {
    fn find_category(&self, id: i64, user: UserId) -> Result<Option<Category>>;

    fn find_budget(&self, id: i64, user: UserId) -> Result<Option<Budget>>;

    /// Budgets of one month, the total budget first, then by category name.
    fn list_budgets(&self, user: UserId, month: Month) -> Result<Vec<Budget>>;

    /// Sum of expense bills dated in `[start, end]`. `category_id == None`
    /// matches every category.
    fn sum_expense_bills(
        &self,
        user: UserId,
        category_id: Option<i64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal>;

    fn count_budgets_in_slot(
        &self,
        user: UserId,
        category_id: Option<i64>,
        month: Month,
        exclude_id: Option<i64>,
    ) -> Result<i64>;

    fn count_alerts_with_threshold(
        &self,
        budget_id: i64,
        threshold: i64,
        exclude_id: Option<i64>,
    ) -> Result<i64>;

    fn insert_budget(&self, user: UserId, budget: &NewBudget) -> Result<i64>;

    fn update_budget(&self, id: i64, user: UserId, budget: &NewBudget) -> Result<()>;

    /// Delete a budget and all of its alerts atomically. Returns the number
    /// of alerts removed.
    fn delete_budget_cascade(&self, id: i64, user: UserId) -> Result<usize>;

    fn find_alert(&self, id: i64, user: UserId) -> Result<Option<BudgetAlert>>;

    /// Alerts ordered by threshold, optionally limited to one budget.
    fn list_alerts(&self, user: UserId, budget_id: Option<i64>) -> Result<Vec<BudgetAlert>>;

    /// Active alerts whose budget belongs to `month`.
    fn list_active_alerts(&self, user: UserId, month: Month) -> Result<Vec<BudgetAlert>>;

    fn insert_alert(&self, user: UserId, alert: &NewAlert) -> Result<i64>;

    fn update_alert(&self, id: i64, user: UserId, alert: &NewAlert) -> Result<()>;

    fn delete_alert(&self, id: i64, user: UserId) -> Result<()>;
}
