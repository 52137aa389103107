//! Budget usage and threshold alerts.
//!
//! [`BudgetEngine`] owns the rules around budgets and their alerts: where a
//! budget may be placed, how much of it has been spent, and which alerts have
//! been crossed this month. It reads and writes through a [`BudgetStore`].

mod store;

pub(crate) use store::BudgetStore;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::auth::UserId;
use crate::error::{Error, Result};
use crate::models::{
    check_amount, AlertReading, Budget, BudgetAlert, BudgetUsage, BudgetWithUsage, EntryType,
    Month, NewAlert, NewBudget, TriggeredAlert, MAX_THRESHOLD, MIN_THRESHOLD,
};

pub(crate) struct BudgetEngine<'a, S: BudgetStore> {
    store: &'a S,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl<'a, S: BudgetStore> BudgetEngine<'a, S> {
    pub(crate) fn new(store: &'a S) -> Self {
        Self {
            store,
            today: local_today,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_clock(store: &'a S, today: fn() -> NaiveDate) -> Self {
        Self { store, today }
    }

    // ── Usage ─────────────────────────────────────────────────

    /// Expense spend inside the budget's month and its percentage of the
    /// budget amount.
    pub(crate) fn compute_usage(&self, user: UserId, budget: &Budget) -> Result<BudgetUsage> {
        let used = self.store.sum_expense_bills(
            user,
            budget.category_id,
            budget.month.first_day(),
            budget.month.last_day(),
        )?;
        BudgetUsage::compute(used, budget.amount)
    }

    fn with_usage(&self, user: UserId, budget: Budget) -> Result<BudgetWithUsage> {
        let usage = self.compute_usage(user, &budget)?;
        Ok(BudgetWithUsage { budget, usage })
    }

    // ── Budgets ───────────────────────────────────────────────

    /// A budget may only target one of the user's expense categories (or no
    /// category at all), and its (category, month) slot must be free.
    pub(crate) fn validate_budget_placement(
        &self,
        user: UserId,
        category_id: Option<i64>,
        month: Month,
        exclude_id: Option<i64>,
    ) -> Result<()> {
        if let Some(cid) = category_id {
            let category = self
                .store
                .find_category(cid, user)?
                .ok_or_else(|| Error::validation(format!("category {cid} does not exist")))?;
            if category.kind != EntryType::Expense {
                return Err(Error::validation(format!(
                    "budgets can only target expense categories, '{}' is {}",
                    category.name, category.kind
                )));
            }
        }

        let taken = self
            .store
            .count_budgets_in_slot(user, category_id, month, exclude_id)?;
        if taken > 0 {
            return Err(match category_id {
                Some(cid) => Error::conflict(format!(
                    "category {cid} already has a budget for {month}"
                )),
                None => Error::conflict(format!("a total budget for {month} already exists")),
            });
        }
        Ok(())
    }

    pub(crate) fn create_budget(&self, user: UserId, new: &NewBudget) -> Result<BudgetWithUsage> {
        check_amount("budget", new.amount)?;
        self.validate_budget_placement(user, new.category_id, new.month, None)?;
        let id = self.store.insert_budget(user, new)?;
        info!(user = %user, budget_id = id, month = %new.month, "budget created");
        self.get_budget(user, id)
    }

    /// Placement is re-checked only when the category or month moves.
    pub(crate) fn update_budget(
        &self,
        user: UserId,
        id: i64,
        new: &NewBudget,
    ) -> Result<BudgetWithUsage> {
        check_amount("budget", new.amount)?;
        let existing = self.find_budget(user, id)?;
        if existing.category_id != new.category_id || existing.month != new.month {
            self.validate_budget_placement(user, new.category_id, new.month, Some(id))?;
        }
        self.store.update_budget(id, user, new)?;
        info!(user = %user, budget_id = id, "budget updated");
        self.get_budget(user, id)
    }

    pub(crate) fn get_budget(&self, user: UserId, id: i64) -> Result<BudgetWithUsage> {
        let budget = self.find_budget(user, id)?;
        self.with_usage(user, budget)
    }

    pub(crate) fn list_budgets(&self, user: UserId, month: Month) -> Result<Vec<BudgetWithUsage>> {
        self.store
            .list_budgets(user, month)?
            .into_iter()
            .map(|budget| self.with_usage(user, budget))
            .collect()
    }

    /// Removes the budget together with its alerts. Returns how many alerts
    /// went with it.
    pub(crate) fn delete_budget(&self, user: UserId, id: i64) -> Result<usize> {
        self.find_budget(user, id)?;
        let alerts = self.store.delete_budget_cascade(id, user)?;
        info!(user = %user, budget_id = id, alerts, "budget deleted");
        Ok(alerts)
    }

    fn find_budget(&self, user: UserId, id: i64) -> Result<Budget> {
        self.store
            .find_budget(id, user)?
            .ok_or_else(|| Error::not_found(format!("budget {id}")))
    }

    // ── Alerts ────────────────────────────────────────────────

    pub(crate) fn create_alert(&self, user: UserId, new: &NewAlert) -> Result<BudgetAlert> {
        self.validate_alert(user, new, None)?;
        let id = self.store.insert_alert(user, new)?;
        info!(
            user = %user,
            alert_id = id,
            budget_id = new.budget_id,
            threshold = new.threshold,
            "budget alert created"
        );
        self.get_alert(user, id)
    }

    pub(crate) fn update_alert(&self, user: UserId, id: i64, new: &NewAlert) -> Result<BudgetAlert> {
        self.get_alert(user, id)?;
        self.validate_alert(user, new, Some(id))?;
        self.store.update_alert(id, user, new)?;
        info!(user = %user, alert_id = id, "budget alert updated");
        self.get_alert(user, id)
    }

    pub(crate) fn delete_alert(&self, user: UserId, id: i64) -> Result<()> {
        self.get_alert(user, id)?;
        self.store.delete_alert(id, user)?;
        info!(user = %user, alert_id = id, "budget alert deleted");
        Ok(())
    }

    pub(crate) fn list_alerts(&self, user: UserId, budget_id: Option<i64>) -> Result<Vec<BudgetAlert>> {
        self.store.list_alerts(user, budget_id)
    }

    pub(crate) fn get_alert(&self, user: UserId, id: i64) -> Result<BudgetAlert> {
        self.store
            .find_alert(id, user)?
            .ok_or_else(|| Error::not_found(format!("budget alert {id}")))
    }

    /// The threshold range is checked before anything is read.
    fn validate_alert(&self, user: UserId, new: &NewAlert, exclude_id: Option<i64>) -> Result<()> {
        if !new.threshold_in_range() {
            debug!(threshold = new.threshold, "alert threshold rejected");
            return Err(Error::validation(format!(
                "threshold must be between {MIN_THRESHOLD} and {MAX_THRESHOLD}, got {}",
                new.threshold
            )));
        }
        self.find_budget(user, new.budget_id)?;
        let taken = self
            .store
            .count_alerts_with_threshold(new.budget_id, new.threshold, exclude_id)?;
        if taken > 0 {
            return Err(Error::conflict(format!(
                "budget {} already has a {}% alert",
                new.budget_id, new.threshold
            )));
        }
        Ok(())
    }

    /// Active alerts of the current month whose budget usage has reached the
    /// threshold. Nothing is written; the same alert is reported on every
    /// call for as long as it stays crossed.
    pub(crate) fn check_alerts(&self, user: UserId) -> Result<Vec<TriggeredAlert>> {
        let month = Month::containing((self.today)());
        let budgets = self.list_budgets(user, month)?;
        let by_id: HashMap<i64, &BudgetWithUsage> =
            budgets.iter().map(|b| (b.budget.id, b)).collect();

        let alerts = self.store.list_active_alerts(user, month)?;
        let mut triggered = Vec::new();
        for alert in &alerts {
            let Some(parent) = by_id.get(&alert.budget_id) else {
                debug!(alert_id = alert.id, budget_id = alert.budget_id, "alert without budget skipped");
                continue;
            };
            if parent.usage.percentage < Decimal::from(alert.threshold) {
                continue;
            }
            let reading = AlertReading {
                alert_id: alert.id,
                budget_id: alert.budget_id,
                threshold: alert.threshold,
                used_percent: parent.usage.percentage,
                used_amount: parent.usage.used_amount,
                budget_amount: parent.budget.amount,
            };
            triggered.push(match parent.budget.category_id {
                Some(category_id) => TriggeredAlert::Category {
                    reading,
                    category_id,
                    category_name: parent.budget.category_name.clone().unwrap_or_default(),
                },
                None => TriggeredAlert::Total { reading },
            });
        }

        info!(
            user = %user,
            month = %month,
            evaluated = alerts.len(),
            triggered = triggered.len(),
            "budget alerts checked"
        );
        Ok(triggered)
    }
}
