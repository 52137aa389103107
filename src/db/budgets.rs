use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::debug;

use super::{decimal_at, now, Database};
use crate::auth::UserId;
use crate::engine::BudgetStore;
use crate::error::{Error, Result};
use crate::models::*;

const BUDGET_COLUMNS: &str = "b.id, b.user_id, b.category_id, c.name, b.amount, b.month,
                              b.created_at, b.updated_at";

const ALERT_COLUMNS: &str = "ba.id, ba.user_id, ba.budget_id, ba.threshold, ba.is_active,
                             ba.created_at, ba.updated_at";

impl BudgetStore for Database {
    fn find_category(&self, id: i64, user: UserId) -> Result<Option<Category>> {
        self.get_category(id, user)
    }

    fn find_budget(&self, id: i64, user: UserId) -> Result<Option<Budget>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {BUDGET_COLUMNS}
                     FROM budgets b LEFT JOIN categories c ON b.category_id = c.id
                     WHERE b.id = ?1 AND b.user_id = ?2"
                ),
                params![id, user],
                budget_from_row,
            )
            .optional()?)
    }

    fn list_budgets(&self, user: UserId, month: Month) -> Result<Vec<Budget>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BUDGET_COLUMNS}
             FROM budgets b LEFT JOIN categories c ON b.category_id = c.id
             WHERE b.user_id = ?1 AND b.month = ?2
             ORDER BY b.category_id IS NULL DESC, c.name, b.id"
        ))?;
        let rows = stmt.query_map(params![user, month], budget_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn sum_expense_bills(
        &self,
        user: UserId,
        category_id: Option<i64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT amount FROM bills
             WHERE user_id = ?1 AND type = 'expense' AND date BETWEEN ?2 AND ?3
               AND (?4 IS NULL OR category_id = ?4)",
        )?;
        let amounts = stmt.query_map(params![user, start, end, category_id], |row| {
            decimal_at(row, 0)
        })?;
        let mut total = Decimal::ZERO;
        for amount in amounts {
            total = add_amounts(total, amount?)?;
        }
        Ok(total)
    }

    fn count_budgets_in_slot(
        &self,
        user: UserId,
        category_id: Option<i64>,
        month: Month,
        exclude_id: Option<i64>,
    ) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM budgets
             WHERE user_id = ?1 AND category_id IS ?2 AND month = ?3
               AND (?4 IS NULL OR id != ?4)",
            params![user, category_id, month, exclude_id],
            |row| row.get(0),
        )?)
    }

    fn count_alerts_with_threshold(
        &self,
        budget_id: i64,
        threshold: i64,
        exclude_id: Option<i64>,
    ) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM budget_alerts
             WHERE budget_id = ?1 AND threshold = ?2 AND (?3 IS NULL OR id != ?3)",
            params![budget_id, threshold, exclude_id],
            |row| row.get(0),
        )?)
    }

    fn insert_budget(&self, user: UserId, budget: &NewBudget) -> Result<i64> {
        let ts = now();
        self.conn.execute(
            "INSERT INTO budgets (user_id, category_id, amount, month, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                user,
                budget.category_id,
                budget.amount.to_string(),
                budget.month,
                ts,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_budget(&self, id: i64, user: UserId, budget: &NewBudget) -> Result<()> {
        self.conn.execute(
            "UPDATE budgets SET category_id = ?1, amount = ?2, month = ?3, updated_at = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![
                budget.category_id,
                budget.amount.to_string(),
                budget.month,
                now(),
                id,
                user,
            ],
        )?;
        Ok(())
    }

    fn delete_budget_cascade(&self, id: i64, user: UserId) -> Result<usize> {
        // Rolled back on drop unless committed.
        let tx = self.conn.unchecked_transaction()?;
        let alerts = tx.execute(
            "DELETE FROM budget_alerts WHERE budget_id = ?1",
            params![id],
        )?;
        let budgets = tx.execute(
            "DELETE FROM budgets WHERE id = ?1 AND user_id = ?2",
            params![id, user],
        )?;
        if budgets == 0 {
            return Err(Error::not_found(format!("budget {id}")));
        }
        tx.commit()?;
        debug!(budget_id = id, alerts, "budget deleted with its alerts");
        Ok(alerts)
    }

    fn find_alert(&self, id: i64, user: UserId) -> Result<Option<BudgetAlert>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {ALERT_COLUMNS} FROM budget_alerts ba
                     WHERE ba.id = ?1 AND ba.user_id = ?2"
                ),
                params![id, user],
                alert_from_row,
            )
            .optional()?)
    }

    fn list_alerts(&self, user: UserId, budget_id: Option<i64>) -> Result<Vec<BudgetAlert>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM budget_alerts ba
             WHERE ba.user_id = ?1 AND (?2 IS NULL OR ba.budget_id = ?2)
             ORDER BY ba.threshold, ba.id"
        ))?;
        let rows = stmt.query_map(params![user, budget_id], alert_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn list_active_alerts(&self, user: UserId, month: Month) -> Result<Vec<BudgetAlert>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM budget_alerts ba
             JOIN budgets b ON ba.budget_id = b.id
             WHERE ba.user_id = ?1 AND ba.is_active = 1 AND b.month = ?2
             ORDER BY ba.id"
        ))?;
        let rows = stmt.query_map(params![user, month], alert_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn insert_alert(&self, user: UserId, alert: &NewAlert) -> Result<i64> {
        let ts = now();
        self.conn.execute(
            "INSERT INTO budget_alerts (user_id, budget_id, threshold, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![user, alert.budget_id, alert.threshold, alert.is_active, ts],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_alert(&self, id: i64, user: UserId, alert: &NewAlert) -> Result<()> {
        self.conn.execute(
            "UPDATE budget_alerts SET budget_id = ?1, threshold = ?2, is_active = ?3, updated_at = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![alert.budget_id, alert.threshold, alert.is_active, now(), id, user],
        )?;
        Ok(())
    }

    fn delete_alert(&self, id: i64, user: UserId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM budget_alerts WHERE id = ?1 AND user_id = ?2",
            params![id, user],
        )?;
        Ok(())
    }
}

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        amount: decimal_at(row, 4)?,
        month: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<BudgetAlert> {
    Ok(BudgetAlert {
        id: row.get(0)?,
        user_id: row.get(1)?,
        budget_id: row.get(2)?,
        threshold: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
