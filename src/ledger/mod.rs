//! Categories, bills and monthly statistics.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::auth::UserId;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::*;

const MAX_CATEGORY_NAME: usize = 50;

pub(crate) struct Ledger<'a> {
    db: &'a Database,
}

impl<'a> Ledger<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // ── Categories ────────────────────────────────────────────

    pub(crate) fn create_category(&self, user: UserId, new: &NewCategory) -> Result<Category> {
        let new = normalize_category(new)?;
        if self.db.category_name_taken(user, &new.name, new.kind, None)? {
            return Err(Error::conflict(format!(
                "{} category '{}' already exists",
                new.kind, new.name
            )));
        }
        let id = self.db.insert_category(user, &new)?;
        info!(user = %user, category_id = id, name = %new.name, "category created");
        self.get_category(user, id)
    }

    pub(crate) fn update_category(
        &self,
        user: UserId,
        id: i64,
        new: &NewCategory,
    ) -> Result<Category> {
        let existing = self.get_category(user, id)?;
        let new = normalize_category(new)?;
        // Bills carry their category's type and budgets need an expense
        // category, so the type is frozen once anything points here.
        if new.kind != existing.kind {
            let (bills, budgets) = self.db.count_category_references(id)?;
            if bills > 0 || budgets > 0 {
                return Err(Error::conflict(format!(
                    "category {id} cannot change type while used by {bills} bill(s) and {budgets} budget(s)"
                )));
            }
        }
        if self.db.category_name_taken(user, &new.name, new.kind, Some(id))? {
            return Err(Error::conflict(format!(
                "{} category '{}' already exists",
                new.kind, new.name
            )));
        }
        self.db.update_category(id, user, &new)?;
        info!(user = %user, category_id = id, "category updated");
        self.get_category(user, id)
    }

    pub(crate) fn get_category(&self, user: UserId, id: i64) -> Result<Category> {
        self.db
            .get_category(id, user)?
            .ok_or_else(|| Error::not_found(format!("category {id}")))
    }

    pub(crate) fn list_categories(
        &self,
        user: UserId,
        kind: Option<EntryType>,
    ) -> Result<Vec<Category>> {
        self.db.get_categories(user, kind)
    }

    /// Only categories nothing points at can go.
    pub(crate) fn delete_category(&self, user: UserId, id: i64) -> Result<()> {
        self.get_category(user, id)?;
        let (bills, budgets) = self.db.count_category_references(id)?;
        if bills > 0 {
            return Err(Error::conflict(format!(
                "category {id} is used by {bills} bill(s)"
            )));
        }
        if budgets > 0 {
            return Err(Error::conflict(format!(
                "category {id} has {budgets} budget(s)"
            )));
        }
        self.db.delete_category(id, user)?;
        info!(user = %user, category_id = id, "category deleted");
        Ok(())
    }

    // ── Bills ─────────────────────────────────────────────────

    pub(crate) fn create_bill(&self, user: UserId, new: &NewBill) -> Result<Bill> {
        self.validate_bill(user, new)?;
        let id = self.db.insert_bill(user, new)?;
        info!(user = %user, bill_id = id, amount = %new.amount, kind = %new.kind, "bill created");
        self.get_bill(user, id)
    }

    pub(crate) fn update_bill(&self, user: UserId, id: i64, new: &NewBill) -> Result<Bill> {
        self.get_bill(user, id)?;
        self.validate_bill(user, new)?;
        self.db.update_bill(id, user, new)?;
        info!(user = %user, bill_id = id, "bill updated");
        self.get_bill(user, id)
    }

    pub(crate) fn get_bill(&self, user: UserId, id: i64) -> Result<Bill> {
        self.db
            .get_bill(id, user)?
            .ok_or_else(|| Error::not_found(format!("bill {id}")))
    }

    pub(crate) fn list_bills(&self, user: UserId, filter: &BillFilter) -> Result<BillPage> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(Error::validation(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (filter.min_amount, filter.max_amount) {
            if min > max {
                return Err(Error::validation(format!(
                    "minimum amount {min} exceeds maximum {max}"
                )));
            }
        }
        self.db.get_bills(user, filter)
    }

    pub(crate) fn delete_bill(&self, user: UserId, id: i64) -> Result<()> {
        self.get_bill(user, id)?;
        self.db.delete_bill(id, user)?;
        info!(user = %user, bill_id = id, "bill deleted");
        Ok(())
    }

    fn validate_bill(&self, user: UserId, new: &NewBill) -> Result<()> {
        check_amount("bill", new.amount)?;
        let category = self.db.get_category(new.category_id, user)?.ok_or_else(|| {
            Error::validation(format!("category {} does not exist", new.category_id))
        })?;
        if category.kind != new.kind {
            return Err(Error::validation(format!(
                "bill type {} does not match {} category '{}'",
                new.kind, category.kind, category.name
            )));
        }
        Ok(())
    }

    // ── Statistics ────────────────────────────────────────────

    /// Income, expense and balance for a month, broken down by category
    /// (largest first) and by day.
    pub(crate) fn monthly_stats(&self, user: UserId, month: Month) -> Result<MonthlyStats> {
        let bills = self.db.get_month_bills(user, month)?;
        let icons: HashMap<i64, String> = self
            .db
            .get_categories(user, None)?
            .into_iter()
            .map(|c| (c.id, c.icon))
            .collect();
        summarize(month, &bills, &icons)
    }
}

fn normalize_category(new: &NewCategory) -> Result<NewCategory> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::validation("category name must not be empty"));
    }
    if name.chars().count() > MAX_CATEGORY_NAME {
        return Err(Error::validation(format!(
            "category name must be at most {MAX_CATEGORY_NAME} characters"
        )));
    }
    Ok(NewCategory {
        name: name.to_string(),
        kind: new.kind,
        icon: new.icon.trim().to_string(),
    })
}

fn summarize(month: Month, bills: &[Bill], icons: &HashMap<i64, String>) -> Result<MonthlyStats> {
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    let mut by_category: HashMap<i64, CategoryTotal> = HashMap::new();
    let mut by_day: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();

    for bill in bills {
        let day = by_day.entry(bill.date).or_default();
        if bill.is_expense() {
            total_expense = add_amounts(total_expense, bill.amount)?;
            day.1 = add_amounts(day.1, bill.amount)?;
        } else {
            total_income = add_amounts(total_income, bill.amount)?;
            day.0 = add_amounts(day.0, bill.amount)?;
        }
        let entry = by_category
            .entry(bill.category_id)
            .or_insert_with(|| CategoryTotal {
                category_id: bill.category_id,
                name: bill.category_name.clone(),
                kind: bill.kind,
                icon: icons.get(&bill.category_id).cloned().unwrap_or_default(),
                total: Decimal::ZERO,
            });
        entry.total = add_amounts(entry.total, bill.amount)?;
    }

    let mut categories: Vec<CategoryTotal> = by_category.into_values().collect();
    categories.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

    let daily = by_day
        .into_iter()
        .map(|(date, (income, expense))| {
            Ok(DailyTotal {
                date,
                income,
                expense,
                balance: sub_amounts(income, expense)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MonthlyStats {
        month,
        total_income,
        total_expense,
        balance: sub_amounts(total_income, total_expense)?,
        categories,
        daily,
    })
}
