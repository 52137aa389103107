mod budgets;
mod schema;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::auth::UserId;
use crate::error::Result;
use crate::models::*;

pub(crate) struct Database {
    conn: Connection,
}

/// Unique user columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UserField {
    Username,
    Email,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
        )?;
        let mut db = Self { conn };
        db.migrate()?;
        info!(path = %path.display(), "database ready");
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Run arbitrary SQL against the connection (fault injection in tests).
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// A fresh database gets the v1 schema and then every migration, so
    /// new and upgraded files end up with the same tables.
    fn migrate(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        let has_version_table: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        let current: i32 = if has_version_table {
            tx.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })?
        } else {
            tx.execute_batch(schema::SCHEMA_V1)?;
            tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
            info!("schema created");
            1
        };

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                debug!(from_version, "applying migration");
                tx.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            tx.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
            info!(from = current, to = schema::CURRENT_VERSION, "schema migrated");
        }
        tx.commit()?;
        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────

    pub(crate) fn insert_user(&self, user: &NewUser) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO users (username, email, phone, avatar, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![user.username, user.email, user.phone, user.avatar, now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, username, email, phone, avatar, created_at, updated_at
                 FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()?)
    }

    pub(crate) fn get_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, email, phone, avatar, created_at, updated_at
             FROM users ORDER BY id",
        )?;
        let rows = stmt.query_map([], user_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Whether another user already holds `username` or `email`.
    pub(crate) fn user_field_taken(
        &self,
        column: UserField,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let sql = match column {
            UserField::Username => {
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND (?2 IS NULL OR id != ?2))"
            }
            UserField::Email => {
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND (?2 IS NULL OR id != ?2))"
            }
        };
        Ok(self
            .conn
            .query_row(sql, params![value, exclude_id], |row| row.get(0))?)
    }

    pub(crate) fn update_user(&self, id: UserId, user: &NewUser) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET username = ?1, email = ?2, phone = ?3, avatar = ?4, updated_at = ?5
             WHERE id = ?6",
            params![user.username, user.email, user.phone, user.avatar, now(), id],
        )?;
        Ok(())
    }

    // ── Categories ────────────────────────────────────────────

    pub(crate) fn insert_category(&self, user: UserId, cat: &NewCategory) -> Result<i64> {
        let ts = now();
        self.conn.execute(
            "INSERT INTO categories (user_id, name, type, icon, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![user, cat.name, cat.kind, cat.icon, ts],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_category(&self, id: i64, user: UserId) -> Result<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, name, type, icon, created_at, updated_at
                 FROM categories WHERE id = ?1 AND user_id = ?2",
                params![id, user],
                category_from_row,
            )
            .optional()?)
    }

    pub(crate) fn get_categories(
        &self,
        user: UserId,
        kind: Option<EntryType>,
    ) -> Result<Vec<Category>> {
        let (sql, kind_param) = match kind {
            Some(k) => (
                "SELECT id, user_id, name, type, icon, created_at, updated_at
                 FROM categories WHERE user_id = ?1 AND type = ?2 ORDER BY name",
                Some(k),
            ),
            None => (
                "SELECT id, user_id, name, type, icon, created_at, updated_at
                 FROM categories WHERE user_id = ?1 ORDER BY type, name",
                None,
            ),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match kind_param {
            Some(k) => stmt.query_map(params![user, k], category_from_row)?,
            None => stmt.query_map(params![user], category_from_row)?,
        };
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn category_name_taken(
        &self,
        user: UserId,
        name: &str,
        kind: EntryType,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories
                           WHERE user_id = ?1 AND name = ?2 AND type = ?3
                             AND (?4 IS NULL OR id != ?4))",
            params![user, name, kind, exclude_id],
            |row| row.get(0),
        )?)
    }

    pub(crate) fn update_category(&self, id: i64, user: UserId, cat: &NewCategory) -> Result<()> {
        self.conn.execute(
            "UPDATE categories SET name = ?1, type = ?2, icon = ?3, updated_at = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![cat.name, cat.kind, cat.icon, now(), id, user],
        )?;
        Ok(())
    }

    /// Number of bills and budgets pointing at a category.
    pub(crate) fn count_category_references(&self, id: i64) -> Result<(i64, i64)> {
        let bills: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bills WHERE category_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let budgets: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM budgets WHERE category_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok((bills, budgets))
    }

    pub(crate) fn delete_category(&self, id: i64, user: UserId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
            params![id, user],
        )?;
        Ok(())
    }

    // ── Bills ─────────────────────────────────────────────────

    pub(crate) fn insert_bill(&self, user: UserId, bill: &NewBill) -> Result<i64> {
        let ts = now();
        self.conn.execute(
            "INSERT INTO bills (user_id, category_id, amount, type, date, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                user,
                bill.category_id,
                bill.amount.to_string(),
                bill.kind,
                bill.date,
                bill.description,
                ts,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_bill(&self, id: i64, user: UserId) -> Result<Option<Bill>> {
        Ok(self
            .conn
            .query_row(
                "SELECT b.id, b.user_id, b.category_id, b.amount, b.type, b.date,
                        b.description, b.created_at, b.updated_at, c.name
                 FROM bills b JOIN categories c ON b.category_id = c.id
                 WHERE b.id = ?1 AND b.user_id = ?2",
                params![id, user],
                bill_from_row,
            )
            .optional()?)
    }

    pub(crate) fn get_bills(&self, user: UserId, filter: &BillFilter) -> Result<BillPage> {
        let mut where_sql = String::from(" WHERE b.user_id = ?1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(user)];

        if let Some(start) = filter.start_date {
            where_sql.push_str(&format!(" AND b.date >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(start));
        }
        if let Some(end) = filter.end_date {
            where_sql.push_str(&format!(" AND b.date <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(end));
        }
        if let Some(kind) = filter.kind {
            where_sql.push_str(&format!(" AND b.type = ?{}", param_values.len() + 1));
            param_values.push(Box::new(kind));
        }
        if let Some(cid) = filter.category_id {
            where_sql.push_str(&format!(" AND b.category_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(cid));
        }
        if let Some(min) = filter.min_amount {
            where_sql.push_str(&format!(
                " AND CAST(b.amount AS REAL) >= CAST(?{} AS REAL)",
                param_values.len() + 1
            ));
            param_values.push(Box::new(min.to_string()));
        }
        if let Some(max) = filter.max_amount {
            where_sql.push_str(&format!(
                " AND CAST(b.amount AS REAL) <= CAST(?{} AS REAL)",
                param_values.len() + 1
            ));
            param_values.push(Box::new(max.to_string()));
        }

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM bills b{where_sql}"),
            params_ref.as_slice(),
            |row| row.get(0),
        )?;

        let mut sql = format!(
            "SELECT b.id, b.user_id, b.category_id, b.amount, b.type, b.date,
                    b.description, b.created_at, b.updated_at, c.name
             FROM bills b JOIN categories c ON b.category_id = c.id{where_sql}
             ORDER BY b.date DESC, b.id DESC"
        );
        if let (Some(page), Some(size)) = (filter.page, filter.page_size) {
            if page > 0 && size > 0 {
                let offset = u64::from(page - 1) * u64::from(size);
                sql.push_str(&format!(" LIMIT {size} OFFSET {offset}"));
            }
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), bill_from_row)?;
        let bills = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(BillPage { bills, total })
    }

    /// Every bill of the user dated within `month`, oldest first.
    pub(crate) fn get_month_bills(&self, user: UserId, month: Month) -> Result<Vec<Bill>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.user_id, b.category_id, b.amount, b.type, b.date,
                    b.description, b.created_at, b.updated_at, c.name
             FROM bills b JOIN categories c ON b.category_id = c.id
             WHERE b.user_id = ?1 AND b.date BETWEEN ?2 AND ?3
             ORDER BY b.date, b.id",
        )?;
        let rows = stmt.query_map(
            params![user, month.first_day(), month.last_day()],
            bill_from_row,
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn update_bill(&self, id: i64, user: UserId, bill: &NewBill) -> Result<()> {
        self.conn.execute(
            "UPDATE bills SET category_id = ?1, amount = ?2, type = ?3, date = ?4,
                              description = ?5, updated_at = ?6
             WHERE id = ?7 AND user_id = ?8",
            params![
                bill.category_id,
                bill.amount.to_string(),
                bill.kind,
                bill.date,
                bill.description,
                now(),
                id,
                user,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn delete_bill(&self, id: i64, user: UserId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM bills WHERE id = ?1 AND user_id = ?2",
            params![id, user],
        )?;
        Ok(())
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Money is stored as TEXT to keep `Decimal` exact.
fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        avatar: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: row.get(3)?,
        icon: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn bill_from_row(row: &Row<'_>) -> rusqlite::Result<Bill> {
    Ok(Bill {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        amount: decimal_at(row, 3)?,
        kind: row.get(4)?,
        date: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        category_name: row.get(9)?,
    })
}

#[cfg(test)]
mod tests;
