#![allow(clippy::unwrap_used)]

use super::*;
use crate::engine::BudgetStore;
use crate::error::Error;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn month(s: &str) -> Month {
    Month::parse(s).unwrap()
}

fn new_user(db: &Database, name: &str) -> UserId {
    UserId::from_raw(db.insert_user(&NewUser::named(name)).unwrap())
}

fn new_category(db: &Database, user: UserId, name: &str, kind: EntryType) -> i64 {
    db.insert_category(user, &NewCategory::new(name, kind)).unwrap()
}

fn bill(category_id: i64, amount: Decimal, kind: EntryType, date: NaiveDate) -> NewBill {
    NewBill {
        category_id,
        amount,
        kind,
        date,
        description: String::new(),
    }
}

struct Fixture {
    user: UserId,
    food: i64,
    rent: i64,
    salary: i64,
}

fn setup_test_data(db: &Database) -> Fixture {
    let user = new_user(db, "alice");
    let food = new_category(db, user, "Food", EntryType::Expense);
    let rent = new_category(db, user, "Rent", EntryType::Expense);
    let salary = new_category(db, user, "Salary", EntryType::Income);

    let bills = [
        bill(food, dec!(12.50), EntryType::Expense, ymd(2024, 3, 1)),
        bill(food, dec!(40.25), EntryType::Expense, ymd(2024, 3, 15)),
        bill(food, dec!(7.25), EntryType::Expense, ymd(2024, 3, 31)),
        bill(food, dec!(99.00), EntryType::Expense, ymd(2024, 4, 1)),
        bill(food, dec!(5.00), EntryType::Expense, ymd(2024, 2, 29)),
        bill(rent, dec!(900.00), EntryType::Expense, ymd(2024, 3, 2)),
        bill(salary, dec!(3000.00), EntryType::Income, ymd(2024, 3, 25)),
    ];
    for b in &bills {
        db.insert_bill(user, b).unwrap();
    }

    Fixture {
        user,
        food,
        rent,
        salary,
    }
}

// ── Schema migration ──────────────────────────────────────────

#[test]
fn test_schema_version_set() {
    let db = Database::open_in_memory().unwrap();
    let version: i32 = db
        .conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(version, schema::CURRENT_VERSION);
}

#[test]
fn test_double_migrate_idempotent() {
    let mut db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    let version: i32 = db
        .conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(version, schema::CURRENT_VERSION);
}

#[test]
fn test_upgrade_from_v1_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("walletwise.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(schema::SCHEMA_V1).unwrap();
        conn.execute_batch(
            "INSERT INTO schema_version (version) VALUES (1);
             INSERT INTO users (username, created_at) VALUES ('alice', '2024-01-01T00:00:00Z');",
        )
        .unwrap();
    }

    let db = Database::open(&path).unwrap();
    let version: i32 = db
        .conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, schema::CURRENT_VERSION);

    let users = db.get_users().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "alice");
    assert!(users[0].email.is_none());
    assert_eq!(users[0].phone, "");
    assert_eq!(users[0].updated_at, "2024-01-01T00:00:00Z");

    // The migrated table enforces email uniqueness like a fresh one.
    let mut profile = NewUser::named("bobby");
    profile.email = Some("bob@example.com".into());
    db.insert_user(&profile).unwrap();
    profile.username = "carol".into();
    assert!(matches!(db.insert_user(&profile), Err(Error::Conflict(_))));
}

#[test]
fn test_reopen_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("walletwise.db");
    {
        let db = Database::open(&path).unwrap();
        db.insert_user(&NewUser::named("alice")).unwrap();
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(db.get_users().unwrap().len(), 1);
}

// ── Users ─────────────────────────────────────────────────────

#[test]
fn test_user_crud() {
    let db = Database::open_in_memory().unwrap();
    let id = db.insert_user(&NewUser::named("alice")).unwrap();
    let user = db.get_user(id).unwrap().unwrap();
    assert_eq!(user.username, "alice");
    assert!(db.get_user(99999).unwrap().is_none());
}

#[test]
fn test_update_user_row() {
    let db = Database::open_in_memory().unwrap();
    let id = db.insert_user(&NewUser::named("alice")).unwrap();
    let profile = NewUser {
        username: "alice".into(),
        email: Some("alice@example.com".into()),
        phone: "555-0100".into(),
        avatar: "a.png".into(),
    };
    db.update_user(UserId::from_raw(id), &profile).unwrap();
    let user = db.get_user(id).unwrap().unwrap();
    assert_eq!(user.email.as_deref(), Some("alice@example.com"));
    assert_eq!(user.phone, "555-0100");
    assert_eq!(user.avatar, "a.png");
}

#[test]
fn test_user_field_taken() {
    let db = Database::open_in_memory().unwrap();
    let mut profile = NewUser::named("alice");
    profile.email = Some("alice@example.com".into());
    let id = db.insert_user(&profile).unwrap();

    assert!(db.user_field_taken(UserField::Username, "alice", None).unwrap());
    assert!(db.user_field_taken(UserField::Email, "alice@example.com", None).unwrap());
    assert!(!db.user_field_taken(UserField::Username, "alice", Some(id)).unwrap());
    assert!(!db.user_field_taken(UserField::Email, "bob@example.com", None).unwrap());
}

#[test]
fn test_users_without_email_do_not_collide() {
    let db = Database::open_in_memory().unwrap();
    db.insert_user(&NewUser::named("alice")).unwrap();
    db.insert_user(&NewUser::named("bobby")).unwrap();
    assert_eq!(db.get_users().unwrap().len(), 2);
}

#[test]
fn test_duplicate_username_is_conflict() {
    let db = Database::open_in_memory().unwrap();
    db.insert_user(&NewUser::named("alice")).unwrap();
    assert!(matches!(db.insert_user(&NewUser::named("alice")), Err(Error::Conflict(_))));
}

// ── Categories ────────────────────────────────────────────────

#[test]
fn test_category_crud() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let id = new_category(&db, user, "Food", EntryType::Expense);

    let cat = db.get_category(id, user).unwrap().unwrap();
    assert_eq!(cat.name, "Food");
    assert_eq!(cat.kind, EntryType::Expense);

    let mut renamed = NewCategory::new("Groceries", EntryType::Expense);
    renamed.icon = "cart".into();
    db.update_category(id, user, &renamed).unwrap();
    let cat = db.get_category(id, user).unwrap().unwrap();
    assert_eq!(cat.name, "Groceries");
    assert_eq!(cat.icon, "cart");

    db.delete_category(id, user).unwrap();
    assert!(db.get_category(id, user).unwrap().is_none());
}

#[test]
fn test_category_scoped_to_user() {
    let db = Database::open_in_memory().unwrap();
    let alice = new_user(&db, "alice");
    let bob = new_user(&db, "bob");
    let id = new_category(&db, alice, "Food", EntryType::Expense);
    assert!(db.get_category(id, bob).unwrap().is_none());
    assert!(db.get_categories(bob, None).unwrap().is_empty());
}

#[test]
fn test_categories_sorted_by_type_then_name() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    new_category(&db, user, "Salary", EntryType::Income);
    new_category(&db, user, "Rent", EntryType::Expense);
    new_category(&db, user, "Food", EntryType::Expense);

    let names: Vec<String> = db
        .get_categories(user, None)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Food", "Rent", "Salary"]);

    let income = db.get_categories(user, Some(EntryType::Income)).unwrap();
    assert_eq!(income.len(), 1);
    assert_eq!(income[0].name, "Salary");
}

#[test]
fn test_category_name_unique_per_type() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let id = new_category(&db, user, "Other", EntryType::Expense);
    // Same name, other type is fine.
    new_category(&db, user, "Other", EntryType::Income);

    assert!(db
        .category_name_taken(user, "Other", EntryType::Expense, None)
        .unwrap());
    assert!(!db
        .category_name_taken(user, "Other", EntryType::Expense, Some(id))
        .unwrap());

    let dup = db.insert_category(user, &NewCategory::new("Other", EntryType::Expense));
    assert!(matches!(dup, Err(Error::Conflict(_))));
}

#[test]
fn test_category_references_counted() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    db.insert_budget(f.user, &NewBudget::for_category(f.food, dec!(100), month("2024-03")))
        .unwrap();
    assert_eq!(db.count_category_references(f.food).unwrap(), (5, 1));
    assert_eq!(db.count_category_references(f.salary).unwrap(), (1, 0));
}

// ── Bills ─────────────────────────────────────────────────────

#[test]
fn test_bill_insert_and_get() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let food = new_category(&db, user, "Food", EntryType::Expense);
    let mut b = bill(food, dec!(4.50), EntryType::Expense, ymd(2024, 1, 15));
    b.description = "coffee".into();
    let id = db.insert_bill(user, &b).unwrap();

    let fetched = db.get_bill(id, user).unwrap().unwrap();
    assert_eq!(fetched.amount, dec!(4.50));
    assert_eq!(fetched.date, ymd(2024, 1, 15));
    assert_eq!(fetched.category_name, "Food");
    assert_eq!(fetched.description, "coffee");
    assert!(fetched.is_expense());
    assert_eq!(fetched.signed_amount(), dec!(-4.50));
}

#[test]
fn test_bill_update_and_delete() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let id = db
        .insert_bill(f.user, &bill(f.food, dec!(10), EntryType::Expense, ymd(2024, 5, 5)))
        .unwrap();

    db.update_bill(id, f.user, &bill(f.rent, dec!(11), EntryType::Expense, ymd(2024, 5, 6)))
        .unwrap();
    let updated = db.get_bill(id, f.user).unwrap().unwrap();
    assert_eq!(updated.category_id, f.rent);
    assert_eq!(updated.amount, dec!(11));
    assert_eq!(updated.date, ymd(2024, 5, 6));

    db.delete_bill(id, f.user).unwrap();
    assert!(db.get_bill(id, f.user).unwrap().is_none());
}

#[test]
fn test_bills_ordered_newest_first() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let page = db.get_bills(f.user, &BillFilter::default()).unwrap();
    assert_eq!(page.total, 7);
    let dates: Vec<NaiveDate> = page.bills.iter().map(|b| b.date).collect();
    let mut sorted = dates.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(dates, sorted);
}

#[test]
fn test_bills_date_range_filter() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let filter = BillFilter {
        start_date: Some(ymd(2024, 3, 1)),
        end_date: Some(ymd(2024, 3, 31)),
        ..Default::default()
    };
    let page = db.get_bills(f.user, &filter).unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.bills.len(), 5);
}

#[test]
fn test_bills_combined_filters() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let filter = BillFilter {
        kind: Some(EntryType::Expense),
        category_id: Some(f.food),
        min_amount: Some(dec!(10)),
        max_amount: Some(dec!(50)),
        ..Default::default()
    };
    let page = db.get_bills(f.user, &filter).unwrap();
    let amounts: Vec<Decimal> = page.bills.iter().map(|b| b.amount).collect();
    assert_eq!(amounts, vec![dec!(40.25), dec!(12.50)]);
}

#[test]
fn test_bills_pagination_keeps_total() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let first = db
        .get_bills(
            f.user,
            &BillFilter {
                page: Some(1),
                page_size: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
    let third = db
        .get_bills(
            f.user,
            &BillFilter {
                page: Some(3),
                page_size: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(first.total, 7);
    assert_eq!(first.bills.len(), 3);
    assert_eq!(third.total, 7);
    assert_eq!(third.bills.len(), 1);
}

#[test]
fn test_bills_scoped_to_user() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let bob = new_user(&db, "bob");
    assert_eq!(db.get_bills(bob, &BillFilter::default()).unwrap().total, 0);
    let id = db.get_bills(f.user, &BillFilter::default()).unwrap().bills[0].id;
    assert!(db.get_bill(id, bob).unwrap().is_none());
}

#[test]
fn test_month_bills_inclusive_bounds() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let bills = db.get_month_bills(f.user, month("2024-03")).unwrap();
    assert_eq!(bills.len(), 5);
    assert_eq!(bills.first().unwrap().date, ymd(2024, 3, 1));
    assert_eq!(bills.last().unwrap().date, ymd(2024, 3, 31));
}

#[test]
fn test_decimal_precision_preserved() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let food = new_category(&db, user, "Food", EntryType::Expense);
    for _ in 0..10 {
        db.insert_bill(user, &bill(food, dec!(0.10), EntryType::Expense, ymd(2024, 3, 3)))
            .unwrap();
    }
    db.insert_bill(user, &bill(food, dec!(0.20), EntryType::Expense, ymd(2024, 3, 4)))
        .unwrap();
    let total = db
        .sum_expense_bills(user, Some(food), ymd(2024, 3, 1), ymd(2024, 3, 31))
        .unwrap();
    assert_eq!(total, dec!(1.20));
}

// ── Expense sums ──────────────────────────────────────────────

#[test]
fn test_sum_expense_bills_by_category() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let m = month("2024-03");
    let food = db
        .sum_expense_bills(f.user, Some(f.food), m.first_day(), m.last_day())
        .unwrap();
    assert_eq!(food, dec!(60.00));
}

#[test]
fn test_sum_expense_bills_total_excludes_income() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let m = month("2024-03");
    let total = db
        .sum_expense_bills(f.user, None, m.first_day(), m.last_day())
        .unwrap();
    assert_eq!(total, dec!(960.00));
}

#[test]
fn test_sum_expense_bills_overflow_is_error() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let food = new_category(&db, user, "Food", EntryType::Expense);
    let huge = Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0);
    db.insert_bill(user, &bill(food, huge, EntryType::Expense, ymd(2024, 3, 1)))
        .unwrap();
    db.insert_bill(user, &bill(food, huge, EntryType::Expense, ymd(2024, 3, 2)))
        .unwrap();

    let result = db.sum_expense_bills(user, None, ymd(2024, 3, 1), ymd(2024, 3, 31));
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn test_sum_expense_bills_other_user() {
    let db = Database::open_in_memory().unwrap();
    setup_test_data(&db);
    let bob = new_user(&db, "bob");
    let m = month("2024-03");
    let total = db
        .sum_expense_bills(bob, None, m.first_day(), m.last_day())
        .unwrap();
    assert_eq!(total, Decimal::ZERO);
}

// ── Budgets ───────────────────────────────────────────────────

#[test]
fn test_budget_crud() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let id = db
        .insert_budget(f.user, &NewBudget::for_category(f.food, dec!(500), month("2024-03")))
        .unwrap();

    let budget = db.find_budget(id, f.user).unwrap().unwrap();
    assert_eq!(budget.amount, dec!(500));
    assert_eq!(budget.category_name.as_deref(), Some("Food"));
    assert_eq!(budget.month, month("2024-03"));
    assert!(!budget.is_total());

    db.update_budget(id, f.user, &NewBudget::total(dec!(600), month("2024-04")))
        .unwrap();
    let budget = db.find_budget(id, f.user).unwrap().unwrap();
    assert!(budget.is_total());
    assert_eq!(budget.category_name, None);
    assert_eq!(budget.amount, dec!(600));
    assert_eq!(budget.month, month("2024-04"));
}

#[test]
fn test_budgets_listed_total_first() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let m = month("2024-03");
    db.insert_budget(f.user, &NewBudget::for_category(f.rent, dec!(1000), m))
        .unwrap();
    db.insert_budget(f.user, &NewBudget::for_category(f.food, dec!(300), m))
        .unwrap();
    db.insert_budget(f.user, &NewBudget::total(dec!(2000), m)).unwrap();
    db.insert_budget(f.user, &NewBudget::total(dec!(2000), month("2024-04")))
        .unwrap();

    let budgets = db.list_budgets(f.user, m).unwrap();
    assert_eq!(budgets.len(), 3);
    assert!(budgets[0].is_total());
    assert_eq!(budgets[1].category_name.as_deref(), Some("Food"));
    assert_eq!(budgets[2].category_name.as_deref(), Some("Rent"));
}

#[test]
fn test_budget_slot_count() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let m = month("2024-03");
    let cat_id = db
        .insert_budget(f.user, &NewBudget::for_category(f.food, dec!(300), m))
        .unwrap();
    let total_id = db.insert_budget(f.user, &NewBudget::total(dec!(2000), m)).unwrap();

    assert_eq!(db.count_budgets_in_slot(f.user, Some(f.food), m, None).unwrap(), 1);
    assert_eq!(db.count_budgets_in_slot(f.user, None, m, None).unwrap(), 1);
    assert_eq!(db.count_budgets_in_slot(f.user, Some(f.rent), m, None).unwrap(), 0);
    assert_eq!(
        db.count_budgets_in_slot(f.user, Some(f.food), m, Some(cat_id)).unwrap(),
        0
    );
    assert_eq!(
        db.count_budgets_in_slot(f.user, None, m, Some(total_id)).unwrap(),
        0
    );
    assert_eq!(
        db.count_budgets_in_slot(f.user, None, month("2024-04"), None).unwrap(),
        0
    );
}

#[test]
fn test_duplicate_category_budget_rejected_by_storage() {
    let db = Database::open_in_memory().unwrap();
    let f = setup_test_data(&db);
    let b = NewBudget::for_category(f.food, dec!(300), month("2024-03"));
    db.insert_budget(f.user, &b).unwrap();
    assert!(matches!(db.insert_budget(f.user, &b), Err(Error::Conflict(_))));
}

#[test]
fn test_duplicate_total_budget_rejected_by_storage() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let b = NewBudget::total(dec!(2000), month("2024-03"));
    db.insert_budget(user, &b).unwrap();
    assert!(matches!(db.insert_budget(user, &b), Err(Error::Conflict(_))));
    // Another user's total budget for the same month is its own slot.
    let bob = new_user(&db, "bob");
    db.insert_budget(bob, &b).unwrap();
}

#[test]
fn test_concurrent_writers_one_slot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("walletwise.db");
    let first = Database::open(&path).unwrap();
    let second = Database::open(&path).unwrap();
    let user = UserId::from_raw(first.insert_user(&NewUser::named("alice")).unwrap());
    let b = NewBudget::total(dec!(1500), month("2024-03"));

    // Both passed their pre-write check before either inserted.
    assert_eq!(first.count_budgets_in_slot(user, None, b.month, None).unwrap(), 0);
    assert_eq!(second.count_budgets_in_slot(user, None, b.month, None).unwrap(), 0);

    first.insert_budget(user, &b).unwrap();
    assert!(matches!(second.insert_budget(user, &b), Err(Error::Conflict(_))));
    assert_eq!(second.count_budgets_in_slot(user, None, b.month, None).unwrap(), 1);
}

// ── Alerts ────────────────────────────────────────────────────

fn budget_with_alerts(db: &Database, user: UserId, thresholds: &[i64]) -> (i64, Vec<i64>) {
    let budget_id = db
        .insert_budget(user, &NewBudget::total(dec!(1000), month("2024-03")))
        .unwrap();
    let alert_ids = thresholds
        .iter()
        .map(|t| db.insert_alert(user, &NewAlert::new(budget_id, *t)).unwrap())
        .collect();
    (budget_id, alert_ids)
}

#[test]
fn test_alert_crud() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let (budget_id, ids) = budget_with_alerts(&db, user, &[80]);

    let alert = db.find_alert(ids[0], user).unwrap().unwrap();
    assert_eq!(alert.budget_id, budget_id);
    assert_eq!(alert.threshold, 80);
    assert!(alert.is_active);

    let mut changed = NewAlert::new(budget_id, 90);
    changed.is_active = false;
    db.update_alert(ids[0], user, &changed).unwrap();
    let alert = db.find_alert(ids[0], user).unwrap().unwrap();
    assert_eq!(alert.threshold, 90);
    assert!(!alert.is_active);

    db.delete_alert(ids[0], user).unwrap();
    assert!(db.find_alert(ids[0], user).unwrap().is_none());
}

#[test]
fn test_alerts_ordered_by_threshold() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let (budget_id, _) = budget_with_alerts(&db, user, &[90, 50, 75]);
    let thresholds: Vec<i64> = db
        .list_alerts(user, Some(budget_id))
        .unwrap()
        .iter()
        .map(|a| a.threshold)
        .collect();
    assert_eq!(thresholds, vec![50, 75, 90]);
    assert!(db.list_alerts(user, Some(budget_id + 1)).unwrap().is_empty());
}

#[test]
fn test_duplicate_threshold_rejected_by_storage() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let (budget_id, ids) = budget_with_alerts(&db, user, &[80]);
    assert_eq!(db.count_alerts_with_threshold(budget_id, 80, None).unwrap(), 1);
    assert_eq!(
        db.count_alerts_with_threshold(budget_id, 80, Some(ids[0])).unwrap(),
        0
    );
    let dup = db.insert_alert(user, &NewAlert::new(budget_id, 80));
    assert!(matches!(dup, Err(Error::Conflict(_))));
}

#[test]
fn test_active_alerts_filtered_by_month_and_flag() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let march = db
        .insert_budget(user, &NewBudget::total(dec!(1000), month("2024-03")))
        .unwrap();
    let april = db
        .insert_budget(user, &NewBudget::total(dec!(1000), month("2024-04")))
        .unwrap();
    let active = db.insert_alert(user, &NewAlert::new(march, 50)).unwrap();
    let mut inactive = NewAlert::new(march, 60);
    inactive.is_active = false;
    db.insert_alert(user, &inactive).unwrap();
    db.insert_alert(user, &NewAlert::new(april, 50)).unwrap();

    let alerts = db.list_active_alerts(user, month("2024-03")).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, active);
}

// ── Cascade delete ────────────────────────────────────────────

#[test]
fn test_delete_budget_cascades_alerts() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let (budget_id, ids) = budget_with_alerts(&db, user, &[50, 80, 100]);

    assert_eq!(db.delete_budget_cascade(budget_id, user).unwrap(), 3);
    assert!(db.find_budget(budget_id, user).unwrap().is_none());
    for id in ids {
        assert!(db.find_alert(id, user).unwrap().is_none());
    }
}

#[test]
fn test_delete_budget_rolls_back_when_budget_delete_fails() {
    let db = Database::open_in_memory().unwrap();
    let user = new_user(&db, "alice");
    let (budget_id, ids) = budget_with_alerts(&db, user, &[50, 80]);
    db.execute_raw(
        "CREATE TRIGGER block_budget_delete BEFORE DELETE ON budgets
         BEGIN SELECT RAISE(ABORT, 'blocked'); END;",
    )
    .unwrap();

    let result = db.delete_budget_cascade(budget_id, user);
    assert!(matches!(result, Err(Error::Persistence(_))));
    assert!(db.find_budget(budget_id, user).unwrap().is_some());
    for id in ids {
        assert!(db.find_alert(id, user).unwrap().is_some());
    }
}

#[test]
fn test_delete_foreign_budget_rolls_back() {
    let db = Database::open_in_memory().unwrap();
    let alice = new_user(&db, "alice");
    let bob = new_user(&db, "bob");
    let (budget_id, ids) = budget_with_alerts(&db, alice, &[50]);

    assert!(matches!(
        db.delete_budget_cascade(budget_id, bob),
        Err(Error::NotFound(_))
    ));
    assert!(db.find_alert(ids[0], alice).unwrap().is_some());
}
