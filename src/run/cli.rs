use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::slice;

use super::Session;
use crate::auth;
use crate::db::Database;
use crate::engine::BudgetEngine;
use crate::error::{self, Error};
use crate::ledger::Ledger;
use crate::models::*;

pub(crate) fn as_cli(args: &[String], db: &Database, default_user: Option<String>) -> Result<()> {
    let (session, args) = Session::new(db, args, default_user);
    let Some(command) = args.get(1) else {
        print_usage();
        return Ok(());
    };
    let rest = &args[2..];
    match command.as_str() {
        "user" => cli_user(rest, &session),
        "category" => cli_category(rest, &session),
        "bill" => cli_bill(rest, &session),
        "budget" => cli_budget(rest, &session),
        "alert" => cli_alert(rest, &session),
        "stats" | "s" => cli_stats(rest, &session),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("walletwise {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("WalletWise - personal finance tracking with budgets and alerts");
    println!();
    println!("Usage: walletwise [--user <id>] [--json] <command>");
    println!();
    println!("Commands:");
    println!("  user add <name> [--email <e>] [--phone <p>] [--avatar <url>]");
    println!("  user update [--username <n>] [--email <e>] [--phone <p>] [--avatar <url>]");
    println!("  user show | list");
    println!("  category add --name <n> --type <income|expense> [--icon <i>]");
    println!("  category update <id> [--name <n>] [--type <t>] [--icon <i>]");
    println!("  category delete <id> | show <id> | list [--type <t>]");
    println!("  bill add --category <id> --amount <a> [--type <t>] [--date <YYYY-MM-DD>]");
    println!("           [--description <d>]");
    println!("  bill update <id> [--category <id>] [--amount <a>] [--type <t>] [--date <d>]");
    println!("           [--description <d>]");
    println!("  bill delete <id> | show <id>");
    println!("  bill list [--from <d>] [--to <d>] [--type <t>] [--category <id>]");
    println!("            [--min <a>] [--max <a>] [--page <n>] [--page-size <n>]");
    println!("  budget add --amount <a> [--category <id>] [--month <YYYY-MM>]");
    println!("  budget update <id> [--amount <a>] [--category <id> | --total] [--month <m>]");
    println!("  budget delete <id> | show <id> | list [--month <YYYY-MM>]");
    println!("  alert add --budget <id> --threshold <1-100> [--inactive]");
    println!("  alert update <id> [--budget <id>] [--threshold <t>] [--active <bool>]");
    println!("  alert delete <id> | list [--budget <id>] | check");
    println!("  stats [YYYY-MM]               Monthly income, expense and balance");
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
    println!();
    println!("The acting user defaults to WALLETWISE_USER.");
}

fn subcommand<'a>(args: &'a [String], group: &str) -> Result<(&'a str, &'a [String])> {
    match args.split_first() {
        Some((sub, rest)) => Ok((sub.as_str(), rest)),
        None => anyhow::bail!("Usage: walletwise {group} <subcommand> (see --help)"),
    }
}

// ── Users ─────────────────────────────────────────────────────

fn cli_user(args: &[String], session: &Session<'_>) -> Result<()> {
    let db = session.db();
    match subcommand(args, "user")? {
        ("add", rest) => {
            let new = NewUser {
                username: positional(rest, "username")?.to_string(),
                email: flag(rest, "--email").map(str::to_string),
                phone: flag(rest, "--phone").unwrap_or_default().to_string(),
                avatar: flag(rest, "--avatar").unwrap_or_default().to_string(),
            };
            let user = auth::register_user(db, &new)?;
            session.emit(&user, |u| println!("Created user {} ({})", u.id, u.username))
        }
        ("update", rest) => {
            let id = session.user()?;
            let mut new = NewUser::from(&auth::get_user(db, id)?);
            if let Some(username) = flag(rest, "--username") {
                new.username = username.to_string();
            }
            // An empty --email clears it.
            if let Some(email) = flag(rest, "--email") {
                new.email = Some(email.to_string());
            }
            if let Some(phone) = flag(rest, "--phone") {
                new.phone = phone.to_string();
            }
            if let Some(avatar) = flag(rest, "--avatar") {
                new.avatar = avatar.to_string();
            }
            let user = auth::update_user(db, id, &new)?;
            session.emit(&user, |u| println!("Updated user {} ({})", u.id, u.username))
        }
        ("show", _) => {
            let user = auth::get_user(db, session.user()?)?;
            session.emit(&user, |u| print_users(slice::from_ref(u)))
        }
        ("list", _) => session.emit(&db.get_users()?, |users| print_users(users)),
        (other, _) => anyhow::bail!("Unknown user subcommand: {other}"),
    }
}

fn print_users(users: &[User]) {
    if users.is_empty() {
        println!("No users");
        return;
    }
    println!("{:<6} {:<24} {:<28} {:<16} Created", "ID", "Username", "Email", "Phone");
    println!("{}", "─".repeat(100));
    for u in users {
        println!(
            "{:<6} {:<24} {:<28} {:<16} {}",
            u.id,
            u.username,
            u.email.as_deref().unwrap_or("-"),
            u.phone,
            u.created_at
        );
    }
}

// ── Categories ────────────────────────────────────────────────

fn cli_category(args: &[String], session: &Session<'_>) -> Result<()> {
    let user = session.user()?;
    let ledger = Ledger::new(session.db());
    match subcommand(args, "category")? {
        ("add", rest) => {
            let mut new = NewCategory::new(
                required(rest, "--name")?,
                parse_kind(required(rest, "--type")?)?,
            );
            new.icon = flag(rest, "--icon").unwrap_or_default().to_string();
            let cat = ledger.create_category(user, &new)?;
            session.emit(&cat, |c| println!("Created {} category {} ({})", c.kind, c.id, c.name))
        }
        ("update", rest) => {
            let id = parse_id(positional(rest, "category id")?, "category id")?;
            let existing = ledger.get_category(user, id)?;
            let new = NewCategory {
                name: flag(rest, "--name").map_or(existing.name, str::to_string),
                kind: flag(rest, "--type").map(parse_kind).transpose()?.unwrap_or(existing.kind),
                icon: flag(rest, "--icon").map_or(existing.icon, str::to_string),
            };
            let cat = ledger.update_category(user, id, &new)?;
            session.emit(&cat, |c| println!("Updated category {} ({})", c.id, c.name))
        }
        ("delete", rest) => {
            let id = parse_id(positional(rest, "category id")?, "category id")?;
            ledger.delete_category(user, id)?;
            session.done(&format!("Deleted category {id}"));
            Ok(())
        }
        ("show", rest) => {
            let id = parse_id(positional(rest, "category id")?, "category id")?;
            let cat = ledger.get_category(user, id)?;
            session.emit(&cat, |c| print_categories(slice::from_ref(c)))
        }
        ("list", rest) => {
            let kind = flag(rest, "--type").map(parse_kind).transpose()?;
            let cats = ledger.list_categories(user, kind)?;
            session.emit(&cats, |c| print_categories(c))
        }
        (other, _) => anyhow::bail!("Unknown category subcommand: {other}"),
    }
}

fn print_categories(cats: &[Category]) {
    if cats.is_empty() {
        println!("No categories");
        return;
    }
    println!("{:<6} {:<24} {:<8} Icon", "ID", "Name", "Type");
    println!("{}", "─".repeat(50));
    for c in cats {
        println!("{:<6} {:<24} {:<8} {}", c.id, c.name, c.kind, c.icon);
    }
}

// ── Bills ─────────────────────────────────────────────────────

fn cli_bill(args: &[String], session: &Session<'_>) -> Result<()> {
    let user = session.user()?;
    let ledger = Ledger::new(session.db());
    match subcommand(args, "bill")? {
        ("add", rest) => {
            let category_id = parse_id(required(rest, "--category")?, "--category")?;
            let category = ledger.get_category(user, category_id).map_err(|e| match e {
                Error::NotFound(_) => {
                    Error::validation(format!("category {category_id} does not exist"))
                }
                other => other,
            })?;
            // The category decides the type unless one is given.
            let kind = flag(rest, "--type")
                .map(parse_kind)
                .transpose()?
                .unwrap_or(category.kind);
            let new = NewBill {
                category_id,
                amount: parse_amount(required(rest, "--amount")?)?,
                kind,
                date: match flag(rest, "--date") {
                    Some(raw) => parse_date(raw)?,
                    None => chrono::Local::now().date_naive(),
                },
                description: flag(rest, "--description").unwrap_or_default().to_string(),
            };
            let bill = ledger.create_bill(user, &new)?;
            session.emit(&bill, |b| {
                println!("Created bill {} ({} {:.2} on {})", b.id, b.kind, b.amount, b.date)
            })
        }
        ("update", rest) => {
            let id = parse_id(positional(rest, "bill id")?, "bill id")?;
            let existing = ledger.get_bill(user, id)?;
            let new = NewBill {
                category_id: flag(rest, "--category")
                    .map(|raw| parse_id(raw, "--category"))
                    .transpose()?
                    .unwrap_or(existing.category_id),
                amount: flag(rest, "--amount")
                    .map(parse_amount)
                    .transpose()?
                    .unwrap_or(existing.amount),
                kind: flag(rest, "--type").map(parse_kind).transpose()?.unwrap_or(existing.kind),
                date: flag(rest, "--date").map(parse_date).transpose()?.unwrap_or(existing.date),
                description: flag(rest, "--description")
                    .map_or(existing.description, str::to_string),
            };
            let bill = ledger.update_bill(user, id, &new)?;
            session.emit(&bill, |b| println!("Updated bill {}", b.id))
        }
        ("delete", rest) => {
            let id = parse_id(positional(rest, "bill id")?, "bill id")?;
            ledger.delete_bill(user, id)?;
            session.done(&format!("Deleted bill {id}"));
            Ok(())
        }
        ("show", rest) => {
            let id = parse_id(positional(rest, "bill id")?, "bill id")?;
            let bill = ledger.get_bill(user, id)?;
            session.emit(&bill, |b| print_bills(slice::from_ref(b)))
        }
        ("list", rest) => {
            let filter = BillFilter {
                start_date: flag(rest, "--from").map(parse_date).transpose()?,
                end_date: flag(rest, "--to").map(parse_date).transpose()?,
                kind: flag(rest, "--type").map(parse_kind).transpose()?,
                category_id: flag(rest, "--category")
                    .map(|raw| parse_id(raw, "--category"))
                    .transpose()?,
                min_amount: flag(rest, "--min").map(parse_amount).transpose()?,
                max_amount: flag(rest, "--max").map(parse_amount).transpose()?,
                page: flag(rest, "--page").map(|raw| parse_count(raw, "--page")).transpose()?,
                page_size: flag(rest, "--page-size")
                    .map(|raw| parse_count(raw, "--page-size"))
                    .transpose()?,
            };
            let page = ledger.list_bills(user, &filter)?;
            session.emit(&page, |p| {
                print_bills(&p.bills);
                if !p.bills.is_empty() {
                    println!("Showing {} of {} bills", p.bills.len(), p.total);
                }
            })
        }
        (other, _) => anyhow::bail!("Unknown bill subcommand: {other}"),
    }
}

fn print_bills(bills: &[Bill]) {
    if bills.is_empty() {
        println!("No bills");
        return;
    }
    println!(
        "{:<6} {:<12} {:<20} {:>12}  Description",
        "ID", "Date", "Category", "Amount"
    );
    println!("{}", "─".repeat(70));
    for b in bills {
        println!(
            "{:<6} {:<12} {:<20} {:>12.2}  {}",
            b.id,
            b.date.to_string(),
            b.category_name,
            b.signed_amount(),
            b.description
        );
    }
}

// ── Budgets ───────────────────────────────────────────────────

fn cli_budget(args: &[String], session: &Session<'_>) -> Result<()> {
    let user = session.user()?;
    let engine = BudgetEngine::new(session.db());
    match subcommand(args, "budget")? {
        ("add", rest) => {
            let amount = parse_amount(required(rest, "--amount")?)?;
            let month = month_flag(rest)?;
            let new = match flag(rest, "--category") {
                Some(raw) => NewBudget::for_category(parse_id(raw, "--category")?, amount, month),
                None => NewBudget::total(amount, month),
            };
            let budget = engine.create_budget(user, &new)?;
            session.emit(&budget, |b| {
                println!("Created budget {} for {}", b.budget.id, b.budget.month);
                print_budgets(slice::from_ref(b));
            })
        }
        ("update", rest) => {
            let id = parse_id(positional(rest, "budget id")?, "budget id")?;
            let existing = engine.get_budget(user, id)?.budget;
            let category_id = if has_flag(rest, "--total") {
                None
            } else {
                flag(rest, "--category")
                    .map(|raw| parse_id(raw, "--category"))
                    .transpose()?
                    .or(existing.category_id)
            };
            let new = NewBudget {
                category_id,
                amount: flag(rest, "--amount")
                    .map(parse_amount)
                    .transpose()?
                    .unwrap_or(existing.amount),
                month: flag(rest, "--month")
                    .map(parse_month)
                    .transpose()?
                    .unwrap_or(existing.month),
            };
            let budget = engine.update_budget(user, id, &new)?;
            session.emit(&budget, |b| print_budgets(slice::from_ref(b)))
        }
        ("delete", rest) => {
            let id = parse_id(positional(rest, "budget id")?, "budget id")?;
            let alerts = engine.delete_budget(user, id)?;
            session.done(&format!("Deleted budget {id} and {alerts} alert(s)"));
            Ok(())
        }
        ("show", rest) => {
            let id = parse_id(positional(rest, "budget id")?, "budget id")?;
            let budget = engine.get_budget(user, id)?;
            session.emit(&budget, |b| print_budgets(slice::from_ref(b)))
        }
        ("list", rest) => {
            let month = month_flag(rest)?;
            let budgets = engine.list_budgets(user, month)?;
            session.emit(&budgets, |b| {
                println!("Budgets for {month}");
                print_budgets(b);
            })
        }
        (other, _) => anyhow::bail!("Unknown budget subcommand: {other}"),
    }
}

fn print_budgets(budgets: &[BudgetWithUsage]) {
    if budgets.is_empty() {
        println!("No budgets");
        return;
    }
    println!(
        "{:<6} {:<20} {:>12} {:>12} {:>12} {:>8}",
        "ID", "Category", "Budget", "Spent", "Remaining", "Used"
    );
    println!("{}", "─".repeat(75));
    for b in budgets {
        let label = if b.budget.is_total() {
            "(total)".to_string()
        } else {
            b.budget.category_name.clone().unwrap_or_default()
        };
        println!(
            "{:<6} {:<20} {:>12.2} {:>12.2} {:>12.2} {:>7.1}%",
            b.budget.id,
            label,
            b.budget.amount,
            b.usage.used_amount,
            b.usage.remaining(b.budget.amount),
            b.usage.percentage,
        );
    }
}

// ── Alerts ────────────────────────────────────────────────────

fn cli_alert(args: &[String], session: &Session<'_>) -> Result<()> {
    let user = session.user()?;
    let engine = BudgetEngine::new(session.db());
    match subcommand(args, "alert")? {
        ("add", rest) => {
            let mut new = NewAlert::new(
                parse_id(required(rest, "--budget")?, "--budget")?,
                parse_threshold(required(rest, "--threshold")?)?,
            );
            new.is_active = !has_flag(rest, "--inactive");
            let alert = engine.create_alert(user, &new)?;
            session.emit(&alert, |a| {
                println!("Created alert {} at {}% of budget {}", a.id, a.threshold, a.budget_id)
            })
        }
        ("update", rest) => {
            let id = parse_id(positional(rest, "alert id")?, "alert id")?;
            let existing = engine.get_alert(user, id)?;
            let new = NewAlert {
                budget_id: flag(rest, "--budget")
                    .map(|raw| parse_id(raw, "--budget"))
                    .transpose()?
                    .unwrap_or(existing.budget_id),
                threshold: flag(rest, "--threshold")
                    .map(parse_threshold)
                    .transpose()?
                    .unwrap_or(existing.threshold),
                is_active: flag(rest, "--active")
                    .map(parse_bool)
                    .transpose()?
                    .unwrap_or(existing.is_active),
            };
            let alert = engine.update_alert(user, id, &new)?;
            session.emit(&alert, |a| print_alerts(slice::from_ref(a)))
        }
        ("delete", rest) => {
            let id = parse_id(positional(rest, "alert id")?, "alert id")?;
            engine.delete_alert(user, id)?;
            session.done(&format!("Deleted alert {id}"));
            Ok(())
        }
        ("list", rest) => {
            let budget_id = flag(rest, "--budget")
                .map(|raw| parse_id(raw, "--budget"))
                .transpose()?;
            let alerts = engine.list_alerts(user, budget_id)?;
            session.emit(&alerts, |a| print_alerts(a))
        }
        ("check", _) => {
            let triggered = engine.check_alerts(user)?;
            session.emit(&triggered, |t| print_triggered(t))
        }
        (other, _) => anyhow::bail!("Unknown alert subcommand: {other}"),
    }
}

fn print_alerts(alerts: &[BudgetAlert]) {
    if alerts.is_empty() {
        println!("No alerts");
        return;
    }
    println!("{:<6} {:<8} {:>10}  Active", "ID", "Budget", "Threshold");
    println!("{}", "─".repeat(36));
    for a in alerts {
        println!(
            "{:<6} {:<8} {:>9}%  {}",
            a.id,
            a.budget_id,
            a.threshold,
            if a.is_active { "yes" } else { "no" }
        );
    }
}

fn print_triggered(alerts: &[TriggeredAlert]) {
    if alerts.is_empty() {
        println!("No alerts triggered");
        return;
    }
    for alert in alerts {
        let r = alert.reading();
        let target = match alert {
            TriggeredAlert::Category { category_name, .. } => format!(" '{category_name}'"),
            TriggeredAlert::Total { .. } => String::new(),
        };
        println!(
            "Alert {}: {}{target} budget {} at {:.1}% (threshold {}%), spent {:.2} of {:.2}",
            r.alert_id,
            alert.budget_type(),
            r.budget_id,
            r.used_percent,
            r.threshold,
            r.used_amount,
            r.budget_amount
        );
    }
}

// ── Statistics ────────────────────────────────────────────────

fn cli_stats(args: &[String], session: &Session<'_>) -> Result<()> {
    let user = session.user()?;
    let month = match args.first().filter(|a| !a.starts_with('-')) {
        Some(raw) => parse_month(raw)?,
        None => Month::current(),
    };
    let stats = Ledger::new(session.db()).monthly_stats(user, month)?;
    session.emit(&stats, |s| {
        println!("WalletWise - {}", s.month);
        println!("{}", "─".repeat(40));
        println!("  Income:     {:.2}", s.total_income);
        println!("  Expenses:   {:.2}", s.total_expense);
        println!("  Balance:    {:.2}", s.balance);

        if !s.categories.is_empty() {
            println!();
            println!("By Category:");
            for c in &s.categories {
                println!("  {:<24} {:<8} {:.2}", c.name, c.kind, c.total);
            }
        }
        if !s.daily.is_empty() {
            println!();
            println!("By Day:");
            for d in &s.daily {
                println!(
                    "  {}  +{:<10.2} -{:<10.2} {:.2}",
                    d.date, d.income, d.expense, d.balance
                );
            }
        }
    })
}

// ── Argument parsing ──────────────────────────────────────────

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn required<'a>(args: &'a [String], name: &str) -> error::Result<&'a str> {
    flag(args, name).ok_or_else(|| Error::validation(format!("missing {name}")))
}

fn positional<'a>(args: &'a [String], what: &str) -> error::Result<&'a str> {
    args.first()
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .ok_or_else(|| Error::validation(format!("missing {what}")))
}

fn parse_id(raw: &str, what: &str) -> error::Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::validation(format!("{what} must be a number, got '{raw}'")))
}

fn parse_count(raw: &str, what: &str) -> error::Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| Error::validation(format!("{what} must be a positive number, got '{raw}'")))
}

fn parse_amount(raw: &str) -> error::Result<Decimal> {
    raw.trim()
        .parse()
        .map_err(|_| Error::validation(format!("invalid amount '{raw}'")))
}

fn parse_date(raw: &str) -> error::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| Error::validation(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

fn parse_month(raw: &str) -> error::Result<Month> {
    Month::parse(raw)
        .ok_or_else(|| Error::validation(format!("invalid month '{raw}', expected YYYY-MM")))
}

fn month_flag(args: &[String]) -> error::Result<Month> {
    Ok(flag(args, "--month")
        .map(parse_month)
        .transpose()?
        .unwrap_or_else(Month::current))
}

fn parse_kind(raw: &str) -> error::Result<EntryType> {
    EntryType::parse(raw).ok_or_else(|| {
        let valid: Vec<&str> = EntryType::all().iter().map(|k| k.as_str()).collect();
        Error::validation(format!(
            "invalid type '{raw}', expected one of: {}",
            valid.join(", ")
        ))
    })
}

fn parse_threshold(raw: &str) -> error::Result<i64> {
    raw.trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| Error::validation(format!("threshold must be a whole number, got '{raw}'")))
}

fn parse_bool(raw: &str) -> error::Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::validation(format!("expected true or false, got '{raw}'"))),
    }
}
