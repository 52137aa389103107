//! Command-line front end: global flags, identity and output.

mod cli;

use anyhow::Result;
use serde::Serialize;

use crate::auth::{self, UserId};
use crate::db::Database;

pub(crate) use cli::as_cli;

/// What a single invocation runs with, after the leading `--user` and
/// `--json` have been taken out of the argument list.
pub(crate) struct Session<'a> {
    db: &'a Database,
    user: Option<String>,
    json: bool,
}

impl<'a> Session<'a> {
    /// Global flags are only read between the program name and the
    /// command; after that they belong to the command.
    pub(crate) fn new(
        db: &'a Database,
        args: &[String],
        default_user: Option<String>,
    ) -> (Self, Vec<String>) {
        let mut user = default_user;
        let mut json = false;
        let mut rest = Vec::with_capacity(args.len());
        let mut iter = args.iter();
        rest.extend(iter.next().cloned());
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--json" => json = true,
                "--user" => user = iter.next().cloned(),
                _ => {
                    rest.push(arg.clone());
                    break;
                }
            }
        }
        rest.extend(iter.cloned());
        (Self { db, user, json }, rest)
    }

    pub(crate) fn db(&self) -> &'a Database {
        self.db
    }

    /// The acting user. Fails with `Unauthorized` when none was given.
    pub(crate) fn user(&self) -> crate::error::Result<UserId> {
        auth::resolve_user(self.db, self.user.as_deref())
    }

    /// Print `value` as JSON with `--json`, otherwise through `table`.
    pub(crate) fn emit<T: Serialize>(&self, value: &T, table: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            table(value);
        }
        Ok(())
    }

    pub(crate) fn done(&self, message: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "ok": true, "message": message }));
        } else {
            println!("{message}");
        }
    }
}
