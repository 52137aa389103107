use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Debug)]
pub(crate) struct Config {
    pub(crate) db_path: PathBuf,
    /// Acting user when `--user` is not given.
    pub(crate) default_user: Option<String>,
    pub(crate) log_format: LogFormat,
}

impl Config {
    /// Reads `WALLETWISE_*` variables, after loading `.env` if there is one.
    pub(crate) fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = match get("WALLETWISE_DB_PATH").filter(|p| !p.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };
        let default_user = get("WALLETWISE_USER").filter(|u| !u.trim().is_empty());
        let log_format = match get("WALLETWISE_LOG_FORMAT") {
            None => LogFormat::Text,
            Some(raw) if raw.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(raw) => {
                return Err(Error::Config(format!(
                    "WALLETWISE_LOG_FORMAT must be 'text' or 'json', got '{raw}'"
                )))
            }
        };
        Ok(Self {
            db_path,
            default_user,
            log_format,
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "walletwise", "WalletWise")
        .ok_or_else(|| Error::Config("could not determine data directory".into()))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| {
        Error::Config(format!(
            "failed to create data directory {}: {e}",
            data_dir.display()
        ))
    })?;
    Ok(data_dir.join("walletwise.db"))
}
