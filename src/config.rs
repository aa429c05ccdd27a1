// Configuration loaded from environment variables

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_ESTIMATOR_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Where ledger records live. `Disabled` runs the stateless feedback-only
/// variant of the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerStore {
    Postgres { database_url: String, max_connections: u32 },
    Memory,
    Disabled,
}

impl fmt::Display for LedgerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerStore::Postgres { max_connections, .. } => {
                write!(f, "postgres (max {} connections)", max_connections)
            }
            LedgerStore::Memory => write!(f, "memory"),
            LedgerStore::Disabled => write!(f, "disabled"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub ledger: LedgerStore,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub estimator_timeout: Duration,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;

        let database_url = get("DATABASE_URL");
        let store = get("LEDGER_STORE")
            .map(|s| s.trim().to_lowercase())
            .or_else(|| database_url.as_ref().map(|_| "postgres".to_string()));
        let ledger = match store.as_deref() {
            Some("postgres") => {
                let database_url = database_url
                    .context("DATABASE_URL must be set when LEDGER_STORE=postgres")?;
                let max_connections = parse_or(
                    get("DATABASE_MAX_CONNECTIONS"),
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_MAX_CONNECTIONS,
                )?;
                LedgerStore::Postgres { database_url, max_connections }
            }
            Some("memory") => LedgerStore::Memory,
            Some("disabled") | None => LedgerStore::Disabled,
            Some(other) => bail!(
                "LEDGER_STORE must be one of postgres, memory, disabled (got '{}')",
                other
            ),
        };

        let openai_api_key = get("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;
        let openai_base_url =
            get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        let openai_model = get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

        let timeout_secs = parse_or(
            get("ESTIMATOR_TIMEOUT_SECS"),
            "ESTIMATOR_TIMEOUT_SECS",
            DEFAULT_ESTIMATOR_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            bail!("ESTIMATOR_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            port,
            ledger,
            openai_api_key,
            openai_base_url,
            openai_model,
            estimator_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("invalid {} '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_database() {
        let cfg = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.ledger, LedgerStore::Disabled);
        assert_eq!(cfg.openai_model, "gpt-3.5-turbo");
        assert_eq!(cfg.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.estimator_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_database_url_enables_postgres() {
        let cfg = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "postgres://localhost/hack"),
            ("DATABASE_MAX_CONNECTIONS", "8"),
        ])
        .unwrap();
        assert_eq!(
            cfg.ledger,
            LedgerStore::Postgres {
                database_url: "postgres://localhost/hack".to_string(),
                max_connections: 8,
            }
        );
    }

    #[test]
    fn test_explicit_store_selection() {
        let cfg = config(&[("OPENAI_API_KEY", "k"), ("LEDGER_STORE", "Memory")]).unwrap();
        assert_eq!(cfg.ledger, LedgerStore::Memory);

        let cfg = config(&[
            ("OPENAI_API_KEY", "k"),
            ("LEDGER_STORE", "disabled"),
            ("DATABASE_URL", "postgres://localhost/hack"),
        ])
        .unwrap();
        assert_eq!(cfg.ledger, LedgerStore::Disabled);

        assert!(config(&[("OPENAI_API_KEY", "k"), ("LEDGER_STORE", "postgres")]).is_err());
        assert!(config(&[("OPENAI_API_KEY", "k"), ("LEDGER_STORE", "redis")]).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("OPENAI_API_KEY", "k"), ("PORT", "eighty")]).is_err());
        assert!(config(&[("OPENAI_API_KEY", "k"), ("ESTIMATOR_TIMEOUT_SECS", "0")]).is_err());
    }
}
