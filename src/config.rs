use anyhow::{Context as _, anyhow};

const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_MIN_CONNECTIONS: u32 = 2;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 8;
const DEFAULT_DEBOUNCE_WINDOW_SECS: u64 = 60;
const DEFAULT_SOFTBAN_PURGE_DAYS: u8 = 7;

/// Runtime configuration, read from the process environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database: DatabaseConfig,
    pub moderation: ModerationConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// How long a mod-log debounce suppresses the matching gateway event.
    pub debounce_window_secs: u64,
    /// Days of messages purged by a softban. Discord caps this at 7.
    pub softban_purge_days: u8,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            debounce_window_secs: DEFAULT_DEBOUNCE_WINDOW_SECS,
            softban_purge_days: DEFAULT_SOFTBAN_PURGE_DAYS,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let discord_token = lookup("DISCORD_TOKEN").ok_or_else(|| anyhow!("missing DISCORD_TOKEN"))?;
        let url = lookup("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let softban_purge_days: u8 =
            parse_or("SOFTBAN_PURGE_DAYS", &lookup, DEFAULT_SOFTBAN_PURGE_DAYS)?;
        if softban_purge_days > 7 {
            return Err(anyhow!(
                "SOFTBAN_PURGE_DAYS must be between 0 and 7, got {}",
                softban_purge_days
            ));
        }

        Ok(Self {
            discord_token,
            database: DatabaseConfig {
                url,
                max_connections: parse_or("DB_MAX_CONNECTIONS", &lookup, DEFAULT_MAX_CONNECTIONS)?,
                min_connections: parse_or("DB_MIN_CONNECTIONS", &lookup, DEFAULT_MIN_CONNECTIONS)?,
                connect_timeout_secs: parse_or(
                    "DB_CONNECT_TIMEOUT_SECS",
                    &lookup,
                    DEFAULT_CONNECT_TIMEOUT_SECS,
                )?,
            },
            moderation: ModerationConfig {
                debounce_window_secs: parse_or(
                    "MODLOG_DEBOUNCE_SECS",
                    &lookup,
                    DEFAULT_DEBOUNCE_WINDOW_SECS,
                )?,
                softban_purge_days,
            },
        })
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "token"),
            ("DATABASE_URL", "postgres://localhost/guard"),
        ]))
        .unwrap();

        assert_eq!(config.database.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.moderation.softban_purge_days, 7);
        assert_eq!(config.moderation.debounce_window_secs, 60);
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[("DATABASE_URL", "sqlite::memory:")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_and_validation() {
        let config = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "token"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("MODLOG_DEBOUNCE_SECS", "15"),
            ("SOFTBAN_PURGE_DAYS", "1"),
        ]))
        .unwrap();
        assert_eq!(config.moderation.debounce_window_secs, 15);
        assert_eq!(config.moderation.softban_purge_days, 1);

        let too_many_days = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "token"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("SOFTBAN_PURGE_DAYS", "30"),
        ]));
        assert!(too_many_days.is_err());

        let garbage = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "token"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("DB_MAX_CONNECTIONS", "lots"),
        ]));
        assert!(garbage.is_err());
    }
}
