use std::{env, str::FromStr, time::Duration};

use crate::error::{config, AppErr, AppResult};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_ARCHIVED: usize = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr:         String,
    pub database_url:      String,
    pub simulator_url:     String,
    pub simulator_timeout: Duration,
    pub poll_interval:     Duration,
    pub max_archived:      usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr:         "0.0.0.0:3000".into(),
            database_url:      "sqlite://room_directory.db?mode=rwc".into(),
            simulator_url:     "http://127.0.0.1:8787".into(),
            simulator_timeout: Duration::from_millis(5000),
            poll_interval:     DEFAULT_POLL_INTERVAL,
            max_archived:      DEFAULT_MAX_ARCHIVED,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let d = Self::default();
        let cfg = Self {
            bind_addr:         get("BIND_ADDR").unwrap_or(d.bind_addr),
            database_url:      get("DATABASE_URL").unwrap_or(d.database_url),
            simulator_url:     get("SIMULATOR_URL").unwrap_or(d.simulator_url),
            simulator_timeout: parse_ms(&get, "SIMULATOR_TIMEOUT_MS")?.unwrap_or(d.simulator_timeout),
            poll_interval:     parse_ms(&get, "POLL_INTERVAL_MS")?.unwrap_or(d.poll_interval),
            max_archived:      parse(&get, "MAX_ARCHIVED")?.unwrap_or(d.max_archived),
        };
        if cfg.poll_interval.is_zero() {
            return Err(AppErr::Config("POLL_INTERVAL_MS must be > 0".into()));
        }
        if cfg.max_archived == 0 {
            return Err(AppErr::Config("MAX_ARCHIVED must be > 0".into()));
        }
        Ok(cfg)
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| raw.trim().parse::<T>().map_err(|e| config(format!("{key}: {e}"))))
        .transpose()
}

fn parse_ms(get: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<Duration>> {
    Ok(parse::<u64>(get, key)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_millis(2000));
        assert_eq!(cfg.max_archived, DEFAULT_MAX_ARCHIVED);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = Config::from_lookup(lookup(&[
            ("POLL_INTERVAL_MS", "500"),
            ("MAX_ARCHIVED", " 7 "),
            ("SIMULATOR_URL", "http://sim:9000"),
        ])).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_millis(500));
        assert_eq!(cfg.max_archived, 7);
        assert_eq!(cfg.simulator_url, "http://sim:9000");
    }

    #[test]
    fn garbage_and_zero_values_are_rejected() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("MAX_ARCHIVED", "lots")])),
            Err(AppErr::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("POLL_INTERVAL_MS", "0")])),
            Err(AppErr::Config(_))
        ));
    }
}
