//! Runtime configuration from the environment (and `.env`)

use crate::error::LoanDeskError;
use crate::Result;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_POPULATION_SIZE: usize = 100;
const DEFAULT_AGENT_LATENCY_MS: u64 = 1500;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub population_size: usize,
    /// Unseeded (clock) generation when absent
    pub population_seed: Option<u64>,
    pub agent_latency: Duration,
    pub log_level: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: DEFAULT_PORT,
            population_size: DEFAULT_POPULATION_SIZE,
            population_seed: None,
            agent_latency: Duration::from_millis(DEFAULT_AGENT_LATENCY_MS),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::new();

        let port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => parse_var("PORT", &raw)?,
            None => defaults.port,
        };

        let population_size = match lookup("POPULATION_SIZE") {
            Some(raw) => parse_var("POPULATION_SIZE", &raw)?,
            None => defaults.population_size,
        };

        let population_seed = lookup("POPULATION_SEED")
            .map(|raw| parse_var("POPULATION_SEED", &raw))
            .transpose()?;

        let agent_latency = match lookup("AGENT_LATENCY_MS") {
            Some(raw) => Duration::from_millis(parse_var("AGENT_LATENCY_MS", &raw)?),
            None => defaults.agent_latency,
        };

        let log_level = lookup("LOG_LEVEL")
            .filter(|level| !level.trim().is_empty())
            .unwrap_or(defaults.log_level);

        Ok(Self {
            port,
            population_size,
            population_seed,
            agent_latency,
            log_level,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| LoanDeskError::Config(format!("{} has invalid value {:?}", key, raw)))
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
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 8080);
        assert_eq!(config.population_size, 100);
        assert!(config.population_seed.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("API_PORT", "9000"),
            ("POPULATION_SIZE", "150"),
            ("POPULATION_SEED", "42"),
            ("AGENT_LATENCY_MS", "0"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.population_size, 150);
        assert_eq!(config.population_seed, Some(42));
        assert_eq!(config.agent_latency, Duration::ZERO);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_port_takes_precedence() {
        let config =
            Config::from_lookup(lookup_from(&[("PORT", "3000"), ("API_PORT", "9000")])).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_value() {
        let err = Config::from_lookup(lookup_from(&[("POPULATION_SIZE", "-5")])).unwrap_err();
        assert!(matches!(err, LoanDeskError::Config(_)));
    }
}
