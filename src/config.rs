//! Runtime configuration
//!
//! The wrapper parses no flags of its own, so everything configurable comes
//! from environment variables.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::cli::OutputFormat;
use crate::runner::WaitPolicy;

/// `text` or `json`
pub const FORMAT_VAR: &str = "PROCTIME_FORMAT";
/// Bounded wait in seconds
pub const TIMEOUT_VAR: &str = "PROCTIME_TIMEOUT";
/// Tracing filter directive; logging is off when unset
pub const LOG_VAR: &str = "PROCTIME_LOG";

/// Configuration for one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub format: OutputFormat,
    pub wait: WaitPolicy,
    pub log_filter: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup
    ///
    /// # Example
    /// ```
    /// use proctime::config::Config;
    /// use proctime::runner::WaitPolicy;
    /// use std::time::Duration;
    ///
    /// let config = Config::from_lookup(|key| match key {
    ///     "PROCTIME_TIMEOUT" => Some("1.5".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.wait, WaitPolicy::Bounded(Duration::from_millis(1500)));
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match non_empty(lookup(FORMAT_VAR)) {
            Some(value) => OutputFormat::from_str(&value, true)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid {}: {:?}", FORMAT_VAR, value))?,
            None => OutputFormat::default(),
        };

        let wait = match non_empty(lookup(TIMEOUT_VAR)) {
            Some(value) => WaitPolicy::Bounded(
                parse_timeout(&value)
                    .with_context(|| format!("invalid {}: {:?}", TIMEOUT_VAR, value))?,
            ),
            None => WaitPolicy::Indefinite,
        };

        let config = Self {
            format,
            wait,
            log_filter: non_empty(lookup(LOG_VAR)),
        };
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let WaitPolicy::Bounded(timeout) = self.wait {
            if timeout.is_zero() {
                return Err(format!("{} must be greater than zero", TIMEOUT_VAR));
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_timeout(value: &str) -> Result<Duration> {
    let secs: f64 = value.parse().context("not a number of seconds")?;
    if !secs.is_finite() || secs <= 0.0 {
        anyhow::bail!("must be a positive number of seconds");
    }
    Duration::try_from_secs_f64(secs).context("out of range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.wait, WaitPolicy::Indefinite);
        assert!(config.log_filter.is_none());
    }

    #[test]
    fn test_json_format_case_insensitive() {
        let config = config_from(&[(FORMAT_VAR, "JSON")]).unwrap();
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = config_from(&[(FORMAT_VAR, "xml")]).unwrap_err();
        assert!(format!("{:#}", err).contains(FORMAT_VAR));
    }

    #[test]
    fn test_timeout_parsed() {
        let config = config_from(&[(TIMEOUT_VAR, "0.25")]).unwrap();
        assert_eq!(config.wait, WaitPolicy::Bounded(Duration::from_millis(250)));
    }

    #[test]
    fn test_bad_timeouts_rejected() {
        for value in ["abc", "0", "-1", "inf", "NaN"] {
            let err = config_from(&[(TIMEOUT_VAR, value)]).unwrap_err();
            assert!(
                format!("{:#}", err).contains(TIMEOUT_VAR),
                "expected error for {:?}",
                value
            );
        }
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = config_from(&[(FORMAT_VAR, " "), (TIMEOUT_VAR, ""), (LOG_VAR, "")]).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_log_filter_kept() {
        let config = config_from(&[(LOG_VAR, "proctime=debug")]).unwrap();
        assert_eq!(config.log_filter.as_deref(), Some("proctime=debug"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config {
            wait: WaitPolicy::Bounded(Duration::ZERO),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
