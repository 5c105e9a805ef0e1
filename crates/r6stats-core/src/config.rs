use std::fmt::Display;
use std::str::FromStr;

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Reads the collector settings from the process environment only. The
/// binary loads any `.env` file into the environment beforehand.
///
/// # Errors
///
/// [`ConfigError::MissingEnvVar`] for an absent required variable,
/// [`ConfigError::InvalidEnvVar`] for an unparsable number or an empty roster.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Parses settings through `lookup` so tests can feed a plain map.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_owned()))
    };
    let or_default =
        |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_owned()) };

    let usernames = parse_usernames(&require("R6STATS_USERNAMES")?)?;
    let provider_url = require("R6STATS_PROVIDER_URL")?;
    let provider_token = lookup("R6STATS_PROVIDER_TOKEN").ok();
    let tabstats_url = lookup("R6STATS_TABSTATS_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());

    let influx_url = require("R6STATS_INFLUX_URL")?;
    let influx_token = require("R6STATS_INFLUX_TOKEN")?;
    let influx_org = require("R6STATS_INFLUX_ORG")?;
    let influx_bucket = require("R6STATS_INFLUX_BUCKET")?;

    let log_level = or_default("R6STATS_LOG_LEVEL", "info");
    let collect_cron = or_default("R6STATS_COLLECT_CRON", "0 */10 * * * *");
    let metadata_refresh_secs = parse_or(&lookup, "R6STATS_METADATA_REFRESH_SECS", 3600)?;
    let profile_cache_ttl_secs = parse_or(&lookup, "R6STATS_PROFILE_CACHE_TTL_SECS", 3600)?;
    let category_timeout_secs = parse_or(&lookup, "R6STATS_CATEGORY_TIMEOUT_SECS", 60)?;
    let max_concurrent_users = parse_or(&lookup, "R6STATS_MAX_CONCURRENT_USERS", 4)?;
    let request_timeout_secs = parse_or(&lookup, "R6STATS_REQUEST_TIMEOUT_SECS", 30)?;
    let user_agent = or_default("R6STATS_USER_AGENT", "r6stats/0.1 (metrics-collector)");
    let sink_batch_size = parse_or(&lookup, "R6STATS_SINK_BATCH_SIZE", 10000)?;

    Ok(AppConfig {
        usernames,
        log_level,
        provider_url,
        provider_token,
        tabstats_url,
        influx_url,
        influx_token,
        influx_org,
        influx_bucket,
        collect_cron,
        metadata_refresh_secs,
        profile_cache_ttl_secs,
        category_timeout_secs,
        max_concurrent_users,
        request_timeout_secs,
        user_agent,
        sink_batch_size,
    })
}

/// Parses `var` when set, otherwise returns `default`.
fn parse_or<T, F>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let Ok(raw) = lookup(var) else {
        return Ok(default);
    };
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_owned(),
        reason: format!("{raw:?}: {e}"),
    })
}

/// Split the comma-separated roster, dropping blank entries.
fn parse_usernames(raw: &str) -> Result<Vec<String>, ConfigError> {
    let names: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    if names.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "R6STATS_USERNAMES".to_string(),
            reason: "must contain at least one username".to_string(),
        });
    }
    Ok(names)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
