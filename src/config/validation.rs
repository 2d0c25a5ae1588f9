use crate::config::types::{
    Config, EsportsConfig, HttpConfig, LiveStatsConfig, OutputConfig, RiotConfig,
};
use crate::ConfigError;
use url::Url;

/// A century of schedule history
const MAX_RECENT_DAYS: u32 = 36_500;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_output_config(&config.output)?;
    validate_http_config(&config.http)?;
    validate_riot_config(&config.riot)?;
    validate_esports_config(&config.esports)?;
    validate_livestats_config(&config.livestats)?;
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data_dir cannot be empty".to_string(),
        ));
    }

    if config.meta_dir.is_empty() {
        return Err(ConfigError::Validation(
            "meta_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry and transport policy
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeouts must be greater than zero".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.backoff_base.is_nan() || config.backoff_base < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_base must be >= 1.0, got {}",
            config.backoff_base
        )));
    }

    if config.max_retry_after_secs == 0 {
        return Err(ConfigError::Validation(
            "max_retry_after_secs must be greater than zero".to_string(),
        ));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_riot_config(config: &RiotConfig) -> Result<(), ConfigError> {
    if config.platform.is_empty() || config.region.is_empty() {
        return Err(ConfigError::Validation(
            "riot platform and region cannot be empty".to_string(),
        ));
    }

    if config.matches_per_seed < 1 || config.matches_per_seed > 100 {
        return Err(ConfigError::Validation(format!(
            "matches_per_seed must be between 1 and 100, got {}",
            config.matches_per_seed
        )));
    }

    if config.concurrency < 1 || config.concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 32, got {}",
            config.concurrency
        )));
    }

    if config.account_regions.is_empty() {
        return Err(ConfigError::Validation(
            "account_regions must list at least one region".to_string(),
        ));
    }

    validate_rate(config.requests_per_second, config.burst, "riot")?;
    validate_base_url(
        &config.platform_base_url.replace("{platform}", &config.platform),
        "platform_base_url",
    )?;
    validate_base_url(
        &config.region_base_url.replace("{region}", &config.region),
        "region_base_url",
    )?;

    Ok(())
}

fn validate_esports_config(config: &EsportsConfig) -> Result<(), ConfigError> {
    if config.hl.is_empty() {
        return Err(ConfigError::Validation("hl cannot be empty".to_string()));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "esports timeout_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(days) = config.recent_days {
        if days > MAX_RECENT_DAYS {
            return Err(ConfigError::Validation(format!(
                "recent_days must be <= {}, got {}",
                MAX_RECENT_DAYS, days
            )));
        }
    }

    if config.schedule_pages < 1 {
        return Err(ConfigError::Validation(
            "schedule_pages must be >= 1".to_string(),
        ));
    }

    validate_rate(config.requests_per_second, config.burst, "esports")?;
    validate_base_url(&config.base_url, "esports base_url")
}

fn validate_livestats_config(config: &LiveStatsConfig) -> Result<(), ConfigError> {
    validate_rate(config.requests_per_second, config.burst, "livestats")?;
    validate_base_url(&config.base_url, "livestats base_url")
}

/// Validates a token bucket definition
fn validate_rate(requests_per_second: f64, burst: u32, section: &str) -> Result<(), ConfigError> {
    if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} requests_per_second must be a positive number, got {}",
            section, requests_per_second
        )));
    }

    if burst < 1 {
        return Err(ConfigError::Validation(format!(
            "{} burst must be >= 1",
            section
        )));
    }

    Ok(())
}

/// Validates a base URL once placeholders have been substituted
fn validate_base_url(url: &str, field: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, url
        )));
    }

    if parsed.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} cannot be used as a base URL: '{}'",
            field, url
        )));
    }

    Ok(())
}
