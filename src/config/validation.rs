use crate::config::types::{
    AuthConfig, Config, OutputConfig, RunConfig, SubmissionConfig, MAX_REFRESH_MARGIN_SECS,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_run_config(&config.run)?;
    validate_submission_config(&config.submission)?;
    validate_auth_config(&config.auth)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the run section
fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    validate_http_url("sitemap-url", &config.sitemap_url)?;

    if config.daily_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "daily-limit must be >= 1, got {}",
            config.daily_limit
        )));
    }

    Ok(())
}

/// Validates retry, backoff and pacing settings
fn validate_submission_config(config: &SubmissionConfig) -> Result<(), ConfigError> {
    validate_http_url("endpoint", &config.endpoint)?;

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    // Backoff waits must grow between attempts
    if !(config.backoff_multiplier > 1.0) {
        return Err(ConfigError::Validation(format!(
            "backoff-multiplier must be > 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    if config.initial_backoff_ms == 0 {
        return Err(ConfigError::Validation(
            "initial-backoff-ms must be > 0".to_string(),
        ));
    }

    if config.max_backoff_ms < config.initial_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max-backoff-ms ({}) must be >= initial-backoff-ms ({})",
            config.max_backoff_ms, config.initial_backoff_ms
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates the credential and consent settings
fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    if config.client_secret_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "client-secret-path cannot be empty".to_string(),
        ));
    }

    if config.credential_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "credential-path cannot be empty".to_string(),
        ));
    }

    if config.scopes.is_empty() {
        return Err(ConfigError::Validation(
            "at least one scope is required".to_string(),
        ));
    }

    if config.candidate_ports.is_empty() {
        return Err(ConfigError::Validation(
            "candidate-ports cannot be empty".to_string(),
        ));
    }

    if config.consent_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "consent-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.refresh_margin_secs > MAX_REFRESH_MARGIN_SECS {
        return Err(ConfigError::Validation(format!(
            "refresh-margin-secs must be <= {}",
            MAX_REFRESH_MARGIN_SECS
        )));
    }

    if let Some(uri) = &config.auth_uri {
        validate_http_url("auth-uri", uri)?;
    }

    if let Some(uri) = &config.token_uri {
        validate_http_url("token-uri", uri)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.ledger_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "ledger-path cannot be empty".to_string(),
        ));
    }

    if config.log_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("log-path cannot be empty".to_string()));
    }

    Ok(())
}

/// Checks that a setting holds an absolute http(s) URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}
