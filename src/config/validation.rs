use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Largest worker pool accepted in index-driven mode
pub const MAX_CONCURRENCY: u32 = 64;

/// Longest pacing delay accepted, in seconds
pub const MAX_PACING_SECS: f64 = 3600.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    validate_pacing(config.pacing_min_secs, config.pacing_max_secs)?;

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_interval must be >= 1".to_string(),
        ));
    }

    if config.index_checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "index_checkpoint_interval must be >= 1".to_string(),
        ));
    }

    if config.minimum_content_length < 1 {
        return Err(ConfigError::Validation(
            "minimum_content_length must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates a pacing range given in seconds
///
/// Shared with the command line, where `--delay MIN MAX` overrides the
/// configured bounds.
pub fn validate_pacing(min_secs: f64, max_secs: f64) -> Result<(), ConfigError> {
    if !min_secs.is_finite() || !max_secs.is_finite() {
        return Err(ConfigError::Validation(
            "pacing bounds must be finite numbers".to_string(),
        ));
    }

    if min_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "pacing minimum must be >= 0, got {}",
            min_secs
        )));
    }

    if max_secs < min_secs {
        return Err(ConfigError::Validation(format!(
            "pacing maximum ({}) must not be below the minimum ({})",
            max_secs, min_secs
        )));
    }

    if max_secs > MAX_PACING_SECS {
        return Err(ConfigError::Validation(format!(
            "pacing maximum must be at most {} seconds, got {}",
            MAX_PACING_SECS, max_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.progress_file.is_empty() {
        return Err(ConfigError::Validation(
            "progress_file cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
