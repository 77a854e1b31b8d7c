use super::{types::Config, ConfigError, PollConfig};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Service URLs are http(s)
/// - Timeouts and poll budgets are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    validate_url("zilean.url", &config.zilean.url)?;
    validate_url("torbox.url", &config.torbox.url)?;
    validate_url("realdebrid.url", &config.realdebrid.url)?;

    validate_timeout("zilean.timeout_secs", config.zilean.timeout_secs)?;
    validate_timeout("torbox.timeout_secs", config.torbox.timeout_secs)?;
    validate_timeout("realdebrid.timeout_secs", config.realdebrid.timeout_secs)?;

    validate_poll("torbox.hydration", &config.torbox.hydration)?;
    validate_poll("realdebrid.hydration", &config.realdebrid.hydration)?;
    validate_poll("realdebrid.links", &config.realdebrid.links)?;

    Ok(())
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{} must be an http(s) URL, got '{}'",
            field, url
        )))
    }
}

fn validate_timeout(field: &str, secs: u32) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{} cannot be 0",
            field
        )));
    }
    Ok(())
}

fn validate_poll(field: &str, poll: &PollConfig) -> Result<(), ConfigError> {
    if poll.attempts == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{}.attempts must be at least 1",
            field
        )));
    }
    Ok(())
}
