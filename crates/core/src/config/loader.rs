use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Flat variable names understood for compatibility with older deployments.
const LEGACY_ENV_KEYS: [&str; 3] = ["TORBOX_API_KEY", "REALDEBRID_API_KEY", "ZILEAN_API_URL"];

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(path));
    extract(with_env(figment))
}

/// Load configuration from defaults and environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    extract(with_env(Figment::from(Serialized::defaults(
        Config::default(),
    ))))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn with_env(figment: Figment) -> Figment {
    figment
        .merge(Env::prefixed("OMEGA_").split("__"))
        .merge(
            Env::raw()
                .only(&LEGACY_ENV_KEYS)
                .map(|key| legacy_key_path(key.as_str()).into()),
        )
}

fn legacy_key_path(key: &str) -> &'static str {
    if key.eq_ignore_ascii_case("TORBOX_API_KEY") {
        "torbox.api_key"
    } else if key.eq_ignore_ascii_case("REALDEBRID_API_KEY") {
        "realdebrid.api_key"
    } else {
        "zilean.url"
    }
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    figment
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_config_from_str_invalid_type() {
        let toml = r#"
[server]
port = "not a port"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[zilean]
url = "http://zilean.local"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.zilean.url, "http://zilean.local");
        // sections absent from the file fall back to defaults
        assert_eq!(config.torbox.timeout_secs, 20);
    }

    #[test]
    fn test_legacy_key_path() {
        assert_eq!(legacy_key_path("TORBOX_API_KEY"), "torbox.api_key");
        assert_eq!(legacy_key_path("realdebrid_api_key"), "realdebrid.api_key");
        assert_eq!(legacy_key_path("ZILEAN_API_URL"), "zilean.url");
    }
}
