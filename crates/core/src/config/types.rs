use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub zilean: ZileanConfig,
    #[serde(default)]
    pub torbox: TorBoxConfig,
    #[serde(default)]
    pub realdebrid: RealDebridConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Name reported in the MCP `initialize` handshake.
    #[serde(default = "default_project_name")]
    pub project_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            project_name: default_project_name(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_project_name() -> String {
    "VOID Omega MCP".to_string()
}

/// Zilean (DMM index) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZileanConfig {
    /// Base URL of the Zilean instance.
    #[serde(default = "default_zilean_url")]
    pub url: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_zilean_timeout")]
    pub timeout_secs: u32,
}

impl Default for ZileanConfig {
    fn default() -> Self {
        Self {
            url: default_zilean_url(),
            timeout_secs: default_zilean_timeout(),
        }
    }
}

fn default_zilean_url() -> String {
    "https://zileanfortheweebs.midnightignite.me".to_string()
}

fn default_zilean_timeout() -> u32 {
    10
}

/// Fixed-count retry budget with a fixed interval between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollConfig {
    /// Maximum number of attempts.
    pub attempts: u32,
    /// Sleep between attempts in milliseconds.
    pub interval_ms: u64,
}

impl PollConfig {
    pub fn new(attempts: u32, interval_ms: u64) -> Self {
        Self {
            attempts,
            interval_ms,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// TorBox provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TorBoxConfig {
    /// API base URL (e.g., "https://api.torbox.app/v1")
    #[serde(default = "default_torbox_url")]
    pub url: String,
    /// Fallback API key used when a request does not carry one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 20)
    #[serde(default = "default_torbox_timeout")]
    pub timeout_secs: u32,
    /// Budget for waiting on the torrent file list.
    #[serde(default = "default_torbox_hydration")]
    pub hydration: PollConfig,
}

impl Default for TorBoxConfig {
    fn default() -> Self {
        Self {
            url: default_torbox_url(),
            api_key: None,
            timeout_secs: default_torbox_timeout(),
            hydration: default_torbox_hydration(),
        }
    }
}

fn default_torbox_url() -> String {
    "https://api.torbox.app/v1".to_string()
}

fn default_torbox_timeout() -> u32 {
    20
}

fn default_torbox_hydration() -> PollConfig {
    // TorBox can sit in metaDL for a while before files appear
    PollConfig::new(30, 2000)
}

/// Real-Debrid provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealDebridConfig {
    /// API base URL (e.g., "https://api.real-debrid.com/rest/1.0")
    #[serde(default = "default_realdebrid_url")]
    pub url: String,
    /// Fallback API key used when a request does not carry one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_realdebrid_timeout")]
    pub timeout_secs: u32,
    /// Budget for waiting on the torrent file list.
    #[serde(default = "default_realdebrid_hydration")]
    pub hydration: PollConfig,
    /// Budget for waiting on generated links after file selection.
    #[serde(default = "default_realdebrid_links")]
    pub links: PollConfig,
}

impl Default for RealDebridConfig {
    fn default() -> Self {
        Self {
            url: default_realdebrid_url(),
            api_key: None,
            timeout_secs: default_realdebrid_timeout(),
            hydration: default_realdebrid_hydration(),
            links: default_realdebrid_links(),
        }
    }
}

fn default_realdebrid_url() -> String {
    "https://api.real-debrid.com/rest/1.0".to_string()
}

fn default_realdebrid_timeout() -> u32 {
    30
}

fn default_realdebrid_hydration() -> PollConfig {
    PollConfig::new(15, 1000)
}

fn default_realdebrid_links() -> PollConfig {
    PollConfig::new(10, 1000)
}

/// Returns the key if it is present and not blank.
pub fn usable_key(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub zilean: ZileanConfig,
    pub torbox: SanitizedProviderConfig,
    pub realdebrid: SanitizedProviderConfig,
}

/// Sanitized provider config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub hydration: PollConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<PollConfig>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            zilean: config.zilean.clone(),
            torbox: SanitizedProviderConfig {
                url: config.torbox.url.clone(),
                api_key_configured: usable_key(&config.torbox.api_key).is_some(),
                timeout_secs: config.torbox.timeout_secs,
                hydration: config.torbox.hydration,
                links: None,
            },
            realdebrid: SanitizedProviderConfig {
                url: config.realdebrid.url.clone(),
                api_key_configured: usable_key(&config.realdebrid.api_key).is_some(),
                timeout_secs: config.realdebrid.timeout_secs,
                hydration: config.realdebrid.hydration,
                links: Some(config.realdebrid.links),
            },
        }
    }
}
