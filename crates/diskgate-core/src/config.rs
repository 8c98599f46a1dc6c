//! Configuration module

use crate::retry::RetryPolicy;
use crate::{Error, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default provider REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://cloud-api.yandex.net/v1/disk";

/// Smallest accepted chunk size override
pub const MIN_CHUNK_SIZE: u64 = 1024;
/// Largest accepted chunk size override
pub const MAX_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Provider endpoint settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Retry settings for provider calls
    #[serde(default)]
    pub retry: RetryConfig,
    /// Network timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Streaming transfer settings
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Listing settings
    #[serde(default)]
    pub list: ListConfig,
}

/// Provider endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// REST API base URL
    pub base_url: String,
    /// Scheme placed before the token in the Authorization header
    pub auth_scheme: String,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_scheme: "OAuth".to_string(),
            user_agent: format!("diskgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per provider call
    pub max_retries: u32,
    /// Delay before the second attempt, doubled afterwards
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.initial_delay_ms))
    }
}

/// Timeout configuration, all values in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Provider REST calls
    pub api_secs: u64,
    /// Streaming GET and PUT of file bodies
    pub transfer_secs: u64,
    /// HEAD checks of source and download links
    pub probe_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            api_secs: 30,
            transfer_secs: 600,
            probe_secs: 10,
        }
    }
}

/// Streaming transfer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Fixed chunk size, overrides the size-based policy
    #[serde(
        default,
        deserialize_with = "deserialize_optional_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub chunk_size: Option<u64>,
    /// Where downloads land on Colab hosts without a local_path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

/// Listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Page size when the request gives none
    pub default_limit: u32,
    /// Smaller page sizes are raised to this value
    pub min_limit: u32,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            min_limit: 10,
        }
    }
}

/// Size value given either as bytes or as a string like "1MiB"
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Bytes(u64),
    Text(String),
}

fn deserialize_optional_size<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<SizeValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(SizeValue::Bytes(bytes)) => Ok(Some(bytes)),
        Some(SizeValue::Text(text)) => parse_size(&text)
            .map(Some)
            .map_err(|e| D::Error::custom(format!("Failed to parse chunk_size: {}", e))),
    }
}

/// Parse size string like "100MiB" to bytes
pub fn parse_size(size_str: &str) -> Result<u64> {
    let size_str = size_str.trim();

    // Try to parse as plain number first
    if let Ok(bytes) = size_str.parse::<u64>() {
        return Ok(bytes);
    }

    let split_pos = size_str
        .chars()
        .position(|c| !c.is_ascii_digit() && c != '.')
        .unwrap_or(size_str.len());

    if split_pos == 0 {
        return Err(Error::Config(format!("Invalid size format: {}", size_str)));
    }

    let (number_part, unit_part) = size_str.split_at(split_pos);
    let number: f64 = number_part
        .parse()
        .map_err(|_| Error::Config(format!("Invalid number in size: {}", number_part)))?;

    let multiplier: u64 = match unit_part.trim().to_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "ki" | "kib" => 1_024,
        "mi" | "mib" => 1_048_576,
        "gi" | "gib" => 1_073_741_824,
        _ => return Err(Error::Config(format!("Unknown size unit: {}", unit_part))),
    };

    Ok((number * multiplier as f64) as u64)
}

impl GatewayConfig {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| Error::Config("Unable to determine config directory".to_string()))?;

        let diskgate_dir = config_dir.join("diskgate");
        if !diskgate_dir.exists() {
            fs::create_dir_all(&diskgate_dir)?;
        }

        Ok(diskgate_dir.join("config.toml"))
    }

    /// Get default configuration content with comments
    pub fn default_config_content() -> String {
        r#"# diskgate configuration file

[api]
# Provider REST endpoint
base_url = "https://cloud-api.yandex.net/v1/disk"
# Authorization header scheme, the header becomes "<scheme> <token>"
auth_scheme = "OAuth"
user_agent = "diskgate"

[retry]
# Total attempts per provider call (5xx and connection failures only)
max_retries = 3
# Delay before the second attempt in milliseconds, doubled after each attempt
initial_delay_ms = 1000

[timeouts]
api_secs = 30
transfer_secs = 600
probe_secs = 10

[transfer]
# Fixed chunk size for streaming. Without it the size is picked from the
# file size: 512KiB up to 10MiB, 1MiB up to 100MiB, 2MiB up to 1GiB, 4MiB above
# chunk_size = "1MiB"

# Download directory on Colab hosts when no local_path is given
# cache_dir = "/content/yadisk_cache"

[list]
default_limit = 100
# Requests asking for fewer items are raised to this
min_limit = 10
"#
        .to_string()
    }

    /// Load configuration from the default location, writing the
    /// commented default file when none exists
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            fs::write(&path, Self::default_config_content())?;
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail late, during a transfer
    pub fn validate(&self) -> Result<()> {
        if let Some(size) = self.transfer.chunk_size {
            if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&size) {
                return Err(Error::Config(format!(
                    "transfer.chunk_size must be between {} and {} bytes, got {}",
                    MIN_CHUNK_SIZE, MAX_CHUNK_SIZE, size
                )));
            }
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&path, contents)?;
        Ok(())
    }

    /// Load configuration or use defaults if loading fails
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Configured chunk size override, if any. Out-of-range values are
    /// ignored so that a config built in code cannot ask for a huge buffer.
    pub fn chunk_size(&self) -> Option<usize> {
        self.transfer
            .chunk_size
            .filter(|size| (MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(size))
            .map(|size| size as usize)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.api_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.transfer_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.probe_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.auth_scheme, "OAuth");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.timeouts.api_secs, 30);
        assert_eq!(config.list.default_limit, 100);
        assert_eq!(config.list.min_limit, 10);
        assert!(config.chunk_size().is_none());
    }

    #[test]
    fn test_default_content_parses() {
        let config: GatewayConfig =
            toml::from_str(&GatewayConfig::default_config_content()).unwrap();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeouts.transfer_secs, 600);
        assert!(config.transfer.chunk_size.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = GatewayConfig::default();
        config.transfer.chunk_size = Some(2 * 1_048_576);
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: GatewayConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.api.base_url, deserialized.api.base_url);
        assert_eq!(deserialized.chunk_size(), Some(2 * 1_048_576));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [retry]
            max_retries = 5
            initial_delay_ms = 10

            [transfer]
            chunk_size = "1MiB"
            "#,
        )
        .unwrap();

        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.chunk_size(), Some(1_048_576));
        assert_eq!(config.api.auth_scheme, "OAuth");
        assert_eq!(config.list.min_limit, 10);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryConfig {
            max_retries: 4,
            initial_delay_ms: 250,
        }
        .policy();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100").unwrap(), 100);
        assert_eq!(parse_size("100B").unwrap(), 100);
        assert_eq!(parse_size("1KB").unwrap(), 1_000);
        assert_eq!(parse_size("512KiB").unwrap(), 512 * 1_024);
        assert_eq!(parse_size("4MiB").unwrap(), 4 * 1_048_576);
        assert_eq!(parse_size("1.5GB").unwrap(), 1_500_000_000);
        assert!(parse_size("invalid").is_err());
        assert!(parse_size("10 parsecs").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api]\nbase_url = \"http://localhost:9\"\nauth_scheme = \"Bearer\"\nuser_agent = \"t\"\n").unwrap();

        let config = GatewayConfig::load_from(&path).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9");
        assert_eq!(config.api.auth_scheme, "Bearer");

        fs::write(&path, "[api\n").unwrap();
        assert!(GatewayConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_chunk_size_out_of_range_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "[transfer]\nchunk_size = \"10GiB\"\n").unwrap();
        let err = GatewayConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("chunk_size"));

        fs::write(&path, "[transfer]\nchunk_size = 512\n").unwrap();
        assert!(GatewayConfig::load_from(&path).is_err());

        fs::write(&path, "[transfer]\nchunk_size = \"10MiB\"\n").unwrap();
        let config = GatewayConfig::load_from(&path).unwrap();
        assert_eq!(config.chunk_size(), Some(10 * 1024 * 1024));
    }

    #[test]
    fn test_chunk_size_accessor_ignores_out_of_range() {
        let mut config = GatewayConfig::default();
        config.transfer.chunk_size = Some(10 * 1024 * 1024 * 1024);
        assert!(config.validate().is_err());
        assert_eq!(config.chunk_size(), None);

        config.transfer.chunk_size = Some(MIN_CHUNK_SIZE);
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size(), Some(1024));
    }
}
