use marketplace_core::compress::{
    CompressionSettings, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION, DEFAULT_THRESHOLD_BYTES,
};
use marketplace_core::pacing::{
    PacingPolicy, DEFAULT_DELETE_DELAY, DEFAULT_REFETCH_DELAY, DEFAULT_UPLOAD_DELAY,
};
use marketplace_core::staging::{StagingLimits, MAX_IMAGES_PER_ITEM, MAX_IMAGE_BYTES};
use marketplace_core::DEFAULT_API_URL;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Image upload limits, compression and request pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    /// Maximum number of images per item
    pub max_images: usize,
    /// Largest file that may be staged, in bytes
    pub max_image_bytes: u64,
    /// Files above this size are re-encoded before upload
    pub compress_threshold_bytes: u64,
    /// Longest edge of a re-encoded image
    pub max_dimension: u32,
    /// JPEG quality (1-100) of a re-encoded image
    pub jpeg_quality: u8,
    pub delete_delay_ms: u64,
    pub upload_delay_ms: u64,
    pub refetch_delay_ms: u64,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_images: MAX_IMAGES_PER_ITEM,
            max_image_bytes: MAX_IMAGE_BYTES,
            compress_threshold_bytes: DEFAULT_THRESHOLD_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            delete_delay_ms: DEFAULT_DELETE_DELAY.as_millis() as u64,
            upload_delay_ms: DEFAULT_UPLOAD_DELAY.as_millis() as u64,
            refetch_delay_ms: DEFAULT_REFETCH_DELAY.as_millis() as u64,
        }
    }
}

impl UploadsConfig {
    pub fn staging_limits(&self) -> StagingLimits {
        StagingLimits {
            max_images: self.max_images,
            max_image_bytes: self.max_image_bytes,
        }
    }

    pub fn compression(&self) -> CompressionSettings {
        CompressionSettings {
            threshold_bytes: self.compress_threshold_bytes,
            max_dimension: self.max_dimension,
            jpeg_quality: self.jpeg_quality.clamp(1, 100),
        }
    }

    pub fn pacing(&self) -> PacingPolicy {
        PacingPolicy {
            between_deletions: Duration::from_millis(self.delete_delay_ms),
            between_uploads: Duration::from_millis(self.upload_delay_ms),
            before_refetch: Duration::from_millis(self.refetch_delay_ms),
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Base URL of the marketplace backend
    pub api_url: ConfigValue<String>,
    /// User acting as seller, reviewer and favorites owner
    pub user_id: ConfigValue<Option<String>>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Upload settings
    pub uploads: UploadsConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    api_url: Option<String>,
    user_id: Option<String>,
    uploads: Option<UploadsConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut api_url = ConfigValue::new(DEFAULT_API_URL.to_string(), ConfigSource::Default);
        let mut user_id = ConfigValue::new(None, ConfigSource::Default);
        let mut config_file = None;
        let mut uploads = UploadsConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(url) = file_config.api_url {
                api_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(user) = file_config.user_id {
                user_id = ConfigValue::new(Some(user), ConfigSource::File);
            }
            if let Some(uploads_config) = file_config.uploads {
                uploads = uploads_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(url) = std::env::var("MARKET_API_URL") {
            api_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(user) = std::env::var("MARKET_USER_ID") {
            user_id = ConfigValue::new(Some(user), ConfigSource::Environment);
        }

        Ok(Self {
            api_url,
            user_id,
            config_file,
            uploads,
        })
    }

    /// The configured user, or an error telling how to set one.
    pub fn require_user(&self) -> Result<&str, ConfigError> {
        self.user_id
            .value
            .as_deref()
            .ok_or(ConfigError::MissingUserId)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/market/
    /// - macOS: ~/Library/Application Support/market/
    /// - Windows: %APPDATA%/market/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("market")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    MissingUserId,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::MissingUserId => write!(
                f,
                "No user configured. Set user_id in the config file or MARKET_USER_ID."
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.api_url.value, "http://localhost:8080");
        assert_eq!(config.api_url.source, ConfigSource::Default);
        assert_eq!(config.uploads, UploadsConfig::default());
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "api_url: https://shop.example.com").unwrap();
        writeln!(file, "user_id: seller-7").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.api_url.value, "https://shop.example.com");
        assert_eq!(config.api_url.source, ConfigSource::File);
        assert_eq!(config.user_id.value.as_deref(), Some("seller-7"));
        assert_eq!(config.user_id.source, ConfigSource::File);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_partial_uploads_section() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "uploads:").unwrap();
        writeln!(file, "  max_images: 4").unwrap();
        writeln!(file, "  upload_delay_ms: 0").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.uploads.max_images, 4);
        assert_eq!(config.uploads.max_image_bytes, 2 * 1024 * 1024);
        assert_eq!(config.uploads.staging_limits().max_images, 4);

        let pacing = config.uploads.pacing();
        assert!(pacing.between_uploads.is_zero());
        assert_eq!(pacing.between_deletions, Duration::from_millis(200));
        assert_eq!(pacing.before_refetch, Duration::from_millis(1000));
    }

    #[test]
    fn test_compression_settings() {
        let uploads = UploadsConfig {
            jpeg_quality: 0,
            ..Default::default()
        };
        let settings = uploads.compression();
        assert_eq!(settings.jpeg_quality, 1);
        assert_eq!(settings.max_dimension, 1200);
        assert_eq!(settings.threshold_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn test_require_user() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "api_url: localhost:9000").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        if config.user_id.source == ConfigSource::Default {
            let err = config.require_user().unwrap_err();
            assert!(err.to_string().contains("MARKET_USER_ID"));
        }
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "api_url: http://fromfile").unwrap();

        // Set env var
        std::env::set_var("MARKET_API_URL", "http://fromenv");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.api_url.value, "http://fromenv");
        assert_eq!(config.api_url.source, ConfigSource::Environment);

        // Clean up
        std::env::remove_var("MARKET_API_URL");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
