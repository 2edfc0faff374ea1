use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::intervals::scheduler::DEFAULT_POLL_INTERVAL;
use crate::security::rate_limit::MAX_WINDOW_SECONDS;
use crate::security::RateLimitRule;
use crate::youtube::client::DEFAULT_API_BASE;

/// Configuration for the FocusTube server and CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// YouTube Data API settings
    pub youtube: YouTubeConfig,

    /// Persistent storage settings
    pub storage: StorageConfig,

    /// Playback scheduler settings
    pub scheduler: SchedulerSettings,

    /// Request throttling
    pub rate_limit: RateLimitConfig,

    /// Security event log
    pub security: SecurityConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Allow cross-origin requests from any origin
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    /// Base URL of the Data API (overridable for testing)
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON document per user
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Polling cadence in milliseconds
    pub poll_interval_ms: u64,

    /// Whether playback loops back to the first interval by default
    pub loop_by_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// How often expired windows are swept, in seconds
    pub cleanup_interval_seconds: u64,

    /// Applied to every `/api/*` route
    pub api: RateLimitRule,

    /// Applied on top of `api` for catalog browsing routes
    pub playlist: RateLimitRule,

    /// Failed authentication attempts per client
    pub auth: RateLimitRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Number of events kept in memory
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl SchedulerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load configuration from the first readable file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = [
            "focustube.toml",
            "config/focustube.toml",
            "/etc/focustube/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env_overrides(|key| std::env::var(key).ok());
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        tracing::info!("📄 Loaded configuration from: {}", path.display());
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults with environment variable overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `FOCUSTUBE_*` overrides; unparsable numbers keep the current value
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("FOCUSTUBE_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("FOCUSTUBE_PORT") {
            self.server.port = port.parse().unwrap_or(self.server.port);
        }

        if let Some(api_base) = lookup("FOCUSTUBE_YOUTUBE_API_BASE") {
            self.youtube.api_base = api_base;
        }

        if let Some(data_dir) = lookup("FOCUSTUBE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Some(poll) = lookup("FOCUSTUBE_POLL_INTERVAL_MS") {
            self.scheduler.poll_interval_ms = poll.parse().unwrap_or(self.scheduler.poll_interval_ms);
        }

        if let Some(log_level) = lookup("FOCUSTUBE_LOG_LEVEL") {
            self.logging.level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be greater than 0"));
        }

        if self.scheduler.poll_interval_ms == 0 {
            return Err(anyhow!("scheduler.poll_interval_ms must be greater than 0"));
        }

        if self.youtube.timeout_seconds == 0 {
            return Err(anyhow!("youtube.timeout_seconds must be greater than 0"));
        }

        url::Url::parse(&self.youtube.api_base)
            .map_err(|e| anyhow!("youtube.api_base is not a valid URL: {}", e))?;

        for (name, rule) in [
            ("api", &self.rate_limit.api),
            ("playlist", &self.rate_limit.playlist),
            ("auth", &self.rate_limit.auth),
        ] {
            if rule.max_requests == 0 || rule.window_seconds == 0 {
                return Err(anyhow!("rate_limit.{} needs a non-zero limit and window", name));
            }
            if !rule.has_bounded_window() {
                return Err(anyhow!(
                    "rate_limit.{}.window_seconds must be at most {}",
                    name,
                    MAX_WINDOW_SECONDS
                ));
            }
        }

        if self.security.event_capacity == 0 {
            return Err(anyhow!("security.event_capacity must be greater than 0"));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "FocusTube Configuration:\n\
            - Listen Address: {}\n\
            - YouTube API: {}\n\
            - Data Directory: {}\n\
            - Poll Interval: {}ms\n\
            - Rate Limiting: {} (api {}/{}s, playlist {}/{}s)\n\
            - Security Log Capacity: {}\n\
            - Log Level: {}",
            self.server.bind_address(),
            self.youtube.api_base,
            self.storage.data_dir.display(),
            self.scheduler.poll_interval_ms,
            if self.rate_limit.enabled { "enabled" } else { "disabled" },
            self.rate_limit.api.max_requests,
            self.rate_limit.api.window_seconds,
            self.rate_limit.playlist.max_requests,
            self.rate_limit.playlist.window_seconds,
            self.security.event_capacity,
            self.logging.level
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                enable_cors: true,
            },
            youtube: YouTubeConfig {
                api_base: DEFAULT_API_BASE.to_string(),
                timeout_seconds: 30,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("./data"),
            },
            scheduler: SchedulerSettings {
                poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
                loop_by_default: false,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                cleanup_interval_seconds: 60,
                api: RateLimitRule::api(),
                playlist: RateLimitRule::playlist(),
                auth: RateLimitRule::auth(),
            },
            security: SecurityConfig {
                event_capacity: crate::security::events::DEFAULT_CAPACITY,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.data_dir = dir;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.config.youtube.api_base = api_base.into();
        self
    }

    pub fn with_poll_interval_ms(mut self, millis: u64) -> Self {
        self.config.scheduler.poll_interval_ms = millis;
        self
    }

    pub fn with_api_rate_limit(mut self, rule: RateLimitRule) -> Self {
        self.config.rate_limit.api = rule;
        self
    }

    pub fn with_playlist_rate_limit(mut self, rule: RateLimitRule) -> Self {
        self.config.rate_limit.playlist = rule;
        self
    }

    pub fn with_auth_rate_limit(mut self, rule: RateLimitRule) -> Self {
        self.config.rate_limit.auth = rule;
        self
    }

    pub fn enable_rate_limiting(mut self, enable: bool) -> Self {
        self.config.rate_limit.enabled = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
