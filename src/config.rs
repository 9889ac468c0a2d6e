use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::locator::title::DEFAULT_MAX_TITLE_CHARS;
use crate::page::QuerySpec;

/// Configuration for the video locator
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LocatorConfig {
    /// Extraction settings
    pub locator: ExtractionConfig,

    /// Late-content watcher settings
    pub watcher: WatcherConfig,

    /// Detection on page load
    pub auto_run: AutoRunConfig,

    /// Known video platform and its page layouts
    pub platform: PlatformConfig,

    /// Embedded player detection
    pub embeds: EmbedConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum title length in characters, at most 200
    pub title_max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Wait for late content on platform pages with no entries yet
    pub enabled: bool,

    /// Observation window in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoRunConfig {
    /// Run detection once when the page is ready
    pub enabled: bool,

    /// Delay after page readiness before detecting, in milliseconds
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Hosts (and their subdomains) treated as the video platform
    pub domains: Vec<String>,

    /// Query parameter marking a playlist view
    pub playlist_query_key: String,

    /// Path fragment marking a playlist view
    pub playlist_path_marker: String,

    /// Path fragment every home-page entry URL must contain
    pub watch_path_marker: String,

    /// Selectors tried before the built-in playlist layouts
    pub extra_playlist_selectors: Vec<String>,

    /// Selectors tried before the built-in home layouts
    pub extra_home_selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Frame source hosts recognized as video players
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter used by the CLI
    pub level: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            title_max_chars: DEFAULT_MAX_TITLE_CHARS,
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 3000,
        }
    }
}

impl Default for AutoRunConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settle_delay_ms: 1000,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            domains: vec!["youtube.com".to_string(), "youtu.be".to_string()],
            playlist_query_key: "list".to_string(),
            playlist_path_marker: "/playlist".to_string(),
            watch_path_marker: "/watch".to_string(),
            extra_playlist_selectors: Vec::new(),
            extra_home_selectors: Vec::new(),
        }
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            hosts: vec![
                "youtube.com".to_string(),
                "youtu.be".to_string(),
                "vimeo.com".to_string(),
                "dailymotion.com".to_string(),
                "twitch.tv".to_string(),
            ],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "video_locator=info,warn".to_string(),
        }
    }
}

impl LocatorConfig {
    /// Load configuration from the first config file found, else from the environment
    pub fn load() -> Result<Self> {
        let config_paths = ["video-locator.toml", "config/video-locator.toml"];

        for path in &config_paths {
            if Path::new(path).exists() {
                match Self::load_from(path) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config file {}: {:#}", path, e),
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific TOML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults overridden by `VIDEO_LOCATOR_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("VIDEO_LOCATOR_WATCH_TIMEOUT_MS") {
            config.watcher.timeout_ms = timeout
                .parse()
                .with_context(|| format!("Invalid VIDEO_LOCATOR_WATCH_TIMEOUT_MS: {}", timeout))?;
        }

        if let Ok(delay) = std::env::var("VIDEO_LOCATOR_SETTLE_DELAY_MS") {
            config.auto_run.settle_delay_ms = delay
                .parse()
                .with_context(|| format!("Invalid VIDEO_LOCATOR_SETTLE_DELAY_MS: {}", delay))?;
        }

        if let Ok(domains) = std::env::var("VIDEO_LOCATOR_PLATFORM_DOMAINS") {
            config.platform.domains = split_list(&domains);
        }

        if let Ok(hosts) = std::env::var("VIDEO_LOCATOR_EMBED_HOSTS") {
            config.embeds.hosts = split_list(&hosts);
        }

        if let Ok(level) = std::env::var("VIDEO_LOCATOR_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.locator.title_max_chars == 0 || self.locator.title_max_chars > DEFAULT_MAX_TITLE_CHARS {
            return Err(anyhow!(
                "title_max_chars must be between 1 and {}",
                DEFAULT_MAX_TITLE_CHARS
            ));
        }

        if self.watcher.enabled && self.watcher.timeout_ms == 0 {
            return Err(anyhow!("watcher timeout_ms must be greater than 0 when the watcher is enabled"));
        }

        if self.platform.domains.iter().any(|d| d.trim().is_empty()) {
            return Err(anyhow!("platform domains must not be empty"));
        }

        if self.platform.watch_path_marker.is_empty() {
            return Err(anyhow!("watch_path_marker must not be empty"));
        }

        for host in &self.embeds.hosts {
            if host.trim().is_empty() || host.contains('"') {
                return Err(anyhow!("Invalid embed host: {:?}", host));
            }
        }

        let extra = self
            .platform
            .extra_playlist_selectors
            .iter()
            .chain(&self.platform.extra_home_selectors);
        for selector in extra {
            QuerySpec::new(selector.as_str())
                .compile()
                .map_err(|e| anyhow!("Invalid extra selector: {}", e))?;
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video Locator Configuration:\n\
            - Platform Domains: {}\n\
            - Embed Hosts: {}\n\
            - Watcher: {} ({}ms)\n\
            - Auto-run: {} ({}ms settle delay)\n\
            - Title Limit: {} chars\n\
            - Extra Selectors: {} playlist, {} home",
            self.platform.domains.join(", "),
            self.embeds.hosts.join(", "),
            if self.watcher.enabled { "enabled" } else { "disabled" },
            self.watcher.timeout_ms,
            if self.auto_run.enabled { "enabled" } else { "disabled" },
            self.auto_run.settle_delay_ms,
            self.locator.title_max_chars,
            self.platform.extra_playlist_selectors.len(),
            self.platform.extra_home_selectors.len(),
        )
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration builder for easy setup
pub struct ConfigBuilder {
    config: LocatorConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: LocatorConfig::default(),
        }
    }

    pub fn with_watch_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.watcher.timeout_ms = timeout_ms;
        self
    }

    pub fn enable_watcher(mut self, enabled: bool) -> Self {
        self.config.watcher.enabled = enabled;
        self
    }

    pub fn with_settle_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.auto_run.settle_delay_ms = delay_ms;
        self
    }

    pub fn enable_auto_run(mut self, enabled: bool) -> Self {
        self.config.auto_run.enabled = enabled;
        self
    }

    pub fn with_title_max_chars(mut self, max_chars: usize) -> Self {
        self.config.locator.title_max_chars = max_chars;
        self
    }

    pub fn with_platform_domains(mut self, domains: Vec<String>) -> Self {
        self.config.platform.domains = domains;
        self
    }

    pub fn with_playlist_selector(mut self, selector: impl Into<String>) -> Self {
        self.config.platform.extra_playlist_selectors.push(selector.into());
        self
    }

    pub fn with_home_selector(mut self, selector: impl Into<String>) -> Self {
        self.config.platform.extra_home_selectors.push(selector.into());
        self
    }

    pub fn with_embed_hosts(mut self, hosts: Vec<String>) -> Self {
        self.config.embeds.hosts = hosts;
        self
    }

    pub fn build(self) -> LocatorConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = LocatorConfig::default();
        assert_eq!(config.watcher.timeout_ms, 3000);
        assert_eq!(config.auto_run.settle_delay_ms, 1000);
        assert_eq!(config.locator.title_max_chars, 200);
        assert!(config.platform.domains.contains(&"youtu.be".to_string()));
        assert_eq!(config.embeds.hosts.len(), 5);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_watch_timeout_ms(500)
            .enable_auto_run(false)
            .with_playlist_selector("my-playlist a.title")
            .build();

        assert_eq!(config.watcher.timeout_ms, 500);
        assert!(!config.auto_run.enabled);
        assert_eq!(config.platform.extra_playlist_selectors, vec!["my-playlist a.title"]);
    }

    #[test]
    fn test_config_validation() {
        assert!(LocatorConfig::default().validate().is_ok());

        let bad_selector = ConfigBuilder::new().with_home_selector("a[[").build();
        assert!(bad_selector.validate().is_err());

        let no_window = ConfigBuilder::new().with_watch_timeout_ms(0).build();
        assert!(no_window.validate().is_err());
        let disabled = ConfigBuilder::new().with_watch_timeout_ms(0).enable_watcher(false).build();
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_title_limit_cannot_exceed_default_cap() {
        assert!(ConfigBuilder::new().with_title_max_chars(200).build().validate().is_ok());
        assert!(ConfigBuilder::new().with_title_max_chars(80).build().validate().is_ok());
        assert!(ConfigBuilder::new().with_title_max_chars(500).build().validate().is_err());
        assert!(ConfigBuilder::new().with_title_max_chars(0).build().validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("video-locator.toml");
        std::fs::write(&path, "[watcher]\ntimeout_ms = 750\n").unwrap();

        let config = LocatorConfig::load_from(&path).unwrap();
        assert_eq!(config.watcher.timeout_ms, 750);
        assert!(config.watcher.enabled);
        assert_eq!(config.auto_run.settle_delay_ms, 1000);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("saved.toml");
        let config = ConfigBuilder::new().with_title_max_chars(80).build();

        config.save(&path).unwrap();
        let reloaded = LocatorConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.locator.title_max_chars, 80);
        assert_eq!(reloaded.embeds.hosts, config.embeds.hosts);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a.com, ,b.tv "), vec!["a.com", "b.tv"]);
    }
}
