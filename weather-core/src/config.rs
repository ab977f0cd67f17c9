use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, path::PathBuf};

pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
pub const BIND_ENV: &str = "WEATHER_BIND";
pub const PORT_ENV: &str = "PORT";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 256;
/// Longest horizon the free OpenWeather forecast covers.
pub const PROVIDER_MAX_HORIZON_DAYS: u32 = 5;

/// Credential and transport settings for the weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Zero disables memoization.
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub max_horizon_days: u32,
    /// A leading day with fewer samples than this is treated as partial.
    pub min_first_day_samples: usize,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            max_horizon_days: PROVIDER_MAX_HORIZON_DAYS,
            min_first_day_samples: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    pub resolve_limit: usize,
    pub autocomplete_limit: usize,
    pub autocomplete_min_chars: usize,
    pub dedup_tolerance_deg: f64,
    pub popular_cities: Vec<String>,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            resolve_limit: 5,
            autocomplete_limit: 10,
            autocomplete_min_chars: 2,
            dedup_tolerance_deg: 0.01,
            popular_cities: [
                "New York",
                "London",
                "Tokyo",
                "Paris",
                "Sydney",
                "Los Angeles",
                "Berlin",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub log_level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [provider]
/// api_key = "..."
///
/// [cache]
/// ttl_secs = 300
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderSettings,
    pub cache: CacheSettings,
    pub forecast: ForecastSettings,
    pub lookup: LookupSettings,
    pub server: ServerSettings,
}

impl Config {
    /// Load config from the platform config dir, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config dir, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-dashboard", "weather-server")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.provider.api_key = Some(api_key.trim().to_string());
    }

    /// The provider credential, if one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.provider
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Overlay environment variables on top of the file configuration.
    pub fn with_env_overrides<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let lookup = |name: &str| {
            env.get(name)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        if let Some(key) = lookup(API_KEY_ENV) {
            self.provider.api_key = Some(key.to_string());
        }

        if let Some(bind) = lookup(BIND_ENV) {
            self.server.bind = bind.to_string();
        } else if let Some(port) = lookup(PORT_ENV).and_then(|p| p.parse::<u16>().ok()) {
            self.server.bind = format!("0.0.0.0:{port}");
        }

        self
    }

    /// Validate settings that would otherwise fail deep inside a request.
    pub fn validate(&self) -> Result<()> {
        if !(1..=120).contains(&self.provider.timeout_secs) {
            bail!("Provider timeout must be between 1 and 120 seconds");
        }

        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            bail!("Provider base URL must be a valid HTTP or HTTPS URL");
        }

        if self.cache.ttl_secs > 3600 {
            bail!("Cache TTL cannot exceed 3600 seconds");
        }

        if !(1..=PROVIDER_MAX_HORIZON_DAYS).contains(&self.forecast.max_horizon_days) {
            bail!("Forecast horizon must be between 1 and {PROVIDER_MAX_HORIZON_DAYS} days");
        }

        if self.lookup.resolve_limit == 0 || self.lookup.autocomplete_limit == 0 {
            bail!("Lookup limits must be at least 1");
        }

        if !(self.lookup.dedup_tolerance_deg.is_finite() && self.lookup.dedup_tolerance_deg >= 0.0)
        {
            bail!("Deduplication tolerance must be a non-negative number of degrees");
        }

        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.server.log_level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: {}",
                self.server.log_level,
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_provider_limits() {
        let cfg = Config::default();
        assert_eq!(cfg.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.forecast.max_horizon_days, 5);
        assert_eq!(cfg.lookup.resolve_limit, 5);
        assert_eq!(cfg.cache.ttl_secs, 300);
        assert!(cfg.api_key().is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_api_key_and_bind() {
        let cfg = Config::default().with_env_overrides([
            (API_KEY_ENV, " env-key "),
            (BIND_ENV, "127.0.0.1:8080"),
            (PORT_ENV, "9999"),
        ]);

        assert_eq!(cfg.api_key(), Some("env-key"));
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn port_env_binds_all_interfaces() {
        let cfg = Config::default().with_env_overrides([(PORT_ENV, "8000")]);
        assert_eq!(cfg.server.bind, "0.0.0.0:8000");

        let cfg = Config::default().with_env_overrides([(PORT_ENV, "not-a-port")]);
        assert_eq!(cfg.server.bind, ServerSettings::default().bind);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.set_api_key("   ".into());
        assert!(cfg.api_key().is_none());

        cfg.set_api_key("KEY".into());
        assert_eq!(cfg.api_key(), Some("KEY"));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut cfg = Config::default();
        cfg.forecast.max_horizon_days = 10;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Forecast horizon"));

        let mut cfg = Config::default();
        cfg.server.log_level = "loud".into();
        assert!(cfg.validate().unwrap_err().to_string().contains("Invalid log level"));

        let mut cfg = Config::default();
        cfg.provider.base_url = "ftp://example.com".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn save_and_load_round_trip_through_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("OPEN_KEY".into());
        cfg.cache.ttl_secs = 60;
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_loads_defaults_and_partial_file_fills_gaps() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        assert_eq!(Config::load_from(&missing).expect("load"), Config::default());

        let partial = dir.path().join("partial.toml");
        fs::write(&partial, "[provider]\napi_key = \"abc\"\n").expect("write");
        let loaded = Config::load_from(&partial).expect("load");
        assert_eq!(loaded.api_key(), Some("abc"));
        assert_eq!(loaded.provider.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(loaded.lookup, LookupSettings::default());
    }
}
