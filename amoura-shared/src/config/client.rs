use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};

/// Tuning knobs for the realtime reconciliation listener.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// Delay between resubscription attempts, in milliseconds.
    pub resubscribe_delay_ms: u64,

    /// Attempt budget before the listener gives up and reports a degraded
    /// state. `None` retries indefinitely.
    pub max_attempts: Option<u32>,

    /// How long to wait for the backend to acknowledge a subscription before
    /// treating the attempt as failed, in milliseconds.
    pub ack_timeout_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            resubscribe_delay_ms: 2_000,
            max_attempts: Some(10),
            ack_timeout_ms: 10_000,
        }
    }
}

impl RealtimeConfig {
    /// Delay between resubscription attempts.
    #[must_use]
    pub const fn resubscribe_delay(&self) -> Duration {
        Duration::from_millis(self.resubscribe_delay_ms)
    }

    /// Subscription acknowledgment window.
    #[must_use]
    pub const fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

/// The main configuration structure for the Amoura client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the hosted backend.
    pub backend_url: String,

    /// API key presented to the backend; the auth collaborator issues the
    /// per-user token separately.
    pub api_key: Option<String>,

    /// Logging level.
    pub log_level: String,

    /// Realtime listener tuning.
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

impl Config {
    /// Generates a default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            api_key: None,
            log_level: "info".to_string(),
            realtime: RealtimeConfig::default(),
        }
    }

    /// Conventional per-user config file location, if the platform has one.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("app", "Amoura", "amoura")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The conventional config file location, but only when a file actually
    /// exists there.
    #[must_use]
    pub fn default_config_path_if_present() -> Option<PathBuf> {
        Self::default_config_path().filter(|path| path.exists())
    }

    /// Loads the configuration from a file, environment variables, or
    /// defaults.
    ///
    /// # Arguments
    /// * `config_path` - Optional path to a TOML configuration file.
    /// * `url_override` - Optional backend URL that wins over everything.
    ///
    /// # Returns
    /// A [`Config`] with all values resolved, or an error if loading fails.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed, an
    /// environment override is malformed, or validation fails.
    pub fn load_config(
        config_path: Option<PathBuf>,
        url_override: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Config::with_defaults();

        // Load from file if provided
        if let Some(path) = config_path {
            let content = fs::read_to_string(&path)?;
            config = toml::from_str(&content)?;
        }

        // Use environment variables only if values are not already set
        if config.backend_url == Config::with_defaults().backend_url
            && let Ok(url) = env::var("AMOURA_BACKEND_URL")
        {
            config.backend_url = url;
        }
        if config.api_key.is_none()
            && let Ok(key) = env::var("AMOURA_API_KEY")
        {
            config.api_key = Some(key);
        }
        if config.log_level == Config::with_defaults().log_level
            && let Ok(log_level) = env::var("AMOURA_LOG_LEVEL")
        {
            config.log_level = log_level;
        }
        if let Ok(delay) = env::var("AMOURA_RESUBSCRIBE_DELAY_MS") {
            config.realtime.resubscribe_delay_ms = delay.parse().map_err(|_| {
                "Invalid AMOURA_RESUBSCRIBE_DELAY_MS value: must be a number of milliseconds"
            })?;
        }

        // Override with command-line arguments if provided
        if let Some(url) = url_override {
            config.backend_url = url;
        }

        // Validate configuration
        if config.backend_url.is_empty() {
            return Err("Invalid backend URL. Must not be empty.".into());
        }
        if config.realtime.ack_timeout_ms == 0 {
            return Err("Invalid realtime ack timeout. Must be greater than 0.".into());
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for key in [
            "AMOURA_BACKEND_URL",
            "AMOURA_API_KEY",
            "AMOURA_LOG_LEVEL",
            "AMOURA_RESUBSCRIBE_DELAY_MS",
        ] {
            // Safety: tests touching process env are serialized.
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn defaults_are_valid() {
        clear_env();
        let config = Config::load_config(None, None).unwrap();

        assert_eq!(config, Config::with_defaults());
        assert_eq!(config.realtime.resubscribe_delay(), Duration::from_secs(2));
        assert_eq!(config.realtime.max_attempts, Some(10));
    }

    #[test]
    #[serial]
    fn file_values_win_over_defaults() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "backend_url = \"https://api.amoura.app\"\nlog_level = \"debug\"\n\n[realtime]\nresubscribe_delay_ms = 500\nmax_attempts = 3\nack_timeout_ms = 1000"
        )
        .unwrap();

        let config = Config::load_config(Some(file.path().to_path_buf()), None).unwrap();

        assert_eq!(config.backend_url, "https://api.amoura.app");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.realtime.max_attempts, Some(3));
        assert_eq!(
            config.realtime.resubscribe_delay(),
            Duration::from_millis(500)
        );
    }

    #[test]
    #[serial]
    fn env_fills_unset_values() {
        clear_env();
        // Safety: tests touching process env are serialized.
        unsafe {
            env::set_var("AMOURA_BACKEND_URL", "https://env.amoura.app");
            env::set_var("AMOURA_API_KEY", "key-from-env");
        }

        let config = Config::load_config(None, None).unwrap();
        clear_env();

        assert_eq!(config.backend_url, "https://env.amoura.app");
        assert_eq!(config.api_key.as_deref(), Some("key-from-env"));
    }

    #[test]
    #[serial]
    fn cli_override_wins() {
        clear_env();
        // Safety: tests touching process env are serialized.
        unsafe { env::set_var("AMOURA_BACKEND_URL", "https://env.amoura.app") };

        let config = Config::load_config(None, Some("https://cli.amoura.app".into())).unwrap();
        clear_env();

        assert_eq!(config.backend_url, "https://cli.amoura.app");
    }

    #[test]
    #[serial]
    fn malformed_delay_env_is_an_error() {
        clear_env();
        // Safety: tests touching process env are serialized.
        unsafe { env::set_var("AMOURA_RESUBSCRIBE_DELAY_MS", "soon") };

        let result = Config::load_config(None, None);
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn missing_realtime_section_defaults() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend_url = \"https://api.amoura.app\"\nlog_level = \"info\"").unwrap();

        let config = Config::load_config(Some(file.path().to_path_buf()), None).unwrap();

        assert_eq!(config.realtime, RealtimeConfig::default());
    }
}
