use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub scraper: ScraperConfig,
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite:rss_aggregator.db?mode=rwc".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    /// Seconds between scheduler ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Feeds claimed per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_batch_size() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: default_database_url(),
            scraper: ScraperConfig::default(),
        }
    }
}

impl ScraperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults, then
    /// apply `PORT` and `DATABASE_URL` from the environment.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_overrides(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("DATABASE_URL").ok().as_deref(),
        )?;
        Ok(config)
    }

    pub fn apply_overrides(
        &mut self,
        port: Option<&str>,
        database_url: Option<&str>,
    ) -> anyhow::Result<()> {
        if let Some(port) = port {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT '{}': {}", port, e))?;
        }
        if let Some(url) = database_url {
            self.database_url = url.to_string();
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.scraper.interval_secs == 0 {
            anyhow::bail!("scraper.interval_secs must be positive");
        }
        if self.scraper.batch_size == 0 {
            anyhow::bail!("scraper.batch_size must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.scraper.interval_secs, 60);
        assert_eq!(config.scraper.batch_size, 10);
        assert_eq!(config.scraper.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            port = 3000
            database_url = "sqlite::memory:"

            [scraper]
            interval_secs = 30
            batch_size = 4
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.scraper.interval(), Duration::from_secs(30));
        assert_eq!(config.scraper.batch_size, 4);
        assert_eq!(config.scraper.request_timeout_secs, 30); // Default value
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite:rss_aggregator.db?mode=rwc");
        assert_eq!(config.scraper.batch_size, 10);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_with_env_missing_file_falls_back() {
        let config = Config::load_with_env("/nonexistent/path/config.toml");
        assert!(config.is_ok());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let content = r#"
            [scraper]
            batch_size = 0
        "#;

        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let content = r#"
            [scraper]
            interval_secs = 0
        "#;

        assert!(Config::from_str(content).is_err());
    }

    mod override_tests {
        use super::*;

        #[test]
        fn test_overrides_replace_file_values() {
            let mut config = Config::default();
            config
                .apply_overrides(Some("9000"), Some("sqlite:other.db"))
                .unwrap();

            assert_eq!(config.port, 9000);
            assert_eq!(config.database_url, "sqlite:other.db");
        }

        #[test]
        fn test_missing_overrides_keep_values() {
            let mut config = Config::default();
            config.apply_overrides(None, None).unwrap();

            assert_eq!(config.port, 8080);
        }

        #[test]
        fn test_invalid_port_override() {
            let mut config = Config::default();
            let result = config.apply_overrides(Some("not-a-port"), None);
            assert!(result.is_err());
        }
    }
}
