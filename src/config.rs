//! Configuration management

use anyhow::{Context, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Root directory of the upload storage; import `source_location`
    /// handles are resolved relative to it
    pub storage_dir: String,

    /// Public base URL of the app, used for links in notification emails
    pub app_base_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        let storage_dir = std::env::var("STORAGE_DIR")
            .unwrap_or_else(|_| "./storage".to_string());

        let app_base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "https://app.rosterline.io".to_string());

        Ok(Self {
            nats_url,
            database_url,
            storage_dir,
            app_base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_storage_dir_uses_env_when_set() {
        std::env::set_var("STORAGE_DIR", "/var/lib/rosterline/uploads");
        std::env::set_var("DATABASE_URL", "postgres://test");

        let config = Config::from_env().unwrap();
        assert_eq!(config.storage_dir, "/var/lib/rosterline/uploads");

        // Cleanup
        std::env::remove_var("STORAGE_DIR");
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_defaults_when_unset() {
        std::env::remove_var("NATS_URL");
        std::env::remove_var("STORAGE_DIR");
        std::env::set_var("DATABASE_URL", "postgres://test");

        let config = Config::from_env().unwrap();
        assert_eq!(config.nats_url, "nats://localhost:4222");
        assert_eq!(config.storage_dir, "./storage");
        assert_eq!(config.app_base_url, "https://app.rosterline.io");
    }
}
