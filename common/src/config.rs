use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_url: String,
    /// Validity applied by a request layer when the caller omits one.
    pub token_validity_minutes: u32,
    /// Pixel size applied by a request layer when the caller omits one.
    pub qr_size: u32,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Default for Config {
    fn default() -> Self {
        Config {
            project_name: "roll-call".into(),
            log_level: "info".into(),
            log_file: "roll-call.log".into(),
            log_to_stdout: false,
            database_url: "sqlite://data/roll-call.db?mode=rwc".into(),
            token_validity_minutes: 5,
            qr_size: 250,
        }
    }
}

impl Config {
    /// Loads `env_path` (if present) plus the process environment, once.
    ///
    /// Later calls return the instance built by the first one.
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let config = Self::from_env();
            if let Some(parent) = std::path::Path::new(&config.log_file).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).expect("Failed to create log directory");
                }
            }
            config
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized")
    }

    /// Builds a config from environment variables without touching the global.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            project_name: env::var("PROJECT_NAME").unwrap_or(defaults.project_name),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_file: env::var("LOG_FILE").unwrap_or(defaults.log_file),
            log_to_stdout: env::var("LOG_TO_STDOUT")
                .map(|v| v == "true")
                .unwrap_or(defaults.log_to_stdout),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            token_validity_minutes: env::var("TOKEN_VALIDITY_MINUTES")
                .ok()
                .and_then(|m| m.parse().ok())
                .filter(|m| *m > 0)
                .unwrap_or(defaults.token_validity_minutes),
            qr_size: env::var("QR_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.qr_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_request_layer_expectations() {
        let config = Config::default();
        assert_eq!(config.token_validity_minutes, 5);
        assert_eq!(config.qr_size, 250);
        assert!(config.database_url.starts_with("sqlite:"));
    }
}
