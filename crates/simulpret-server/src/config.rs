//! Server settings
//!
//! Priority: `SIMULPRET__*` environment variables > config file > defaults.

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ServerError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed browser origins; `"*"` allows any, empty means the local
    /// front-end only
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Simulation policy file (YAML or JSON)
    #[serde(default)]
    pub policy_path: Option<String>,
    /// Fetched bank-rate table (JSON) merged over the reference rates
    #[serde(default)]
    pub bank_rates_path: Option<String>,
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            policy_path: None,
            bank_rates_path: None,
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional file (any format the `config` crate detects by
    /// extension) and the environment.
    pub fn load(path: Option<&str>) -> Result<Self, ServerError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix("SIMULPRET")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cors_origins"),
        );

        let settings: ServerConfig = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.host.trim().is_empty() {
            return Err(ServerError::Config("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(ServerError::Config("port must be non-zero".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<::config::ConfigError> for ServerError {
    fn from(err: ::config::ConfigError) -> Self {
        ServerError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert!(config.cors_origins.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ServerConfig::load(Some("does/not/exist")).unwrap();
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_zero_port_rejected() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_config_allows_front_end() {
        let config = ServerConfig::load(Some("../../config/simulpret")).unwrap();
        assert_eq!(config.cors_origins, vec![crate::http::DEFAULT_CORS_ORIGIN.to_string()]);
    }
}
