use crate::ml::loader::DevicePreference;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix, e.g. `TICKET_CLF__MODEL__PATH`
pub const ENV_PREFIX: &str = "TICKET_CLF";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Model artifact and inference configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: TICKET_CLF_)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("model.extra_candidates")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Socket address the HTTP server binds to
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Allow any origin, method and header
    #[serde(default = "default_true")]
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            cors_permissive: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Explicit artifact directory, tried before anything else
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Root the conventional artifact layouts are resolved against
    #[serde(default = "default_search_root")]
    pub search_root: PathBuf,

    /// Additional candidates, tried after `path`
    #[serde(default)]
    pub extra_candidates: Vec<PathBuf>,

    /// Fixed token length for padding and truncation
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Compute device preference
    #[serde(default)]
    pub device: DevicePreference,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            search_root: default_search_root(),
            extra_candidates: Vec::new(),
            max_length: default_max_length(),
            device: DevicePreference::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_search_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_length() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "ticket-classifier".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_http_port(), 8000);
        assert_eq!(default_max_length(), 256);
        assert_eq!(default_log_level(), "info");
        assert!(default_true());
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.http_port, 8000);
        assert_eq!(config.model.max_length, 256);
        assert_eq!(config.model.device, DevicePreference::Auto);
        assert!(config.model.path.is_none());
        assert_eq!(config.http_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_model_overrides() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [model]
                path = "/content/drive/MyDrive/distilbert_ticket_classifier_model"
                device = "cpu"
                max_length = 128
                extra_candidates = ["/opt/models/tickets"]
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.model.device, DevicePreference::Cpu);
        assert_eq!(config.model.max_length, 128);
        assert_eq!(config.model.extra_candidates, vec![PathBuf::from("/opt/models/tickets")]);
        assert_eq!(config.server.http_port, 8000);
    }
}
