use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotewallConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub display: DisplayRuntimeConfig,
    #[serde(default)]
    pub store: StoreClientConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub socket_path: String,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/notewall.sock".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Socket path with a leading `~` expanded to the home directory.
    pub fn resolved_socket_path(&self) -> String {
        shellexpand::tilde(&self.socket_path).into_owned()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8767,
        }
    }
}

/// Typed confirmation phrases and capture TTL.
#[derive(Debug, Deserialize, Clone)]
pub struct ModerationConfig {
    pub delete_phrase: String,
    pub clear_all_phrase: String,
    pub reset_phrase: String,
    pub session_ttl_seconds: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            delete_phrase: "DELETE".to_string(),
            clear_all_phrase: "DELETE ALL".to_string(),
            reset_phrase: "RESET".to_string(),
            session_ttl_seconds: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayRuntimeConfig {
    pub enabled: bool,
    pub landscape_capacity: usize,
    pub exit_animation_ms: u64,
    pub frame_interval_ms: u64,
    pub viewport_height: f64,
    pub row_height: f64,
    pub focus_base_seconds: u64,
    pub focus_exit_ms: u64,
}

impl Default for DisplayRuntimeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            landscape_capacity: 12,
            exit_animation_ms: 600,
            frame_interval_ms: 17,
            viewport_height: 1920.0,
            row_height: 320.0,
            focus_base_seconds: 60,
            focus_exit_ms: 600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreClientConfig {
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for StoreClientConfig {
    fn default() -> Self {
        Self {
            reconnect_initial_ms: 100,
            reconnect_max_ms: 5000,
            request_timeout_ms: 5000,
        }
    }
}

impl NotewallConfig {
    /// Load from a TOML file, then apply `NOTEWALL_`-prefixed environment
    /// overrides (`NOTEWALL_HTTP__PORT=9000`).
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("NOTEWALL").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}
