use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub paystack: PaystackConfig,
    pub vision: VisionConfig,
    #[serde(default)]
    pub geo: GeoConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 key shared with the identity provider that mints session
    /// tokens.
    pub session_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaystackConfig {
    pub secret_key: String,
    #[serde(default = "default_paystack_base_url")]
    pub base_url: String,
    #[serde(default = "default_paystack_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VisionConfig {
    pub api_key: String,
    #[serde(default = "default_vision_base_url")]
    pub base_url: String,
    #[serde(default = "default_vision_model")]
    pub model: String,
    #[serde(default = "default_vision_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeoConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

fn default_paystack_base_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_paystack_timeout() -> u64 {
    15
}

fn default_vision_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_vision_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_vision_timeout() -> u64 {
    20
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            base_url: "http://ip-api.com".to_string(),
            // The lookup must never hold up content rendering.
            timeout_secs: 5,
        }
    }
}

impl Settings {
    /// Load and validate configuration. Missing service credentials are
    /// a refusal to start, not a silent per-call degradation.
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.url", "sqlite://supriseal.db")?
            .set_default("database.max_connections", 10)?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Environment variables (SUPRISEAL__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("SUPRISEAL").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.session_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.session_secret must be set".to_string(),
            ));
        }
        if self.paystack.secret_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "paystack.secret_key must be set".to_string(),
            ));
        }
        if self.vision.api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "vision.api_key must be set".to_string(),
            ));
        }
        Ok(())
    }
}
