use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Twilio account used to send replies
    pub twilio: TwilioConfig,
    /// Country statistics API
    pub stats: StatsConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
}

/// Twilio provider configuration.
///
/// Empty credentials are accepted here and only rejected when a reply is sent.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TwilioConfig {
    /// Twilio Account SID
    pub account_sid: String,
    /// Twilio Auth Token
    pub auth_token: String,
    /// Number replies are sent from
    pub phone_number: String,
    /// API base URL (default: https://api.twilio.com)
    pub base_url: String,
}

/// Country statistics API configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StatsConfig {
    /// Base URL; lookups go to `{base_url}/countries/{country}`
    pub base_url: String,
}

/// Security configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Check X-Twilio-Signature on inbound webhooks (default: false)
    pub verify_signatures: bool,
    /// Public URL Twilio posts to, as configured in the Twilio console.
    /// Required when `verify_signatures` is set.
    pub public_url: Option<String>,
    /// Maximum request body size in bytes (default: 1MB)
    pub max_body_size: usize,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: json or pretty (default: json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            phone_number: String::new(),
            base_url: sms_twilio::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            base_url: covid_stats::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            verify_signatures: false,
            public_url: None,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(Config::try_from(&AppConfig::default())?)
            // Add configuration file based on environment
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local configuration file (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with COVIDBOT_)
            .add_source(Environment::with_prefix("COVIDBOT").separator("__"))
            // The variable names Twilio's own tooling uses win over everything else
            .set_override_option("twilio.account_sid", env::var("TWILIO_ACCOUNT_SID").ok())?
            .set_override_option("twilio.auth_token", env::var("TWILIO_AUTH_TOKEN").ok())?
            .set_override_option("twilio.phone_number", env::var("TWILIO_PHONE_NUMBER").ok())?
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that cannot wait until the first request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.verify_signatures && self.security.public_url.is_none() {
            return Err(ConfigError::Message(
                "security.verify_signatures requires security.public_url".into(),
            ));
        }
        match self.logging.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(ConfigError::Message(format!(
                "logging.format must be json or pretty, got {}",
                other
            ))),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
