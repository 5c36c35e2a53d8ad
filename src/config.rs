//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use std::env;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub nowpayments: NowPaymentsConfig,
    pub identity: IdentityConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used to build the IPN callback URL
    pub public_base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,   // seconds
    pub idle_timeout: Option<u64>, // seconds
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

/// NOWPayments provider configuration
#[derive(Debug, Clone)]
pub struct NowPaymentsConfig {
    pub api_key: String,
    pub ipn_secret: String,
    pub base_url: String,
    pub request_timeout: u64, // seconds
    pub max_retries: u32,
    /// Accept callbacks without a signature header. Test environments only;
    /// production deployments must leave this off.
    pub allow_unsigned_ipn: bool,
}

/// Identity provider configuration (bearer-token resolution)
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
    pub service_key: String,
    pub request_timeout: u64, // seconds
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            nowpayments: NowPaymentsConfig::from_env()?,
            identity: IdentityConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.nowpayments.validate()?;
        self.identity.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue("PORT cannot be 0".to_string()));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue("HOST cannot be empty".to_string()));
        }

        if !self.public_base_url.starts_with("http://")
            && !self.public_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue(
                "PUBLIC_BASE_URL must be a valid URL".to_string(),
            ));
        }

        Ok(())
    }

    /// IPN callback URL handed to the provider on payment creation
    pub fn ipn_callback_url(&self) -> String {
        format!(
            "{}/nowpayments-webhook",
            self.public_base_url.trim_end_matches('/')
        )
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|val| val.parse().ok()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl NowPaymentsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(NowPaymentsConfig {
            api_key: env::var("NOWPAYMENTS_API_KEY")
                .map_err(|_| ConfigError::MissingVariable("NOWPAYMENTS_API_KEY".to_string()))?,
            ipn_secret: env::var("NOWPAYMENTS_IPN_SECRET")
                .map_err(|_| ConfigError::MissingVariable("NOWPAYMENTS_IPN_SECRET".to_string()))?,
            base_url: env::var("NOWPAYMENTS_BASE_URL")
                .unwrap_or_else(|_| "https://api.nowpayments.io/v1".to_string()),
            request_timeout: env::var("NOWPAYMENTS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("NOWPAYMENTS_TIMEOUT_SECS".to_string()))?,
            max_retries: env::var("NOWPAYMENTS_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("NOWPAYMENTS_MAX_RETRIES".to_string()))?,
            allow_unsigned_ipn: env::var("NOWPAYMENTS_IPN_ALLOW_UNSIGNED")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                == "true",
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue("NOWPAYMENTS_API_KEY".to_string()));
        }

        if self.ipn_secret.trim().is_empty() && !self.allow_unsigned_ipn {
            return Err(ConfigError::InvalidValue(
                "NOWPAYMENTS_IPN_SECRET".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "NOWPAYMENTS_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "NOWPAYMENTS_TIMEOUT_SECS".to_string(),
            ));
        }

        Ok(())
    }
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(IdentityConfig {
            base_url: env::var("IDENTITY_BASE_URL")
                .map_err(|_| ConfigError::MissingVariable("IDENTITY_BASE_URL".to_string()))?,
            service_key: env::var("IDENTITY_SERVICE_KEY")
                .map_err(|_| ConfigError::MissingVariable("IDENTITY_SERVICE_KEY".to_string()))?,
            request_timeout: env::var("IDENTITY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("IDENTITY_TIMEOUT_SECS".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "IDENTITY_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.service_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue("IDENTITY_SERVICE_KEY".to_string()));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}
