use std::env;
use std::fmt;

use thiserror::Error;

use crate::database::models::LeadField;
use crate::validation::ValidationRules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingJwtSecret,

    #[error("DATABASE_URL is required in production")]
    MissingDatabaseUrl,

    #[error("DATABASE_URL must be a postgres:// or postgresql:// URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Unknown lead field in {var}: {field}")]
    UnknownField { var: &'static str, field: String },

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error("API_DEFAULT_PAGE_SIZE ({default}) must be between 1 and API_MAX_PAGE_SIZE ({max})")]
    InvalidPageSize { default: u32, max: u32 },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub validation: ValidationRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL URL. When absent the in-memory store is used (not allowed in production).
    pub url: Option<String>,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub export_batch_size: u32,
}

#[derive(Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// Cookie checked for a token before the Authorization header
    pub auth_cookie: String,
    pub cors_origins: Vec<String>,
    /// Also require a token on list, get and export
    pub protect_reads: bool,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("auth_cookie", &self.auth_cookie)
            .field("cors_origins", &self.cors_origins)
            .field("protect_reads", &self.protect_reads)
            .finish()
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("PORT") {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("EXPORT_BATCH_SIZE") {
            self.api.export_batch_size = v.parse().unwrap_or(self.api.export_batch_size);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_AUTH_COOKIE") {
            if !v.trim().is_empty() {
                self.security.auth_cookie = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SECURITY_PROTECT_READS") {
            self.security.protect_reads = parse_flag("SECURITY_PROTECT_READS", &v)?;
        }

        // Validation overrides
        if let Ok(v) = env::var("LEAD_REQUIRED_ON_CREATE") {
            self.validation.required_on_create = parse_field_list("LEAD_REQUIRED_ON_CREATE", &v)?;
        }
        if let Ok(v) = env::var("LEAD_REQUIRED_ON_UPDATE") {
            self.validation.required_on_update = parse_field_list("LEAD_REQUIRED_ON_UPDATE", &v)?;
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }

        match &self.database.url {
            Some(url) => {
                let parsed = url::Url::parse(url)
                    .map_err(|_| ConfigError::InvalidDatabaseUrl("unparseable".to_string()))?;
                if !matches!(parsed.scheme(), "postgres" | "postgresql") {
                    return Err(ConfigError::InvalidDatabaseUrl(format!(
                        "scheme '{}'",
                        parsed.scheme()
                    )));
                }
            }
            None if self.environment.is_production() => {
                return Err(ConfigError::MissingDatabaseUrl);
            }
            None => {}
        }

        if self.api.default_page_size == 0 || self.api.default_page_size > self.api.max_page_size {
            return Err(ConfigError::InvalidPageSize {
                default: self.api.default_page_size,
                max: self.api.max_page_size,
            });
        }

        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 5000,
                max_request_size_bytes: 1024 * 1024, // 1MB
                default_page_size: 20,
                max_page_size: 100,
                export_batch_size: 500,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
                auth_cookie: "token".to_string(),
                cors_origins: vec!["http://localhost:3000".to_string()],
                protect_reads: false,
            },
            validation: ValidationRules::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 5000,
                max_request_size_bytes: 512 * 1024,
                default_page_size: 20,
                max_page_size: 100,
                export_batch_size: 1000,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                auth_cookie: "token".to_string(),
                cors_origins: vec!["https://staging.example.com".to_string()],
                protect_reads: false,
            },
            validation: ValidationRules::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 5000,
                max_request_size_bytes: 256 * 1024,
                default_page_size: 20,
                max_page_size: 100,
                export_batch_size: 1000,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                auth_cookie: "token".to_string(),
                cors_origins: vec!["https://app.example.com".to_string()],
                protect_reads: false,
            },
            validation: ValidationRules::default(),
        }
    }
}

/// Boolean switch that refuses to guess on unrecognised input
fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_field_list(var: &'static str, value: &str) -> Result<Vec<LeadField>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<LeadField>().map_err(|_| ConfigError::UnknownField {
                var,
                field: s.to_string(),
            })
        })
        .collect()
}
