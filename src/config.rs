use chrono::Duration as ChronoDuration;
use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    auth::{AuthConfig, LoginPolicy},
    services::{alerts::ThresholdLevels, sales::PointsPolicy, users::TokenLifetimes},
};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str = "retail_pos_development_secret_change_me_before_deploying";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Application environment
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// HS256 signing key
    #[validate(custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Key that signed tokens before the last rotation; verification only
    #[serde(default)]
    pub jwt_previous_secret: Option<String>,

    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,

    /// Access token lifetime in seconds
    #[validate(range(min = 1))]
    pub jwt_expiration: i64,

    /// Access token lifetime with `remember_me`, in seconds
    #[serde(default = "default_remember_me_expiration")]
    #[validate(range(min = 1))]
    pub remember_me_expiration: i64,

    /// Refresh token lifetime in seconds
    #[validate(range(min = 1))]
    pub refresh_token_expiration: i64,

    #[serde(default = "default_password_reset_expiration")]
    #[validate(range(min = 1))]
    pub password_reset_expiration: i64,

    #[serde(default = "default_login_max_attempts")]
    #[validate(range(min = 1))]
    pub login_max_attempts: i32,

    #[serde(default = "default_login_lockout_secs")]
    #[validate(range(min = 1))]
    pub login_lockout_secs: i64,

    /// HMAC key for product QR codes; falls back to `jwt_secret`
    #[serde(default)]
    pub qr_code_secret: Option<String>,

    #[serde(default = "default_points_redeem_unit")]
    #[validate(range(min = 1))]
    pub points_redeem_unit: i64,

    #[serde(default = "default_points_redeem_value")]
    pub points_redeem_value: Decimal,

    #[serde(default = "default_low_stock")]
    #[validate(range(min = 0))]
    pub default_low_stock: i32,

    #[serde(default = "default_high_stock")]
    pub default_high_stock: i32,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

impl AppConfig {
    /// Configuration with built-in defaults, used by tests and tooling.
    pub fn new(database_url: String, jwt_secret: String, environment: String) -> Self {
        Self {
            database_url,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            jwt_secret,
            jwt_previous_secret: None,
            jwt_issuer: default_jwt_issuer(),
            jwt_expiration: 86_400,
            remember_me_expiration: default_remember_me_expiration(),
            refresh_token_expiration: 30 * 86_400,
            password_reset_expiration: default_password_reset_expiration(),
            login_max_attempts: default_login_max_attempts(),
            login_lockout_secs: default_login_lockout_secs(),
            qr_code_secret: None,
            points_redeem_unit: default_points_redeem_unit(),
            points_redeem_value: default_points_redeem_value(),
            default_low_stock: default_low_stock(),
            default_high_stock: default_high_stock(),
            cors_allowed_origins: None,
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Trimmed, non-empty origins from `cors_allowed_origins`.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
            jwt_previous_secret: self.jwt_previous_secret.clone(),
            issuer: self.jwt_issuer.clone(),
            token_ttl: ChronoDuration::seconds(self.jwt_expiration),
            remember_me_ttl: ChronoDuration::seconds(self.remember_me_expiration),
        }
    }

    pub fn login_policy(&self) -> LoginPolicy {
        LoginPolicy {
            max_attempts: self.login_max_attempts,
            lockout: ChronoDuration::seconds(self.login_lockout_secs),
        }
    }

    pub fn token_lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            refresh: ChronoDuration::seconds(self.refresh_token_expiration),
            password_reset: ChronoDuration::seconds(self.password_reset_expiration),
        }
    }

    pub fn qr_code_secret(&self) -> &str {
        self.qr_code_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.jwt_secret)
    }

    pub fn points_policy(&self) -> PointsPolicy {
        PointsPolicy {
            redeem_unit: self.points_redeem_unit,
            redeem_value: self.points_redeem_value,
        }
    }

    pub fn threshold_defaults(&self) -> ThresholdLevels {
        ThresholdLevels {
            low: self.default_low_stock,
            high: self.default_high_stock,
        }
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.default_high_stock <= self.default_low_stock {
            let mut err = ValidationError::new("default_high_stock");
            err.message = Some("default_high_stock must be greater than default_low_stock".into());
            errors.add("default_high_stock", err);
        }

        if self.is_production() && self.cors_origins().iter().any(|origin| origin == "*") {
            let mut err = ValidationError::new("cors_wildcard");
            err.message = Some("A wildcard CORS origin is not allowed in production".into());
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Runs field and cross-field validation.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        self.validate_additional_constraints()
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_jwt_issuer() -> String {
    "retail-pos".to_string()
}
fn default_remember_me_expiration() -> i64 {
    7 * 86_400
}
fn default_password_reset_expiration() -> i64 {
    3_600
}
fn default_login_max_attempts() -> i32 {
    5
}
fn default_login_lockout_secs() -> i64 {
    900
}
fn default_points_redeem_unit() -> i64 {
    500
}
fn default_points_redeem_value() -> Decimal {
    Decimal::from(10)
}
fn default_low_stock() -> i32 {
    10
}
fn default_high_stock() -> i32 {
    100
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 32 {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be at least 32 characters".into());
        return Err(err);
    }

    const DISALLOWED: [&str; 4] = [
        "CHANGE_THIS_SECRET_IN_PRODUCTION",
        "INSECURE_DEFAULT_DO_NOT_USE_IN_PRODUCTION",
        "your-secret-key-change-in-production",
        "default-secret-key-for-development",
    ];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be overridden with a secure random value".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("retail_pos_api={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. `config/default.*`
/// 3. `config/{RUN_ENV}.*`
/// 4. Environment variables (`APP__*`)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // jwt_secret has no default; it must come from a file or APP__JWT_SECRET.
    let config = Config::builder()
        .set_default("database_url", "sqlite://retail_pos.db?mode=rwc")?
        .set_default("jwt_expiration", 86_400)?
        .set_default("refresh_token_expiration", 30 * 86_400)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to a random string of at least 32 characters.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate_all().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "kJ8s2Lq9vX4mN7pR1tY6wZ3bC5dF0gH2";

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            SECRET.into(),
            "production".into(),
        )
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(base_config().validate_all().is_ok());
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.jwt_secret = "too-short".into();
        let errors = cfg.validate_all().unwrap_err();
        assert!(errors.field_errors().contains_key("jwt_secret"));
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.jwt_secret = "CHANGE_THIS_SECRET_IN_PRODUCTION".into();
        assert!(cfg.validate_all().is_err());
    }

    #[test]
    fn dev_secret_only_allowed_in_development() {
        let mut cfg = base_config();
        cfg.jwt_secret = DEV_DEFAULT_JWT_SECRET.into();
        assert!(cfg.validate_all().is_err());
        cfg.environment = "development".into();
        assert!(cfg.validate_all().is_ok());
    }

    #[test]
    fn zero_port_and_zero_attempts_are_rejected() {
        let mut cfg = base_config();
        cfg.port = 0;
        cfg.login_max_attempts = 0;
        let errors = cfg.validate_all().unwrap_err();
        assert!(errors.field_errors().contains_key("port"));
        assert!(errors.field_errors().contains_key("login_max_attempts"));
    }

    #[test]
    fn redeem_unit_must_be_positive() {
        let mut cfg = base_config();
        cfg.points_redeem_unit = 0;
        assert!(cfg.validate_all().is_err());
    }

    #[test]
    fn wildcard_cors_rejected_in_production() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://shop.example.com, *".into());
        assert!(cfg.validate_all().is_err());
        cfg.environment = "staging".into();
        assert!(cfg.validate_all().is_ok());
    }

    #[test]
    fn inverted_stock_defaults_are_rejected() {
        let mut cfg = base_config();
        cfg.default_low_stock = 50;
        cfg.default_high_stock = 50;
        assert!(cfg.validate_all().is_err());
    }

    #[test]
    fn qr_secret_falls_back_to_jwt_secret() {
        let mut cfg = base_config();
        assert_eq!(cfg.qr_code_secret(), SECRET);
        cfg.qr_code_secret = Some("a-dedicated-qr-signing-key".into());
        assert_eq!(cfg.qr_code_secret(), "a-dedicated-qr-signing-key");
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some(" https://a.example.com ,,https://b.example.com".into());
        assert_eq!(
            cfg.cors_origins(),
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }
}
