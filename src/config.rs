use rocket::figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cookie domain used during local development. Cookies for it are not marked `Secure`.
pub const DEVELOPMENT_DOMAIN: &str = "localhost";

const ENV_KEYS: [&str; 7] = [
    "database_url",
    "jwt_secret",
    "domain",
    "session_ttl_hours",
    "allowed_origins",
    "otlp_endpoint",
    "deployment_environment",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Figment(#[from] rocket::figment::Error),

    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingSecret,

    #[error("SESSION_TTL_HOURS must be greater than zero, got {0}")]
    InvalidSessionTtl(i64),
}

/// Process-wide settings, loaded once at startup and handed to whoever needs them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub domain: String,
    pub session_ttl_hours: i64,
    pub allowed_origins: Vec<String>,
    pub otlp_endpoint: Option<String>,
    pub deployment_environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://reviser.db?mode=rwc".to_string(),
            jwt_secret: String::new(),
            domain: DEVELOPMENT_DOMAIN.to_string(),
            session_ttl_hours: 24,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            otlp_endpoint: None,
            deployment_environment: "development".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the configuration from defaults overlaid with environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Env::raw().only(&ENV_KEYS))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        if self.session_ttl_hours <= 0 {
            return Err(ConfigError::InvalidSessionTtl(self.session_ttl_hours));
        }

        Ok(())
    }

    pub fn secure_cookies(&self) -> bool {
        self.domain != DEVELOPMENT_DOMAIN
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-signing-secret".to_string(),
            ..Self::default()
        }
    }
}
