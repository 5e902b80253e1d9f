use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub store_backend: StoreBackend,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Directory of the single-page client, served as the router fallback
    pub static_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

/// Supabase GoTrue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub supabase_url: Option<String>,
    pub service_key: Option<String>,
    /// When set, access tokens are verified locally instead of calling the provider
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitTier {
    pub requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    pub general: RateLimitTier,
    pub auth: RateLimitTier,
    pub slack: RateLimitTier,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub slack_signing_secret: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Upload limit for the CSV importer
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        // Server
        if let Some(v) = non_empty("BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(v) = non_empty("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = non_empty("STATIC_DIR") {
            self.server.static_dir = v;
        }

        // Store
        match non_empty("STORE_BACKEND").as_deref() {
            Some("memory") => self.store_backend = StoreBackend::Memory,
            Some("postgres") => self.store_backend = StoreBackend::Postgres,
            _ => {}
        }
        if let Some(v) = non_empty("DATABASE_URL").or_else(|| non_empty("SUPABASE_DB_URL")) {
            self.database.url = Some(v);
        }
        if let Some(v) = non_empty("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = non_empty("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Some(v) = non_empty("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Identity provider
        if let Some(v) = non_empty("SUPABASE_URL") {
            self.identity.supabase_url = Some(v.trim_end_matches('/').to_string());
        }
        if let Some(v) = non_empty("SUPABASE_SERVICE_KEY") {
            self.identity.service_key = Some(v);
        }
        if let Some(v) = non_empty("SUPABASE_JWT_SECRET") {
            self.identity.jwt_secret = Some(v);
        }

        // API
        if let Some(v) = non_empty("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        for (prefix, tier) in [
            ("GENERAL", &mut self.api.general),
            ("AUTH", &mut self.api.auth),
            ("SLACK", &mut self.api.slack),
        ] {
            if let Some(v) = non_empty(&format!("API_RATE_LIMIT_{}_REQUESTS", prefix)) {
                tier.requests = v.parse().unwrap_or(tier.requests);
            }
            if let Some(v) = non_empty(&format!("API_RATE_LIMIT_{}_WINDOW_SECS", prefix)) {
                tier.window_secs = v.parse().unwrap_or(tier.window_secs);
            }
        }
        if let Some(v) = non_empty("IMPORT_MAX_UPLOAD_BYTES") {
            self.api.max_upload_bytes = v.parse().unwrap_or(self.api.max_upload_bytes);
        }

        // Security
        if let Some(v) = non_empty("ALLOWED_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = non_empty("SLACK_SIGNING_SECRET") {
            self.security.slack_signing_secret = Some(v);
        }

        self
    }

    /// Startup checks. Missing store or identity credentials abort the process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.identity.supabase_url.is_none() {
            return Err(ConfigError::Missing("SUPABASE_URL"));
        }
        if self.identity.service_key.is_none() {
            return Err(ConfigError::Missing("SUPABASE_SERVICE_KEY"));
        }
        Ok(())
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
                static_dir: "public".to_string(),
            },
            store_backend: StoreBackend::Postgres,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: false,
            },
            identity: IdentityConfig {
                supabase_url: None,
                service_key: None,
                jwt_secret: None,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                general: RateLimitTier { requests: 100, window_secs: 15 * 60 },
                auth: RateLimitTier { requests: 20, window_secs: 15 * 60 },
                slack: RateLimitTier { requests: 30, window_secs: 60 },
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
                slack_signing_secret: None,
            },
        }
    }

    fn development() -> Self {
        let mut config = Self::base(Environment::Development);
        config.database.run_migrations = true;
        config.api.enable_rate_limiting = false;
        config.security.cors_origins = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
        ];
        config
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 20;
        config.database.connection_timeout = 5;
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
