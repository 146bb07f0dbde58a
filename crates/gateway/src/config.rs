//! Gateway configuration.

use std::env;

use common::{AppError, AppResult, DatabaseConfig, JwtConfig, MarketplaceConfig};

/// Shortest accepted session signing secret
const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Where the marketplace keeps its documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local store, lost on restart
    Memory,
    Postgres,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub marketplace: MarketplaceConfig,
    /// `email:argon2-hash` pairs separated by `;`
    pub admin_credentials: String,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::internal("JWT_SECRET environment variable must be set"))?;
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::internal(format!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            )));
        }

        let storage = match env::var("MARKETPLACE_STORAGE").as_deref() {
            Ok("memory") => StorageBackend::Memory,
            Ok("postgres") | Err(_) => StorageBackend::Postgres,
            Ok(other) => {
                return Err(AppError::internal(format!(
                    "Unknown MARKETPLACE_STORAGE backend: {}",
                    other
                )))
            }
        };

        Ok(Self {
            host: env::var("GATEWAY_HOST").unwrap_or(defaults.host),
            port: parsed("GATEWAY_PORT").unwrap_or(defaults.port),
            storage,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parsed("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(defaults.database.max_connections),
                min_connections: parsed("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or(defaults.database.min_connections),
            },
            jwt: JwtConfig {
                secret,
                expiration_hours: parsed("JWT_EXPIRATION_HOURS")
                    .unwrap_or(defaults.jwt.expiration_hours),
            },
            marketplace: MarketplaceConfig {
                max_write_attempts: parsed("MARKETPLACE_MAX_WRITE_ATTEMPTS")
                    .unwrap_or(defaults.marketplace.max_write_attempts),
                ..defaults.marketplace
            },
            admin_credentials: env::var("MARKETPLACE_ADMIN_CREDENTIALS").unwrap_or_default(),
        })
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            storage: StorageBackend::Postgres,
            database: DatabaseConfig::default(),
            jwt: JwtConfig::default(),
            marketplace: MarketplaceConfig::default(),
            admin_credentials: String::new(),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
