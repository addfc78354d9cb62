use anyhow::{bail, Context, Result};
use std::fmt;
use std::str::FromStr;

use super::{lookup_or, DatabaseConfig};

/// Which persistence backend the service runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown STORE_BACKEND '{other}', expected 'postgres' or 'memory'"),
        }
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiration_hours: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiration_hours", &self.expiration_hours)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordConfig {
    /// bcrypt work factor.
    pub hash_cost: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub store_backend: StoreBackend,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub require_auth: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup_or(&lookup, "PORT", "3000")
            .parse()
            .context("PORT must be a valid port number")?;
        let store_backend = lookup_or(&lookup, "STORE_BACKEND", "postgres").parse()?;
        let expiration_hours = lookup_or(&lookup, "JWT_EXPIRATION_HOURS", "24")
            .parse()
            .context("JWT_EXPIRATION_HOURS must be a whole number of hours")?;
        let hash_cost = lookup_or(&lookup, "PASSWORD_HASH_COST", "12")
            .parse()
            .context("PASSWORD_HASH_COST must be a number between 4 and 31")?;
        if !(4..=31).contains(&hash_cost) {
            bail!("PASSWORD_HASH_COST must be a number between 4 and 31");
        }
        let require_auth = matches!(
            lookup_or(&lookup, "REQUIRE_AUTH", "false").to_lowercase().as_str(),
            "1" | "true" | "yes"
        );

        Ok(AppConfig {
            host: lookup_or(&lookup, "HOST", "0.0.0.0"),
            port,
            environment: lookup_or(&lookup, "ENVIRONMENT", "development"),
            log_level: lookup_or(&lookup, "LOG_LEVEL", "info"),
            store_backend,
            database: DatabaseConfig::from_lookup(&lookup)?,
            jwt: JwtConfig {
                secret: lookup_or(&lookup, "JWT_SECRET", "your-secret-key-change-in-production"),
                issuer: lookup_or(&lookup, "JWT_ISSUER", "vaccine-card"),
                audience: lookup_or(&lookup, "JWT_AUDIENCE", "vaccine-card-clients"),
                expiration_hours,
            },
            password: PasswordConfig { hash_cost },
            require_auth,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
