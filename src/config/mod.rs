// Environment-driven configuration

pub mod app;
pub mod database;

pub use app::{AppConfig, JwtConfig, PasswordConfig, StoreBackend};
pub use database::{run_migrations, DatabaseConfig};

fn lookup_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
