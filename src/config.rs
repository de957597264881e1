use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which store implementation backs users and records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub store: StoreBackend,
    pub jwt: JwtConfig,
    /// Only affects the `Secure` flag of the session cookie.
    pub production: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("STORE_BACKEND") {
            Ok(v) => parse_backend(&v)?,
            Err(_) => StoreBackend::Postgres,
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if store == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "sleeptrack".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "sleeptrack-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        if jwt.secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        Ok(Self {
            database_url,
            database_max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            store,
            jwt,
            production: is_production(std::env::var("APP_ENV").ok().as_deref()),
        })
    }

    /// Configuration used by tests and the in-memory dev mode.
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            database_max_connections: 1,
            store: StoreBackend::Memory,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60 * 24,
            },
            production: false,
        }
    }
}

fn parse_backend(v: &str) -> anyhow::Result<StoreBackend> {
    match v.trim().to_ascii_lowercase().as_str() {
        "postgres" | "pg" => Ok(StoreBackend::Postgres),
        "memory" => Ok(StoreBackend::Memory),
        other => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
    }
}

fn is_production(app_env: Option<&str>) -> bool {
    app_env
        .map(|v| v.trim().eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}
