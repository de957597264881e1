use sqlx::{migrate::MigrateError, postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connect to database: {0}")]
    Connect(sqlx::Error),

    #[error("run migrations: {0}")]
    Migrate(#[from] MigrateError),
}

/// Shared Postgres handle. The pool is created on first use; concurrent
/// first callers wait on the same initialization instead of racing.
pub struct Database {
    url: String,
    max_connections: u32,
    migrate_on_connect: bool,
    pool: OnceCell<PgPool>,
}

impl Database {
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
            migrate_on_connect: false,
            pool: OnceCell::new(),
        }
    }

    /// Apply the embedded migrations as part of the first successful connect.
    pub fn with_migrations(mut self) -> Self {
        self.migrate_on_connect = true;
        self
    }

    /// Returns the pool, connecting if this is the first call. A failed
    /// connect or migration leaves the cell empty so the next caller retries.
    pub async fn pool(&self) -> Result<&PgPool, DbError> {
        self.pool
            .get_or_try_init(|| async {
                debug!(max_connections = self.max_connections, "connecting to database");
                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&self.url)
                    .await
                    .map_err(DbError::Connect)?;
                if self.migrate_on_connect {
                    sqlx::migrate!("./migrations").run(&pool).await?;
                    info!("migrations applied");
                }
                info!("database pool ready");
                Ok::<_, DbError>(pool)
            })
            .await
    }

    pub fn is_connected(&self) -> bool {
        self.pool.initialized()
    }
}
