use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::jwt::TokenCodec;
use crate::config::{AppConfig, StoreBackend};
use crate::db::{Database, DbError};
use crate::store::{memory::MemoryStore, PgStore, RecordStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub records: Arc<dyn RecordStore>,
    pub tokens: TokenCodec,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        match (config.store, config.database_url.clone()) {
            (StoreBackend::Postgres, Some(url)) => {
                let db = Database::new(url, config.database_max_connections).with_migrations();
                prepare_database(&db).await?;
                Ok(Self::with_postgres(config, Arc::new(db)))
            }
            (StoreBackend::Postgres, None) => {
                anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres")
            }
            (StoreBackend::Memory, _) => {
                warn!("using in-memory store; data is lost on restart");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn with_postgres(config: AppConfig, db: Arc<Database>) -> Self {
        info!("using postgres store");
        let store = PgStore::new(db);
        Self::from_parts(
            config,
            Arc::new(store.clone()) as Arc<dyn UserStore>,
            Arc::new(store) as Arc<dyn RecordStore>,
        )
    }

    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(
            config,
            store.clone() as Arc<dyn UserStore>,
            store as Arc<dyn RecordStore>,
        )
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let tokens = TokenCodec::from_config(&config.jwt);
        Self {
            config: Arc::new(config),
            users,
            records,
            tokens,
        }
    }
}

/// Connects and migrates up front. An unreachable database is tolerated since
/// the pool retries on first use; a failed migration is not.
pub async fn prepare_database(db: &Database) -> anyhow::Result<()> {
    match db.pool().await {
        Ok(_) => Ok(()),
        Err(DbError::Connect(e)) => {
            warn!(error = %e, "database unreachable at startup; will retry on first request");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
