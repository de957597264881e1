//! Persistence seams for users and sleep records.
//!
//! Handlers and services only see the traits; `PgStore` is the production
//! implementation (queries live in `auth::repo` and `records::repo`) and
//! `memory::MemoryStore` backs tests and `STORE_BACKEND=memory`.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{Credentials, NewUser, User};
use crate::db::Database;
use crate::records::repo_types::{NewRecord, Record};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database unavailable: {0:#}")]
    Unavailable(anyhow::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Public view only; the password hash is never loaded here.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// The one read that includes the password hash. Login only.
    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Credentials>, StoreError>;

    /// Fails with `StoreError::Conflict` when the email is taken.
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Newest date first, ties broken by newest creation.
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Record>, StoreError>;

    async fn insert(&self, new: NewRecord) -> Result<Record, StoreError>;

    /// Deletes iff both id and owner match. Returns whether a row went away.
    async fn delete_owned(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

/// Postgres-backed implementation of both store traits.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) db: Arc<Database>,
}

impl PgStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub(crate) async fn pool(&self) -> Result<&sqlx::PgPool, StoreError> {
        self.db
            .pool()
            .await
            .map_err(|e| StoreError::Unavailable(e.into()))
    }
}

pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::Database(e),
    }
}
