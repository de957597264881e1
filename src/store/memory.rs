use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RecordStore, StoreError, UserStore};
use crate::auth::repo_types::{Credentials, NewUser, User};
use crate::records::repo_types::{NewRecord, Record};

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, Credentials>>,
    records: RwLock<HashMap<Uuid, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Credentials>, StoreError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|c| c.user.email == email)
            .cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let email = new.email.to_lowercase();
        let mut users = self.users.write().await;
        if users.values().any(|c| c.user.email == email) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(
            user.id,
            Credentials {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Record>, StoreError> {
        let mut out: Vec<Record> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.user_id == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(out)
    }

    async fn insert(&self, new: NewRecord) -> Result<Record, StoreError> {
        let now = OffsetDateTime::now_utc();
        let rec = Record {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            date: new.date,
            amount: new.amount,
            text: new.text,
            created_at: now,
            updated_at: now,
        };
        self.records.write().await.insert(rec.id, rec.clone());
        Ok(rec)
    }

    async fn delete_owned(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.get(&id) {
            Some(r) if r.user_id == owner => {
                records.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
