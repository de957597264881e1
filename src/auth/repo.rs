use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::repo_types::{Credentials, CredentialsRow, NewUser, User, UserRow};
use crate::store::{map_unique_violation, PgStore, StoreError, UserStore};

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool().await?)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Credentials>, StoreError> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            r#"
            SELECT id, name, email, role, created_at, updated_at, password_hash
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool().await?)
        .await?;
        row.map(Credentials::try_from).transpose()
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, lower($3), $4, $5)
            RETURNING id, name, email, role, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.password_hash.as_deref())
        .bind(new.role.as_str())
        .fetch_one(self.pool().await?)
        .await
        .map_err(|e| map_unique_violation(e, "Email already registered"))?;
        row.try_into()
    }
}
