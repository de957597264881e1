use async_trait::async_trait;
use uuid::Uuid;

use crate::records::repo_types::{NewRecord, Record};
use crate::store::{PgStore, RecordStore, StoreError};

#[async_trait]
impl RecordStore for PgStore {
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Record>, StoreError> {
        let rows = sqlx::query_as::<_, Record>(
            r#"
            SELECT id, user_id, date, amount, text, created_at, updated_at
            FROM records
            WHERE user_id = $1
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(self.pool().await?)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, new: NewRecord) -> Result<Record, StoreError> {
        let row = sqlx::query_as::<_, Record>(
            r#"
            INSERT INTO records (id, user_id, date, amount, text)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, date, amount, text, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.date)
        .bind(new.amount)
        .bind(&new.text)
        .fetch_one(self.pool().await?)
        .await?;
        Ok(row)
    }

    async fn delete_owned(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM records WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool().await?)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
