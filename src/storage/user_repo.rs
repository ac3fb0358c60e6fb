use crate::domain::{User, UserRole};
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::records::UserRecord;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Creates a user pending approval.
    #[tracing::instrument(level = "debug", skip(self, device_id_hash))]
    pub async fn create(
        &self,
        id: Uuid,
        name: &str,
        device_id_hash: &str,
        created_at: OffsetDateTime,
    ) -> Result<User> {
        sqlx::query(
            r"
            INSERT INTO users (id, name, device_id_hash, role, approved, created_at)
            VALUES (?, ?, ?, 'member', 0, ?)
            ",
        )
        .bind(id)
        .bind(name)
        .bind(device_id_hash)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            name: name.to_string(),
            role: UserRole::Member,
            approved: false,
            created_at,
            last_active_at: None,
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, role, approved, created_at, last_active_at
            FROM users
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Into::into))
    }

    #[tracing::instrument(level = "debug", skip(self, device_id_hash))]
    pub async fn find_by_device_hash(&self, device_id_hash: &str) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, role, approved, created_at, last_active_at
            FROM users
            WHERE device_id_hash = ?
            ",
        )
        .bind(device_id_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Flips the approval flag. Returns whether a row matched.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn approve(&self, id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("UPDATE users SET approved = 1 WHERE id = ?").bind(id).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn touch_last_active(&self, id: Uuid, at: OffsetDateTime) -> Result<()> {
        sqlx::query("UPDATE users SET last_active_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list_approved(&self) -> Result<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, role, approved, created_at, last_active_at
            FROM users
            WHERE approved = 1
            ORDER BY name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list_pending(&self) -> Result<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, role, approved, created_at, last_active_at
            FROM users
            WHERE approved = 0
            ORDER BY created_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
