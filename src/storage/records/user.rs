use crate::domain::{User, UserRole};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub approved: bool,
    pub created_at: OffsetDateTime,
    pub last_active_at: Option<OffsetDateTime>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            role: UserRole::from(record.role.as_str()),
            approved: record.approved,
            created_at: record.created_at,
            last_active_at: record.last_active_at,
        }
    }
}
