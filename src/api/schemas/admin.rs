use crate::domain::User;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct Approve {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct ApproveResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct PendingUser {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PendingUser {
    fn from(user: User) -> Self {
        Self { id: user.id, name: user.name, created_at: user.created_at }
    }
}

#[derive(Serialize)]
pub struct PendingUsersResponse {
    pub users: Vec<PendingUser>,
}
