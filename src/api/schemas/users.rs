use crate::domain::User;
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
pub struct UserEntry {
    pub id: Uuid,
    pub name: String,
}

impl From<User> for UserEntry {
    fn from(user: User) -> Self {
        Self { id: user.id, name: user.name }
    }
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserEntry>,
}
