use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::users::UsersResponse;
use crate::error::Result;
use axum::{Json, extract::State, response::IntoResponse};

/// Lists the approved users, the caller's recipient roster.
///
/// # Errors
/// Returns `AppError::Database` if the query fails.
pub async fn list_users(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let users = state.account_service.list_approved().await?;

    Ok(Json(UsersResponse { users: users.into_iter().map(Into::into).collect() }))
}
