use crate::api::AppState;
use crate::api::middleware::AdminUser;
use crate::api::schemas::admin::{Approve, ApproveResponse, PendingUsersResponse};
use crate::error::Result;
use axum::{Json, extract::State, response::IntoResponse};

/// Approves a pending user, letting them log in.
///
/// # Errors
/// Returns `AppError::NotFound` for an unknown user id.
pub async fn approve(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<Approve>,
) -> Result<impl IntoResponse> {
    state.account_service.approve(payload.user_id).await?;

    Ok(Json(ApproveResponse { message: "User approved successfully".to_string() }))
}

/// Lists users still awaiting approval.
///
/// # Errors
/// Returns `AppError::Database` if the query fails.
pub async fn list_pending(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let users = state.account_service.list_pending().await?;

    Ok(Json(PendingUsersResponse { users: users.into_iter().map(Into::into).collect() }))
}
