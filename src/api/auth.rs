use crate::api::AppState;
use crate::api::schemas::auth::{Login, LoginResponse, Registration, RegistrationResponse};
use crate::error::Result;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Registers a device as a user pending admin approval.
///
/// # Errors
/// Returns `AppError::BadRequest` if name or device id is missing.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Registration>,
) -> Result<impl IntoResponse> {
    let registration = state.account_service.register(&payload.name, &payload.device_id).await?;

    let (status, message) = if registration.already_registered {
        (StatusCode::OK, "Device already registered. Awaiting approval.")
    } else {
        (StatusCode::CREATED, "Registration successful. Awaiting admin approval.")
    };

    Ok((
        status,
        Json(RegistrationResponse { message: message.to_string(), user_id: registration.user.id }),
    ))
}

/// Authenticates an approved device and returns a bearer token.
///
/// # Errors
/// Returns `AppError::AuthError` for an unknown device and `AppError::Forbidden`
/// while approval is pending.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Login>,
) -> Result<impl IntoResponse> {
    let session = state.account_service.login(&payload.device_id).await?;

    Ok(Json(LoginResponse {
        token: session.token,
        user_id: session.user.id,
        name: session.user.name,
    }))
}
