use crate::config::Config;
use crate::services::{AccountService, DeliveryService};
use crate::storage::DbPool;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod health;
pub mod messages;
pub mod middleware;
pub mod schemas;
pub mod users;

/// Slack on top of the audio size limit for multipart framing and the
/// duration field.
const UPLOAD_FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub jwt_secret: String,
    pub pool: DbPool,
    pub delivery_service: DeliveryService,
    pub account_service: AccountService,
}

/// Configures and returns the application router.
pub fn app_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let api_routes = Router::new()
        .route("/messages/upload", post(messages::upload))
        .route("/messages", get(messages::list_unread))
        .route("/messages/download", get(messages::download))
        .route("/messages/received", post(messages::mark_received))
        .route("/users", get(users::list_users));

    let admin_routes = Router::new()
        .route("/approve", post(admin::approve))
        .route("/users/pending", get(admin::list_pending));

    Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .nest("/admin", admin_routes)
        .layer(DefaultBodyLimit::max(state.config.storage.max_upload_bytes + UPLOAD_FORM_OVERHEAD_BYTES))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .map(|id| id.header_value().to_str().unwrap_or_default())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "user_id" = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        let status = response.status();
                        tracing::Span::current().record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
