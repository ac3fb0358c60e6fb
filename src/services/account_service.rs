use crate::auth::{Claims, encode_jwt, hash_device_id};
use crate::domain::User;
use crate::error::{AppError, Result};
use crate::storage::UserRepository;
use opentelemetry::{global, metrics::Counter};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    registrations_total: Counter<u64>,
    logins_total: Counter<u64>,
    approvals_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("squawk-server");
        Self {
            registrations_total: meter
                .u64_counter("account_registrations_total")
                .with_description("Total new device registrations")
                .build(),
            logins_total: meter
                .u64_counter("account_logins_total")
                .with_description("Total successful logins")
                .build(),
            approvals_total: meter
                .u64_counter("account_approvals_total")
                .with_description("Total users approved")
                .build(),
        }
    }
}

#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub already_registered: bool,
}

#[derive(Debug)]
pub struct LoginSession {
    pub user: User,
    pub token: String,
}

/// Registration, device login, and the admin approval gate. Device ids are
/// hashed before they touch the database and never stored raw.
#[derive(Clone, Debug)]
pub struct AccountService {
    users: UserRepository,
    jwt_secret: String,
    token_ttl_days: i64,
    metrics: Metrics,
}

impl AccountService {
    #[must_use]
    pub fn new(users: UserRepository, jwt_secret: String, token_ttl_days: i64) -> Self {
        Self { users, jwt_secret, token_ttl_days, metrics: Metrics::new() }
    }

    /// Registers a device as a user pending approval. Re-registering a known
    /// device hands back the existing user instead of erroring.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if name or device id is empty.
    #[tracing::instrument(err(level = "warn"), skip(self, name, device_id))]
    pub async fn register(&self, name: &str, device_id: &str) -> Result<Registration> {
        if name.is_empty() || device_id.is_empty() {
            return Err(AppError::BadRequest("Name and device_id are required".to_string()));
        }

        let device_id_hash = hash_device_id(device_id);

        if let Some(user) = self.users.find_by_device_hash(&device_id_hash).await? {
            tracing::debug!(user_id = %user.id, "Device already registered");
            return Ok(Registration { user, already_registered: true });
        }

        let user =
            self.users.create(Uuid::new_v4(), name, &device_id_hash, OffsetDateTime::now_utc()).await?;
        self.metrics.registrations_total.add(1, &[]);
        tracing::info!(user_id = %user.id, name = %user.name, "User registered, awaiting approval");

        Ok(Registration { user, already_registered: false })
    }

    /// Authenticates an approved device and issues a signed token.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` for an unknown device and
    /// `AppError::Forbidden` for a device still awaiting approval.
    #[tracing::instrument(err(level = "warn"), skip(self, device_id), fields(user_id = tracing::field::Empty))]
    pub async fn login(&self, device_id: &str) -> Result<LoginSession> {
        if device_id.is_empty() {
            return Err(AppError::BadRequest("device_id is required".to_string()));
        }

        let device_id_hash = hash_device_id(device_id);
        let Some(user) = self.users.find_by_device_hash(&device_id_hash).await? else {
            tracing::warn!("Login failed: device not registered");
            return Err(AppError::AuthError);
        };
        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        if !user.approved {
            tracing::warn!("Login rejected: user not approved yet");
            return Err(AppError::Forbidden);
        }

        if let Err(e) = self.users.touch_last_active(user.id, OffsetDateTime::now_utc()).await {
            tracing::warn!(error = %e, "Failed to update last active timestamp");
        }

        let claims = Claims::new(user.id, self.token_ttl_days);
        let token = encode_jwt(&claims, &self.jwt_secret)?;

        self.metrics.logins_total.add(1, &[]);
        tracing::info!(name = %user.name, "User logged in");
        Ok(LoginSession { user, token })
    }

    /// Approves a pending user so they can log in.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` for an unknown user id.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn approve(&self, user_id: Uuid) -> Result<()> {
        if !self.users.approve(user_id).await? {
            return Err(AppError::NotFound);
        }

        self.metrics.approvals_total.add(1, &[]);
        tracing::info!(user_id = %user_id, "User approved");
        Ok(())
    }

    /// # Errors
    /// Returns `AppError::Database` if the lookup fails.
    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        self.users.find_by_id(user_id).await
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_approved(&self) -> Result<Vec<User>> {
        self.users.list_approved().await
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_pending(&self) -> Result<Vec<User>> {
        self.users.list_pending().await
    }
}
