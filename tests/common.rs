#![allow(dead_code)]

use squawk_server::api::{self, AppState};
use squawk_server::config::{
    AuthConfig, Config, LogFormat, RetentionConfig, ServerConfig, StorageConfig, TelemetryConfig,
};
use squawk_server::services::{AccountService, DeliveryService};
use squawk_server::storage::{
    self, AudioStorage, DbPool, FsStorage, MessageRepository, ReceiptRepository, UserRepository,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test_secret";

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("squawk_server=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

pub fn test_config(dir: &Path, max_upload_bytes: usize) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // 0 means let OS choose
            shutdown_timeout_secs: 5,
        },
        auth: AuthConfig {
            jwt_secret: Some(TEST_JWT_SECRET.to_string()),
            jwt_secret_file: None,
            token_ttl_days: 30,
        },
        storage: StorageConfig {
            database_path: dir.join("squawk.db"),
            audio_directory: dir.join("audio"),
            max_upload_bytes,
        },
        retention: RetentionConfig {
            sweep_interval_secs: 60,
            horizon_days: 7,
            purge_grace_secs: 3600,
        },
        telemetry: TelemetryConfig { log_format: LogFormat::Text },
    }
}

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub pool: DbPool,
    pub audio_dir: PathBuf,
    _tmp: tempfile::TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_max_upload(10 * 1024 * 1024).await
}

pub async fn spawn_app_with_max_upload(max_upload_bytes: usize) -> TestApp {
    setup_tracing();

    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(tmp.path(), max_upload_bytes);

    let pool = storage::init_pool(&config.storage.database_path).await.expect("Failed to open test DB");
    storage::run_migrations(&pool).await.expect("Failed to run migrations");

    let audio_storage: Arc<dyn AudioStorage> = Arc::new(
        FsStorage::new(&config.storage.audio_directory).await.expect("Failed to open audio storage"),
    );

    let delivery_service = DeliveryService::new(
        Arc::clone(&audio_storage),
        MessageRepository::new(pool.clone()),
        ReceiptRepository::new(pool.clone()),
        config.storage.max_upload_bytes,
    );
    let account_service = AccountService::new(
        UserRepository::new(pool.clone()),
        TEST_JWT_SECRET.to_string(),
        config.auth.token_ttl_days,
    );

    let audio_dir = config.storage.audio_directory.clone();
    let state = AppState {
        config,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        pool: pool.clone(),
        delivery_service,
        account_service,
    };
    let router = api::app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read listener address");
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.expect("Server crashed");
    });

    TestApp {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        pool,
        audio_dir,
        _tmp: tmp,
    }
}

impl TestApp {
    pub async fn register(&self, name: &str, device_id: &str) -> Uuid {
        let resp = self
            .client
            .post(format!("{}/auth/register", self.base_url))
            .json(&serde_json::json!({ "name": name, "device_id": device_id }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success(), "registration failed: {}", resp.status());

        let body: serde_json::Value = resp.json().await.unwrap();
        Uuid::parse_str(body["user_id"].as_str().unwrap()).unwrap()
    }

    pub async fn approve_directly(&self, user_id: Uuid) {
        sqlx::query("UPDATE users SET approved = 1 WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn make_admin(&self, user_id: Uuid) {
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn login(&self, device_id: &str) -> String {
        let resp = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&serde_json::json!({ "device_id": device_id }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success(), "login failed: {}", resp.status());

        let body: serde_json::Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Registers a device, approves it out of band, and logs it in.
    pub async fn register_approved(&self, name: &str, device_id: &str) -> (Uuid, String) {
        let user_id = self.register(name, device_id).await;
        self.approve_directly(user_id).await;
        let token = self.login(device_id).await;
        (user_id, token)
    }

    pub async fn upload(
        &self,
        token: &str,
        file_name: &str,
        bytes: Vec<u8>,
        duration: Option<&str>,
    ) -> reqwest::Response {
        let mut form = reqwest::multipart::Form::new()
            .part("audio", reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()));
        if let Some(duration) = duration {
            form = form.text("duration", duration.to_string());
        }

        self.client
            .post(format!("{}/api/messages/upload", self.base_url))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// Uploads a clip and returns the new message id, asserting success.
    pub async fn upload_ok(&self, token: &str, bytes: Vec<u8>, duration: &str) -> Uuid {
        let resp = self.upload(token, "clip.m4a", bytes, Some(duration)).await;
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let body: serde_json::Value = resp.json().await.unwrap();
        Uuid::parse_str(body["message_id"].as_str().unwrap()).unwrap()
    }

    pub async fn list_unread(&self, token: &str) -> Vec<serde_json::Value> {
        let resp = self
            .client
            .get(format!("{}/api/messages", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = resp.json().await.unwrap();
        body["messages"].as_array().unwrap().clone()
    }

    pub async fn download(&self, token: &str, message_id: Uuid) -> reqwest::Response {
        self.client
            .get(format!("{}/api/messages/download?id={message_id}", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    pub async fn mark_received(&self, token: &str, message_id: Uuid) -> reqwest::Response {
        self.client
            .post(format!("{}/api/messages/received", self.base_url))
            .bearer_auth(token)
            .json(&serde_json::json!({ "message_id": message_id }))
            .send()
            .await
            .unwrap()
    }

    pub async fn receipt_count(&self, message_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM receipts WHERE audio_message_id = ?")
            .bind(message_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn message_count(&self) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM audio_messages").fetch_one(&self.pool).await.unwrap()
    }

    pub fn audio_file_count(&self) -> usize {
        std::fs::read_dir(&self.audio_dir).map(|entries| entries.count()).unwrap_or(0)
    }
}
