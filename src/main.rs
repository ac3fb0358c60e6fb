#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use squawk_server::api::{self, AppState};
use squawk_server::config::Config;
use squawk_server::services::{AccountService, DeliveryService};
use squawk_server::storage::{
    self, AudioStorage, FsStorage, MessageRepository, ReceiptRepository, UserRepository,
};
use squawk_server::telemetry;
use squawk_server::workers::{AudioCleanupWorker, StandardRetention};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    telemetry::init_telemetry(&config.telemetry)?;

    let boot_span = tracing::info_span!("boot_server");
    let (listener, app_router, shutdown_tx, shutdown_rx, worker) = async {
        // Phase 1: Infrastructure Setup
        let jwt_secret = config.auth.resolve_jwt_secret()?;

        let pool = storage::init_pool(&config.storage.database_path).await?;
        storage::run_migrations(&pool).await?;

        let audio_storage: Arc<dyn AudioStorage> =
            Arc::new(FsStorage::new(&config.storage.audio_directory).await?);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        spawn_signal_handler(shutdown_tx.clone());

        // Phase 2: Component Wiring
        let message_repo = MessageRepository::new(pool.clone());
        let receipt_repo = ReceiptRepository::new(pool.clone());
        let user_repo = UserRepository::new(pool.clone());

        let delivery_service = DeliveryService::new(
            Arc::clone(&audio_storage),
            message_repo.clone(),
            receipt_repo,
            config.storage.max_upload_bytes,
        );
        let account_service =
            AccountService::new(user_repo, jwt_secret.clone(), config.auth.token_ttl_days);

        let policy =
            Arc::new(StandardRetention::new(message_repo.clone(), config.retention.horizon_days));
        let worker =
            AudioCleanupWorker::new(audio_storage, message_repo, policy, config.retention.clone());

        // Phase 3: Runtime Setup
        let state = AppState {
            config: config.clone(),
            jwt_secret,
            pool,
            delivery_service,
            account_service,
        };
        let app_router = api::app_router(state);

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        tracing::info!(address = %addr, "listening");
        let listener = tokio::net::TcpListener::bind(addr).await?;

        Ok::<_, anyhow::Error>((listener, app_router, shutdown_tx, shutdown_rx, worker))
    }
    .instrument(boot_span)
    .await?;

    // Phase 4: Start Runtime
    let worker_task = tokio::spawn(worker.run(shutdown_rx.clone()));

    let mut serve_rx = shutdown_rx;
    let server = axum::serve(listener, app_router.into_make_service()).with_graceful_shutdown(
        async move {
            let _ = serve_rx.wait_for(|&s| s).await;
        },
    );

    if let Err(e) = server.await {
        tracing::error!(error = %e, "Server error");
    }

    // Phase 5: Graceful Shutdown
    let _ = shutdown_tx.send(true);
    tokio::select! {
        _ = worker_task => {
            tracing::info!("Background tasks finished.");
        }
        () = tokio::time::sleep(std::time::Duration::from_secs(config.server.shutdown_timeout_secs)) => {
            tracing::warn!("Timeout waiting for background tasks to finish.");
        }
    }

    Ok(())
}

fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}
