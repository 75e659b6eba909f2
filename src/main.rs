use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hostel_portal::build_app;
use hostel_portal::config::Config;
use hostel_portal::db::pool::{get_db_pool, run_migrations};
use hostel_portal::db::queries::user::ensure_super_user;
use hostel_portal::middleware::auth::{create_permission_cache, create_revocation_list};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::init().context("Failed to load configuration")?;

    // Guard must stay alive or buffered file logs are lost
    let _log_guard = init_tracing(&config)?;

    let pool = get_db_pool(&config)
        .await
        .context("Failed to connect to the database")?;

    if config.run_migrations {
        run_migrations(&pool).await.context("Failed to run migrations")?;
    }

    if let Some(seed) = &config.super_user {
        ensure_super_user(&pool, seed)
            .await
            .context("Failed to bootstrap the super user")?;
    }

    let permission_cache =
        create_permission_cache(Duration::from_secs(config.permission_cache_ttl_secs));
    let revoked_tokens = create_revocation_list(Duration::from_secs(config.jwt_ttl_secs));
    let app = build_app(pool.clone(), permission_cache, revoked_tokens);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🚀 Server running at http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pool))
        .await
        .context("Server encountered an error")?;

    info!("Shutdown complete.");
    Ok(())
}

/// Console logging, plus a daily rolling file when `LOG_DIR` is set.
fn init_tracing(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));

    match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(dir, "hostel-portal.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}

async fn shutdown_signal(pool: PgPool) {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {:?}", e);
    }
    info!("Received Ctrl+C, shutting down...");
    info!("🛠️ Closing database pool...");
    pool.close().await;
    info!("✅ Database pool closed.");
}
