use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use storekeeper::{
    auth::AuthKeys,
    config::{get_config, CliArgs},
    create_app, db, repo, run_migrations,
};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Sets up stdout logging and, with a log directory, a daily JSON log file
///
/// `RUST_LOG` wins over the defaults. The returned guard flushes the file
/// writer and must live until shutdown.
fn init_tracing(args: &CliArgs) -> Option<WorkerGuard> {
    let default_filter = if args.debug {
        "storekeeper=debug,tower_http=debug"
    } else {
        "storekeeper=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stdout_layer = if args.log_json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "storekeeper.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenv::dotenv().ok();

    let args = CliArgs::parse();
    let _log_guard = init_tracing(&args);

    let config = get_config(args);
    config.validate()?;

    let pool = Arc::new(db::init_pool(&config.database_url)
        .with_context(|| format!("Failed to open database {}", config.database_url))?);

    {
        let conn = &mut pool.get()?;
        run_migrations(conn)?;
    }
    info!("Database ready at {}", config.database_url);

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        let admin = repo::ensure_admin(&pool, username, password)
            .await
            .context("Failed to set up the admin account")?;
        info!("Admin account {} ready", admin.get_username());
    }

    let keys = Arc::new(AuthKeys::new(&config.jwt_secret_or_random(), config.token_ttl_minutes));

    let app = create_app(pool, keys);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
