use std::sync::Arc;

use streamgate::config::{BindTarget, Config};
use streamgate::error::GatewayError;
use streamgate::mux::Mux;
use streamgate::state::AppState;
use streamgate::{build_router, db, upstream};
use tokio::sync::{oneshot, watch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::from_env()?;

    info!("connecting to database");
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("migrations applied");

    let mux = Arc::new(Mux::new(pool.clone()));

    let redis_client = upstream::build_client(&config)?;
    let (upstream_shutdown_tx, upstream_shutdown_rx) = oneshot::channel();
    let upstream_mux = mux.clone();
    let upstream_handle = tokio::spawn(async move {
        if let Err(err) = upstream::run_upstream_forwarder(redis_client, upstream_mux, upstream_shutdown_rx).await {
            error!(error = %err, "upstream forwarder terminated");
        }
    });

    // Broadcast to every open WS/SSE connection so hyper's graceful shutdown
    // doesn't wait forever on a stream that never ends on its own.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let state = AppState { pool, mux: mux.clone(), shutdown: shutdown_rx };
    let router = build_router(state);

    let serve_result = match config.bind {
        BindTarget::Tcp(port) => {
            let addr = format!("0.0.0.0:{port}");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|err| GatewayError::Config(format!("failed to bind {addr}: {err}")))?;
            info!(%addr, "listening");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal(shutdown_tx))
                .await
        }
        BindTarget::Unix(path) => {
            let _ = std::fs::remove_file(&path);
            let listener = tokio::net::UnixListener::bind(&path)
                .map_err(|err| GatewayError::Config(format!("failed to bind {path:?}: {err}")))?;
            info!(?path, "listening");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal(shutdown_tx))
                .await
        }
    };

    let _ = upstream_shutdown_tx.send(());
    let _ = upstream_handle.await;

    match Arc::try_unwrap(mux) {
        Ok(mux) => mux.close().await,
        Err(_) => error!("mux still had outstanding references at shutdown; skipping close"),
    }

    serve_result.map_err(|err| GatewayError::Config(format!("server error: {err}")))?;
    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }

    let _ = shutdown_tx.send(true);
}
