use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::watch;

use crate::mux::Mux;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub mux: Arc<Mux>,
    /// Flips to `true` when the server starts a graceful shutdown. Every
    /// open WebSocket/SSE connection selects on this so it can close its
    /// own response body promptly instead of blocking hyper's graceful
    /// shutdown indefinitely.
    pub shutdown: watch::Receiver<bool>,
}
