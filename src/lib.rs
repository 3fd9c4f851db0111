pub mod auth;
pub mod bus;
pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod http;
pub mod mute_buffer;
pub mod mux;
pub mod repo;
pub mod state;
pub mod upstream;

pub use state::AppState;

use axum::Router;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(http::dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
