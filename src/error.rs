use thiserror::Error;

/// Crate-wide error type surfaced at the process edges (config loading,
/// pool/migration setup, the upstream forwarder). Code inside a bus or mux
/// logs-and-continues instead of propagating, per the error handling
/// design — a bad event or a failed mute lookup should not take down an
/// unrelated subscriber.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("unknown channel: {0:?}")]
    UnknownChannel(String),
}
