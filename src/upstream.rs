use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::oneshot;
use tracing::warn;

use crate::config::{Config, RedisAddr};
use crate::error::GatewayError;
use crate::event::Event;
use crate::mux::Mux;

pub fn build_client(config: &Config) -> Result<redis::Client, GatewayError> {
    let addr = match &config.redis {
        RedisAddr::Unix(path) => redis::ConnectionAddr::Unix(path.clone()),
        RedisAddr::Tcp { host, port, .. } => {
            redis::ConnectionAddr::Tcp(host.clone(), port.parse().unwrap_or(6379))
        }
    };

    let password = match &config.redis {
        RedisAddr::Tcp { password, .. } => password.clone(),
        RedisAddr::Unix(_) => None,
    };

    let info = redis::ConnectionInfo {
        addr,
        redis: redis::RedisConnectionInfo {
            db: 0,
            username: None,
            password,
        },
    };

    redis::Client::open(info).map_err(GatewayError::Redis)
}

/// Consumes the pattern-subscribed upstream connection (`timeline:*`),
/// decoding one event per message and dispatching it into the mux. A
/// decode failure drops that one message and continues; a connection
/// error or the shutdown signal ends the loop.
pub async fn run_upstream_forwarder(
    client: redis::Client,
    mux: Arc<Mux>,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), GatewayError> {
    let mut pubsub = client.get_async_pubsub().await.map_err(GatewayError::Redis)?;
    pubsub.psubscribe("timeline:*").await.map_err(GatewayError::Redis)?;

    {
        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                maybe_msg = stream.next() => {
                    let Some(msg) = maybe_msg else { break; };
                    let channel = msg.get_channel_name().to_owned();

                    let payload: String = match msg.get_payload() {
                        Ok(payload) => payload,
                        Err(err) => {
                            warn!(error = %err, %channel, "failed to read upstream message payload");
                            continue;
                        }
                    };

                    let event: Event = match serde_json::from_str(&payload) {
                        Ok(event) => event,
                        Err(err) => {
                            warn!(error = %err, %channel, "failed to decode upstream event; skipping");
                            continue;
                        }
                    };

                    if let Err(err) = mux.publish(&channel, event).await {
                        warn!(error = %err, %channel, "publish failed");
                    }
                }
            }
        }
    }

    let _ = pubsub.punsubscribe("timeline:*").await;
    Ok(())
}
