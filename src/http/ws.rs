use std::collections::HashMap;
use std::error::Error as _;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Query, Request};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::warn;
use uuid::Uuid;

use crate::auth::{authorize, AuthError};
use crate::bus::Unsubscribe;
use crate::event::Event;
use crate::http::response;
use crate::state::AppState;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(9);

pub async fn handle(state: AppState, req: Request) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let (mut parts, _body) = req.into_parts();

    let params = Query::<HashMap<String, String>>::from_request_parts(&mut parts, &state)
        .await
        .map(|Query(p)| p)
        .unwrap_or_default();

    let account = match authorize(&state.pool, &parts.headers, &params).await {
        Ok(account) => account,
        Err(AuthError::Invalid) => return response::invalid_token(&request_id),
        Err(AuthError::Internal) => return response::internal_error(&request_id),
    };

    let query = params.get("stream").cloned().unwrap_or_default();
    let Some((rx, unsubscribe)) = state.mux.subscribe(&query, account, &params).await else {
        return response::not_found(&request_id);
    };

    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let header_request_id = request_id.clone();
    let shutdown = state.shutdown.clone();
    let mut resp = upgrade
        .on_upgrade(move |socket| handle_socket(socket, rx, unsubscribe, request_id, shutdown))
        .into_response();
    if let Ok(value) = header_request_id.parse() {
        resp.headers_mut().insert("x-request-id", value);
    }
    resp
}

async fn handle_socket(
    socket: WebSocket,
    mut rx: mpsc::Receiver<Event>,
    unsubscribe: Unsubscribe,
    request_id: String,
    mut shutdown: watch::Receiver<bool>,
) {
    let (mut sink, mut stream) = socket.split();

    // Detect client-initiated close by draining the read half on its own
    // task; the browser/client never sends data frames on this connection.
    let (closed_tx, mut closed_rx) = oneshot::channel::<()>();
    let reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            if msg.is_err() {
                break;
            }
        }
        let _ = closed_tx.send(());
    });

    let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut closed_rx => break,
            _ = shutdown.changed() => break,
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else { break; };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if let Err(err) = sink.send(Message::Text(json)).await {
                            if is_reset_or_broken_pipe(&err) {
                                break;
                            }
                            warn!(%request_id, error = %err, "failed to write websocket frame");
                        }
                    }
                    Err(err) => warn!(%request_id, error = %err, "failed to encode event; skipping frame"),
                }
            }
            _ = ticker.tick() => {
                if let Err(err) = sink.send(Message::Ping(Vec::new())).await {
                    if is_reset_or_broken_pipe(&err) {
                        break;
                    }
                    warn!(%request_id, error = %err, "failed to send keepalive ping");
                }
            }
        }
    }

    unsubscribe.call().await;
    while rx.recv().await.is_some() {}
    reader.abort();
    let _ = sink.close().await;
}

fn is_reset_or_broken_pipe(err: &axum::Error) -> bool {
    err.source()
        .and_then(|e| e.downcast_ref::<std::io::Error>())
        .map(|e| matches!(e.kind(), std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe))
        .unwrap_or(false)
}
