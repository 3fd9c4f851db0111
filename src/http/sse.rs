use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{FromRequestParts, Query, Request};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::Stream;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::auth::{authorize, AuthError};
use crate::bus::Unsubscribe;
use crate::event::Event;
use crate::http::{apply_cors, response};
use crate::state::AppState;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(9);
const PREFIX: &str = "/api/v1/streaming/";

fn with_cors(mut resp: Response) -> Response {
    apply_cors(resp.headers_mut());
    resp
}

pub async fn handle(state: AppState, req: Request) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let (mut parts, _body) = req.into_parts();

    let params = Query::<HashMap<String, String>>::from_request_parts(&mut parts, &state)
        .await
        .map(|Query(p)| p)
        .unwrap_or_default();

    // Authorize unconditionally, before the path is even inspected, matching
    // the upstream source: an unauthenticated request to an unknown path
    // still reports 401, not 404.
    let account = match authorize(&state.pool, &parts.headers, &params).await {
        Ok(account) => account,
        Err(AuthError::Invalid) => return with_cors(response::invalid_token(&request_id)),
        Err(AuthError::Internal) => return with_cors(response::internal_error(&request_id)),
    };

    let path = parts.uri.path().to_ascii_lowercase();
    if !path.starts_with(PREFIX) {
        return with_cors(response::not_found(&request_id));
    }

    let query = &path[PREFIX.len()..];
    let Some((rx, unsubscribe)) = state.mux.subscribe(query, account, &params).await else {
        return with_cors(response::not_found(&request_id));
    };

    let mut resp = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .header("transfer-encoding", "identity")
        .body(Body::from_stream(sse_stream(rx, unsubscribe, state.shutdown.clone())))
        .expect("static SSE response parts are always valid");

    apply_cors(resp.headers_mut());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert("x-request-id", value);
    }
    resp
}

/// Owns a subscriber's receiver and unsubscribe handle for the lifetime of
/// the SSE stream. The normal exit path (the `loop` in `sse_stream` breaking)
/// and the cancellation path (hyper dropping the response body mid-poll when
/// the client disconnects) both end by dropping this guard, so cleanup runs
/// either way instead of only on the loop's own `break`.
struct SseSubscription {
    rx: mpsc::Receiver<Event>,
    unsubscribe: Option<Unsubscribe>,
}

impl SseSubscription {
    fn new(rx: mpsc::Receiver<Event>, unsubscribe: Unsubscribe) -> Self {
        Self { rx, unsubscribe: Some(unsubscribe) }
    }
}

impl Drop for SseSubscription {
    fn drop(&mut self) {
        let Some(unsubscribe) = self.unsubscribe.take() else { return };
        let mut rx = std::mem::replace(&mut self.rx, mpsc::channel(1).1);
        tokio::spawn(async move {
            unsubscribe.call().await;
            while rx.recv().await.is_some() {}
        });
    }
}

fn sse_stream(
    rx: mpsc::Receiver<Event>,
    unsubscribe: Unsubscribe,
    mut shutdown: watch::Receiver<bool>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    async_stream::stream! {
        let mut sub = SseSubscription::new(rx, unsubscribe);
        let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                maybe_event = sub.rx.recv() => {
                    let Some(event) = maybe_event else { break; };
                    let body = event.payload.decoded_str().unwrap_or_else(|| event.payload.raw_bytes());
                    yield Ok(Bytes::from(format!("event: {}\ndata: {}\n\n", event.event, body)));
                }
                _ = ticker.tick() => {
                    yield Ok(Bytes::from_static(b":thump\n"));
                }
            }
        }
    }
}
