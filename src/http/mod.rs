pub mod response;
pub mod sse;
pub mod ws;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::state::AppState;

const CORS_ORIGIN: &str = "*";
const CORS_HEADERS: &str = "Authorization, Accept, Cache-Control";
const CORS_METHODS: &str = "GET, OPTIONS";

pub(crate) fn apply_cors(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", CORS_ORIGIN.parse().unwrap());
    headers.insert("access-control-allow-headers", CORS_HEADERS.parse().unwrap());
    headers.insert("access-control-allow-methods", CORS_METHODS.parse().unwrap());
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Single entry point for every request: transport is decided by
/// inspecting headers and path rather than by a route table, mirroring the
/// upstream source's one dispatch method.
pub async fn dispatch(State(state): State<AppState>, req: Request) -> Response {
    if is_websocket_upgrade(req.headers()) {
        return ws::handle(state, req).await;
    }

    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::OK.into_response();
        apply_cors(resp.headers_mut());
        if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            resp.headers_mut().insert("x-request-id", value);
        }
        return resp;
    }

    sse::handle(state, req).await
}
