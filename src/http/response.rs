use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Bodies are a bare JSON string, not an error envelope — the upstream
/// source writes the message straight through `json.NewEncoder`.
pub fn json_string_error(status: StatusCode, message: &str, request_id: &str) -> Response {
    let body = serde_json::to_string(message).unwrap_or_else(|_| "\"error\"".to_owned());
    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert("content-type", HeaderValue::from_static("application/json"));
    with_request_id(response, request_id)
}

pub fn invalid_token(request_id: &str) -> Response {
    json_string_error(StatusCode::UNAUTHORIZED, "Invalid access token", request_id)
}

pub fn internal_error(request_id: &str) -> Response {
    json_string_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", request_id)
}

pub fn not_found(request_id: &str) -> Response {
    with_request_id(StatusCode::NOT_FOUND.into_response(), request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn invalid_token_sets_status_body_and_request_id() {
        let response = invalid_token("req-1");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get("x-request-id").unwrap(), "req-1");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), br#""Invalid access token""#);
    }

    #[tokio::test]
    async fn not_found_carries_request_id_with_empty_body() {
        let response = not_found("req-2");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("x-request-id").unwrap(), "req-2");
    }
}
