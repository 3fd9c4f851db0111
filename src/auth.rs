use std::collections::HashMap;

use axum::http::HeaderMap;
use sqlx::PgPool;

use crate::repo::tokens;

#[derive(Debug)]
pub enum AuthError {
    Invalid,
    Internal,
}

/// Resolves the account id for a request's bearer token, taken from the
/// `Authorization` header or an `access_token` query parameter, matching
/// the upstream source's `authorize`.
pub async fn authorize(
    pool: &PgPool,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> Result<i64, AuthError> {
    let token = extract_bearer(headers).or_else(|| params.get("access_token").cloned());
    let token = token.ok_or(AuthError::Invalid)?;

    match tokens::lookup_account_by_token(pool, &token).await {
        Ok(Some(account_id)) => Ok(account_id),
        Ok(None) => Err(AuthError::Invalid),
        Err(err) => {
            tracing::error!(error = %err, "token lookup failed");
            Err(AuthError::Internal)
        }
    }
}

/// Mirrors the upstream source's `strings.TrimPrefix(header, "Bearer ")`:
/// any `Authorization` header is used as-is once the `Bearer ` prefix (if
/// present) is stripped, even if the header uses a different scheme. The
/// `access_token` query param is only consulted when the header is absent
/// entirely.
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_handles_missing_and_malformed_headers() {
        let empty = HeaderMap::new();
        assert_eq!(extract_bearer(&empty), None);

        let mut basic = HeaderMap::new();
        basic.insert("authorization", "Basic abc123".parse().unwrap());
        assert_eq!(extract_bearer(&basic), Some("Basic abc123".to_owned()));

        let mut bearer = HeaderMap::new();
        bearer.insert("authorization", "Bearer token-xyz".parse().unwrap());
        assert_eq!(extract_bearer(&bearer), Some("token-xyz".to_owned()));
    }

    #[test]
    fn authorize_falls_back_to_query_param_only_when_header_is_absent() {
        let empty = HeaderMap::new();
        let mut params = HashMap::new();
        params.insert("access_token".to_owned(), "from-query".to_owned());
        assert_eq!(extract_bearer(&empty).or_else(|| params.get("access_token").cloned()), Some("from-query".to_owned()));

        let mut basic = HeaderMap::new();
        basic.insert("authorization", "Basic abc123".parse().unwrap());
        assert_eq!(
            extract_bearer(&basic).or_else(|| params.get("access_token").cloned()),
            Some("Basic abc123".to_owned())
        );
    }
}
