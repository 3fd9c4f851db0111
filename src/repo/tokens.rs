use sqlx::PgPool;

/// Resolves a bearer token to the account id it authorizes, the same join
/// the upstream source performs against its OAuth tables.
pub async fn lookup_account_by_token(pool: &PgPool, token: &str) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT users.account_id FROM oauth_access_tokens
           INNER JOIN users ON oauth_access_tokens.resource_owner_id = users.id
           WHERE oauth_access_tokens.token = $1"#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}
