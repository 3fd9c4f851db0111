use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::GatewayError;

pub async fn create_pool(database_url: &str) -> Result<PgPool, GatewayError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(GatewayError::Database)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), GatewayError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|err| GatewayError::Config(err.to_string()))
}
