//! Database pool and migrations.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a pool from `DATABASE_URL` and bring the schema up to date.
pub async fn create_pool_and_migrate(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    run_migrations(&pool).await?;
    tracing::info!(max_connections, "database pool ready");
    Ok(pool)
}

/// Run embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
