use sqlx::{postgres::PgPoolOptions, PgPool};

/// Postgres pool holding the `leads` table.
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;

        // A lead must not be the first thing to discover bad credentials.
        sqlx::query("SELECT 1").execute(&pool).await?;

        tracing::debug!("Postgres pool ready ({} connections max)", max_connections);
        Ok(Self { pool })
    }
}
