use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lendkaki_api::api;
use lendkaki_api::config::Config;
use lendkaki_api::db::Database;
use lendkaki_api::handlers::AppState;
use lendkaki_api::store::{LeadStore, PgLeadStore, SupabaseLeadStore};

/// Initializes logging, configuration and the lead datastore, then serves
/// the lead API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lendkaki_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Postgres wins when both are configured
    let store: Option<Arc<dyn LeadStore>> = if let Some(ref database_url) = config.database_url {
        let db = Database::new(database_url, config.db_max_connections).await?;
        tracing::info!("Database connection pool established");
        Some(Arc::new(PgLeadStore::new(db.pool)))
    } else if let Some(ref supabase) = config.supabase {
        let store = SupabaseLeadStore::new(supabase)
            .map_err(|e| anyhow::anyhow!("Failed to initialize Supabase store: {}", e))?;
        Some(Arc::new(store))
    } else {
        None
    };

    let app_state = Arc::new(AppState {
        config: config.clone(),
        store,
    });

    let app = api::router(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
