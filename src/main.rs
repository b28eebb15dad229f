use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use trade_journal::api::auth::AuthUserCredential;
use trade_journal::api::routes::{AppState, UserStore, app_router_with_cors};
use trade_journal::config::{Config, init_tracing};
use trade_journal::journal::Journal;
use trade_journal::persistence;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let mut users = HashMap::new();
    let (journal, db) = match &config.database_url {
        Some(url) => {
            let pool = persistence::create_pool_and_migrate(url, config.db_max_connections).await?;
            for row in persistence::list_users(&pool).await? {
                users.insert(
                    row.username.clone(),
                    AuthUserCredential {
                        user_id: row.id,
                        username: row.username,
                        password_hash: row.password_hash,
                    },
                );
            }
            let journal = persistence::load_journal(&pool).await?;
            tracing::info!(users = users.len(), "hydrated users from database");
            (journal, Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, journal is in-memory only");
            (Journal::new(), None)
        }
    };

    let user_store: UserStore = Arc::new(RwLock::new(users));
    let app_state = AppState {
        journal: journal.shared(),
        jwt_secret: config.jwt_secret.clone(),
        user_store,
        db,
    };

    let app = app_router_with_cors(app_state, &config.cors_allow);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "trade journal listening");
    axum::serve(listener, app).await?;
    Ok(())
}
