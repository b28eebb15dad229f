use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use serde_json::{Value, json};
use sqlx::PgPool;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::auth::{self, AuthUserCredential};
use crate::api::{dashboard, entries, positions, trades, upload};
use crate::journal::SharedJournal;

/// Registered users keyed by lowercase username.
pub type UserStore = Arc<RwLock<HashMap<String, AuthUserCredential>>>;

const UPLOAD_BODY_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub journal: SharedJournal,
    pub jwt_secret: Vec<u8>,
    pub user_store: UserStore,
    /// Write-through target; in-memory only when `None`.
    pub db: Option<PgPool>,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

fn cors_layer(allow: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    if allow.is_empty() || allow.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allow
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    layer.allow_origin(origins)
}

pub fn app_router(state: AppState) -> Router {
    app_router_with_cors(state, &[])
}

pub fn app_router_with_cors(state: AppState, cors_allow: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        .route(
            "/api/dashboard/upload-statement",
            post(upload::upload_statement).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/dashboard/stats", get(dashboard::stats))
        .route("/api/dashboard/chart", get(dashboard::chart))
        .route(
            "/api/dashboard/trading-type-stats",
            get(dashboard::trading_type_stats),
        )
        .route("/api/trades", get(trades::list_trades).post(trades::create_trade))
        .route("/api/trades/positions", get(positions::list_positions))
        .route(
            "/api/trades/positions/{id}",
            get(positions::get_position).delete(positions::delete_position),
        )
        .route(
            "/api/trades/{id}",
            get(trades::get_trade)
                .put(trades::update_trade)
                .delete(trades::delete_trade),
        )
        .route(
            "/api/journal",
            get(entries::list_entries).post(entries::create_entry),
        )
        .route(
            "/api/journal/{id}",
            get(entries::get_entry)
                .put(entries::update_entry)
                .delete(entries::delete_entry),
        )
        .layer(cors_layer(cors_allow))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
