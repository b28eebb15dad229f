use std::net::SocketAddr;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const DEV_JWT_SECRET: &str = "dev-jwt-secret-change-me";

pub struct Config {
    pub listen_addr: SocketAddr,
    /// In-memory only when unset.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: Vec<u8>,
    pub cors_allow: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("JOURNAL_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid JOURNAL_LISTEN_ADDR: {e}"))?;
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let db_max_connections = std::env::var("JOURNAL_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret.into_bytes(),
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.as_bytes().to_vec()
            }
        };
        let cors_allow = std::env::var("JOURNAL_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self {
            listen_addr,
            database_url,
            db_max_connections,
            jwt_secret,
            cors_allow,
        })
    }
}

/// `RUST_LOG` picks the filter; `JOURNAL_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let log_format = std::env::var("JOURNAL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trade_journal=debug,tower_http=info,info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}
