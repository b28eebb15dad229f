use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::auth::AuthUser;
use crate::api::routes::AppState;
use crate::api::trades::parse_status;
use crate::error::{ApiError, ApiResult};
use crate::journal::PositionFilter;
use crate::persistence;

#[derive(Debug, Default, Deserialize)]
pub struct PositionQuery {
    pub status: Option<String>,
    pub symbol: Option<String>,
}

/// GET /api/trades/positions
pub async fn list_positions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PositionQuery>,
) -> ApiResult<Json<Value>> {
    let filter = PositionFilter {
        status: query
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(parse_status)
            .transpose()?,
        symbol: query.symbol.filter(|s| !s.trim().is_empty()),
    };
    let positions = state
        .journal
        .read()
        .await
        .positions_for_user(auth.user_id, &filter);
    Ok(Json(json!({
        "success": true,
        "total_count": positions.len(),
        "positions": positions,
    })))
}

/// GET /api/trades/positions/{id}
pub async fn get_position(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let (position, trades) = state
        .journal
        .read()
        .await
        .position_detail(auth.user_id, &id)
        .ok_or(ApiError::NotFound("Position"))?;
    Ok(Json(json!({
        "success": true,
        "position": position,
        "trades_count": trades.len(),
        "trades": trades,
    })))
}

/// DELETE /api/trades/positions/{id}
///
/// Removes the position together with every trade linked to it.
pub async fn delete_position(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let symbol = state
        .journal
        .read()
        .await
        .position(auth.user_id, &id)
        .map(|p| p.symbol.clone())
        .ok_or(ApiError::NotFound("Position"))?;
    if let Some(pool) = &state.db {
        persistence::delete_position(pool, auth.user_id, &id).await?;
    }
    let removed = state
        .journal
        .write()
        .await
        .remove_position(auth.user_id, &id)
        .ok_or(ApiError::NotFound("Position"))?;
    tracing::info!(user_id = %auth.user_id, position_id = %id, trades = removed, "deleted position");
    Ok(Json(json!({
        "success": true,
        "message": format!("Position {symbol} and {removed} associated trades deleted successfully"),
    })))
}
