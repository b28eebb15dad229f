use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::auth::AuthUser;
use crate::api::routes::AppState;
use crate::api::trades::parse_trading_type;
use crate::error::ApiResult;
use crate::journal::TradeFilter;
use crate::stats;
use crate::types::trade::{Trade, TradingType};

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// `Swing`, `Day`, or absent / `all` for every trade.
    pub trading_type: Option<String>,
}

impl DashboardQuery {
    fn trading_type(&self) -> ApiResult<Option<TradingType>> {
        match self.trading_type.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(raw) => parse_trading_type(raw).map(Some),
        }
    }
}

async fn user_trades(state: &AppState, auth: &AuthUser) -> Vec<Trade> {
    state
        .journal
        .read()
        .await
        .trades_for_user(auth.user_id, &TradeFilter::default())
}

/// GET /api/dashboard/stats
pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Value>> {
    let trading_type = query.trading_type()?;
    let trades = user_trades(&state, &auth).await;
    let stats = stats::dashboard_stats(&trades, trading_type, Utc::now().date_naive());
    Ok(Json(json!({ "success": true, "stats": stats })))
}

/// GET /api/dashboard/chart
pub async fn chart(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Value>> {
    let trading_type = query.trading_type()?;
    let trades = user_trades(&state, &auth).await;
    let chart = stats::chart_data(&trades, trading_type);
    Ok(Json(json!({
        "success": true,
        "donut_chart": chart.donut_chart,
        "line_chart": chart.line_chart,
    })))
}

/// GET /api/dashboard/trading-type-stats
pub async fn trading_type_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Value>> {
    let trades = user_trades(&state, &auth).await;
    let (swing, day) = stats::trading_type_stats(&trades);
    Ok(Json(json!({
        "success": true,
        "swing_stats": swing,
        "day_stats": day,
    })))
}
