use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::api::routes::AppState;
use crate::error::{ApiError, ApiResult};
use crate::journal::{PositionFilter, TradeFilter};
use crate::ledger::LedgerBatch;
use crate::persistence;
use crate::types::position::{Position, PositionStatus};
use crate::types::trade::{NewTrade, Trade, TradingType, WinLoss};

#[derive(Debug, Default, Deserialize)]
pub struct TradeQuery {
    pub trading_type: Option<String>,
    pub win_loss: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn parse_iso_date(field: &str, raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}, expected YYYY-MM-DD")))
}

pub(crate) fn parse_status(raw: &str) -> ApiResult<PositionStatus> {
    PositionStatus::parse(raw)
        .ok_or_else(|| ApiError::BadRequest("status must be OPEN or CLOSED".into()))
}

pub(crate) fn parse_trading_type(raw: &str) -> ApiResult<TradingType> {
    TradingType::parse(raw)
        .ok_or_else(|| ApiError::BadRequest(r#"Trading type must be either "Swing" or "Day""#.into()))
}

impl TradeQuery {
    fn to_filter(&self) -> ApiResult<TradeFilter> {
        Ok(TradeFilter {
            trading_type: non_empty(&self.trading_type)
                .map(parse_trading_type)
                .transpose()?,
            win_loss: non_empty(&self.win_loss)
                .map(|w| {
                    WinLoss::parse(w).ok_or_else(|| {
                        ApiError::BadRequest("win_loss must be Win, Loss or Pending".into())
                    })
                })
                .transpose()?,
            status: non_empty(&self.status).map(parse_status).transpose()?,
            date_from: non_empty(&self.date_from)
                .map(|d| parse_iso_date("date_from", d))
                .transpose()?,
            date_to: non_empty(&self.date_to)
                .map(|d| parse_iso_date("date_to", d))
                .transpose()?,
        })
    }
}

/// GET /api/trades
pub async fn list_trades(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TradeQuery>,
) -> ApiResult<Json<Value>> {
    let filter = query.to_filter()?;
    let journal = state.journal.read().await;
    let trades = journal.trades_for_user(auth.user_id, &filter);
    let open_positions = journal.positions_for_user(
        auth.user_id,
        &PositionFilter {
            status: Some(PositionStatus::Open),
            symbol: None,
        },
    );
    Ok(Json(json!({
        "success": true,
        "trades": trades,
        "open_positions": open_positions,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CreateTradeRequest {
    pub date: Option<String>,
    pub ticker_symbol: Option<String>,
    pub number_of_shares: Option<Decimal>,
    pub buy_price: Option<Decimal>,
    /// Absent or empty string means the trade is still open.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub sell_price: Option<Decimal>,
    pub trading_type: Option<String>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(Decimal),
        Text(String),
    }
    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// `Some(None)` when the field is present but null or blank.
fn present_blank_as_none<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    blank_as_none(deserializer).map(Some)
}

fn required<T>(value: Option<T>, field: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::BadRequest(format!("Missing required field: {field}")))
}

/// Stage a manual trade. An open trade is linked to the user's OPEN position
/// for the symbol, which is created or averaged into.
fn stage_manual_trade(
    user_id: Uuid,
    body: CreateTradeRequest,
    existing_open: Option<Position>,
) -> ApiResult<LedgerBatch> {
    let date = parse_iso_date("date", &required(body.date, "date")?)?;
    let symbol = required(body.ticker_symbol, "ticker_symbol")?
        .trim()
        .to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::BadRequest("Missing required field: ticker_symbol".into()));
    }
    let shares = required(body.number_of_shares, "number_of_shares")?;
    let buy_price = required(body.buy_price, "buy_price")?;
    let trading_type = parse_trading_type(&required(body.trading_type, "trading_type")?)?;
    if shares <= Decimal::ZERO {
        return Err(ApiError::BadRequest("number_of_shares must be positive".into()));
    }

    let mut batch = LedgerBatch::default();
    let (status, position_id) = match body.sell_price {
        Some(_) => (PositionStatus::Closed, None),
        None => {
            let position = match existing_open {
                Some(mut position) => {
                    let held = position.total_shares;
                    let averaged = held.checked_add(shares).and_then(|total| {
                        let cost = position
                            .buy_price
                            .checked_mul(held)?
                            .checked_add(buy_price.checked_mul(shares)?)?;
                        Some((total, cost.checked_div(total)?))
                    });
                    let (total, price) = averaged.ok_or_else(|| {
                        ApiError::BadRequest("Position size or price out of range".into())
                    })?;
                    position.buy_price = price;
                    position.total_shares = total;
                    position.buy_date = position.buy_date.min(date);
                    position.updated_at = chrono::Utc::now();
                    position
                }
                None => Position::open(user_id, &symbol, shares, buy_price, date),
            };
            let id = position.id.clone();
            batch.positions.push(position);
            (PositionStatus::Open, Some(id))
        }
    };

    batch.trades.push(Trade::new(NewTrade {
        user_id,
        ticker_symbol: symbol,
        number_of_shares: shares,
        buy_price: Some(buy_price),
        sell_price: body.sell_price,
        date,
        trading_type,
        status,
        shares_remaining: position_id.as_ref().map(|_| shares),
        position_id,
    }));
    Ok(batch)
}

/// POST /api/trades
pub async fn create_trade(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateTradeRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut journal = state.journal.write().await;
    let existing_open = body.ticker_symbol.as_deref().and_then(|symbol| {
        journal
            .position_index(auth.user_id)
            .open_for(&symbol.trim().to_uppercase())
            .cloned()
    });
    let batch = stage_manual_trade(auth.user_id, body, existing_open)?;

    if let Some(pool) = &state.db {
        persistence::commit_batch(pool, &batch).await?;
    }
    journal.apply(&batch);
    drop(journal);

    let trade = &batch.trades[0];
    tracing::info!(
        user_id = %auth.user_id,
        trade_id = %trade.id,
        symbol = %trade.ticker_symbol,
        status = trade.status.as_str(),
        "created manual trade"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "trade": trade,
            "message": "Trade created successfully",
        })),
    ))
}

fn parse_trade_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Trade"))
}

/// GET /api/trades/{id}
pub async fn get_trade(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let trade_id = parse_trade_id(&id)?;
    let journal = state.journal.read().await;
    let trade = journal
        .trade(auth.user_id, trade_id)
        .ok_or(ApiError::NotFound("Trade"))?;
    Ok(Json(json!({ "success": true, "trade": trade })))
}

/// DELETE /api/trades/{id}
pub async fn delete_trade(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let trade_id = parse_trade_id(&id)?;
    if state.journal.read().await.trade(auth.user_id, trade_id).is_none() {
        return Err(ApiError::NotFound("Trade"));
    }
    if let Some(pool) = &state.db {
        persistence::delete_trade(pool, auth.user_id, trade_id).await?;
    }
    state
        .journal
        .write()
        .await
        .remove_trade(auth.user_id, trade_id)
        .ok_or(ApiError::NotFound("Trade"))?;
    tracing::info!(user_id = %auth.user_id, %trade_id, "deleted trade");
    Ok(Json(json!({
        "success": true,
        "message": "Trade deleted successfully",
    })))
}

/// Partial edit. Absent fields are left unchanged; a null or blank
/// `sell_price` reopens a manual trade.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTradeRequest {
    pub date: Option<String>,
    pub ticker_symbol: Option<String>,
    pub number_of_shares: Option<Decimal>,
    pub buy_price: Option<Decimal>,
    #[serde(default, deserialize_with = "present_blank_as_none")]
    pub sell_price: Option<Option<Decimal>>,
    pub trading_type: Option<String>,
}

/// Apply an edit and re-derive cost basis, proceeds and win/loss. A trade that
/// is not linked to a position is CLOSED exactly when it has a sell price.
fn apply_trade_update(trade: &mut Trade, body: UpdateTradeRequest) -> ApiResult<()> {
    if let Some(date) = body.date {
        trade.date = parse_iso_date("date", date.trim())?;
    }
    if let Some(symbol) = body.ticker_symbol {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ApiError::BadRequest("ticker_symbol must not be empty".into()));
        }
        trade.ticker_symbol = symbol;
    }
    if let Some(shares) = body.number_of_shares {
        if shares <= Decimal::ZERO {
            return Err(ApiError::BadRequest("number_of_shares must be positive".into()));
        }
        trade.number_of_shares = shares;
    }
    if let Some(buy_price) = body.buy_price {
        trade.buy_price = Some(buy_price);
    }
    if let Some(sell_price) = body.sell_price {
        trade.sell_price = sell_price;
    }
    if let Some(trading_type) = body.trading_type {
        trade.trading_type = parse_trading_type(trading_type.trim())?;
    }
    if trade.position_id.is_none() {
        trade.status = match trade.sell_price {
            Some(_) => PositionStatus::Closed,
            None => PositionStatus::Open,
        };
    }
    trade.derive();
    Ok(())
}

/// PUT /api/trades/{id}
pub async fn update_trade(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateTradeRequest>,
) -> ApiResult<Json<Value>> {
    let trade_id = parse_trade_id(&id)?;
    let mut journal = state.journal.write().await;
    let mut trade = journal
        .trade(auth.user_id, trade_id)
        .cloned()
        .ok_or(ApiError::NotFound("Trade"))?;
    apply_trade_update(&mut trade, body)?;

    if let Some(pool) = &state.db {
        persistence::update_trade(pool, &trade).await?;
    }
    journal
        .replace_trade(trade.clone())
        .ok_or(ApiError::NotFound("Trade"))?;
    drop(journal);

    tracing::info!(
        user_id = %auth.user_id,
        %trade_id,
        win_loss = trade.win_loss.as_str(),
        "updated trade"
    );
    Ok(Json(json!({
        "success": true,
        "trade": trade,
        "message": "Trade updated successfully",
    })))
}
