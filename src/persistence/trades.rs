//! Trade persistence: insert within a transaction, list for hydration, update, delete.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::types::position::PositionStatus;
use crate::types::trade::{Trade, TradingType, WinLoss};

#[derive(Debug, FromRow)]
pub struct TradeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticker_symbol: String,
    pub number_of_shares: Decimal,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub price_cost_basis: Option<Decimal>,
    pub proceeds: Option<Decimal>,
    pub date: NaiveDate,
    pub trading_type: String,
    pub win_loss: String,
    pub status: String,
    pub position_id: Option<String>,
    pub shares_remaining: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Convert a row for hydration. Skips rows with unknown enum values.
pub fn trade_row_to_trade(row: TradeRow) -> Option<Trade> {
    Some(Trade {
        id: row.id,
        user_id: row.user_id,
        ticker_symbol: row.ticker_symbol,
        number_of_shares: row.number_of_shares,
        buy_price: row.buy_price,
        sell_price: row.sell_price,
        price_cost_basis: row.price_cost_basis,
        proceeds: row.proceeds,
        date: row.date,
        trading_type: TradingType::parse(&row.trading_type)?,
        win_loss: WinLoss::parse(&row.win_loss)?,
        status: PositionStatus::parse(&row.status)?,
        position_id: row.position_id,
        shares_remaining: row.shares_remaining,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// List all trades in insertion order, for hydration.
pub async fn list_trades(pool: &PgPool) -> Result<Vec<TradeRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TradeRow>(
        "SELECT id, user_id, ticker_symbol, number_of_shares, buy_price, sell_price, \
         price_cost_basis, proceeds, date, trading_type, win_loss, status, position_id, \
         shares_remaining, created_at, updated_at FROM trades ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Insert a single trade.
pub async fn insert_trade(conn: &mut PgConnection, trade: &Trade) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO trades (id, user_id, ticker_symbol, number_of_shares, buy_price, sell_price, \
         price_cost_basis, proceeds, date, trading_type, win_loss, status, position_id, \
         shares_remaining, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(trade.id)
    .bind(trade.user_id)
    .bind(&trade.ticker_symbol)
    .bind(trade.number_of_shares)
    .bind(trade.buy_price)
    .bind(trade.sell_price)
    .bind(trade.price_cost_basis)
    .bind(trade.proceeds)
    .bind(trade.date)
    .bind(trade.trading_type.as_str())
    .bind(trade.win_loss.as_str())
    .bind(trade.status.as_str())
    .bind(&trade.position_id)
    .bind(trade.shares_remaining)
    .bind(trade.created_at)
    .bind(trade.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Overwrite the editable fields of a trade, including the derived ones.
pub async fn update_trade(pool: &PgPool, trade: &Trade) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE trades SET ticker_symbol = $3, number_of_shares = $4, buy_price = $5, \
         sell_price = $6, price_cost_basis = $7, proceeds = $8, date = $9, trading_type = $10, \
         win_loss = $11, status = $12, updated_at = $13 WHERE id = $1 AND user_id = $2",
    )
    .bind(trade.id)
    .bind(trade.user_id)
    .bind(&trade.ticker_symbol)
    .bind(trade.number_of_shares)
    .bind(trade.buy_price)
    .bind(trade.sell_price)
    .bind(trade.price_cost_basis)
    .bind(trade.proceeds)
    .bind(trade.date)
    .bind(trade.trading_type.as_str())
    .bind(trade.win_loss.as_str())
    .bind(trade.status.as_str())
    .bind(trade.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_trade(pool: &PgPool, user_id: Uuid, trade_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM trades WHERE id = $1 AND user_id = $2")
        .bind(trade_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
