//! Position persistence: upsert within a transaction, list for hydration, delete.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::types::position::{Position, PositionStatus};

/// Insert a position or overwrite the row with the same id.
pub async fn upsert_position(conn: &mut PgConnection, pos: &Position) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO positions (id, user_id, symbol, status, total_shares, buy_price, buy_date, \
         sell_price, sell_date, pnl, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (id) DO UPDATE SET status = $4, total_shares = $5, buy_price = $6, \
         buy_date = $7, sell_price = $8, sell_date = $9, pnl = $10, updated_at = $12",
    )
    .bind(&pos.id)
    .bind(pos.user_id)
    .bind(&pos.symbol)
    .bind(pos.status.as_str())
    .bind(pos.total_shares)
    .bind(pos.buy_price)
    .bind(pos.buy_date)
    .bind(pos.sell_price)
    .bind(pos.sell_date)
    .bind(pos.pnl)
    .bind(pos.created_at)
    .bind(pos.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
pub struct PositionRow {
    pub id: String,
    pub user_id: Uuid,
    pub symbol: String,
    pub status: String,
    pub total_shares: Decimal,
    pub buy_price: Decimal,
    pub buy_date: NaiveDate,
    pub sell_price: Option<Decimal>,
    pub sell_date: Option<NaiveDate>,
    pub pnl: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Convert a row for hydration. Skips rows with an unknown status.
pub fn position_row_to_position(row: PositionRow) -> Option<Position> {
    let status = PositionStatus::parse(&row.status)?;
    Some(Position {
        id: row.id,
        user_id: row.user_id,
        symbol: row.symbol,
        status,
        total_shares: row.total_shares,
        buy_price: row.buy_price,
        buy_date: row.buy_date,
        sell_price: row.sell_price,
        sell_date: row.sell_date,
        pnl: row.pnl,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// List all positions for hydration.
pub async fn list_positions(pool: &PgPool) -> Result<Vec<PositionRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PositionRow>(
        "SELECT id, user_id, symbol, status, total_shares, buy_price, buy_date, sell_price, \
         sell_date, pnl, created_at, updated_at FROM positions",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Delete a user's position together with its trades.
pub async fn delete_position(
    pool: &PgPool,
    user_id: Uuid,
    position_id: &str,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM trades WHERE position_id = $1 AND user_id = $2")
        .bind(position_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM positions WHERE id = $1 AND user_id = $2")
        .bind(position_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}
