//! Database layer: pool, migrations, and access for users, positions, trades
//! and journal notes.

mod entries;
mod pool;
mod positions;
mod trades;
mod users;

pub use entries::{EntryRow, delete_entry, entry_row_to_entry, list_entries, upsert_entry};
pub use pool::{create_pool_and_migrate, run_migrations};
pub use positions::{
    PositionRow, delete_position, list_positions, position_row_to_position, upsert_position,
};
pub use sqlx::PgPool;
pub use trades::{
    TradeRow, delete_trade, insert_trade, list_trades, trade_row_to_trade, update_trade,
};
pub use users::{UserRow, insert_user, list_users, update_password};

use crate::journal::Journal;
use crate::ledger::LedgerBatch;

/// Write a staged batch in one transaction. Nothing is kept if any write fails.
pub async fn commit_batch(pool: &PgPool, batch: &LedgerBatch) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for position in &batch.positions {
        upsert_position(&mut *tx, position).await?;
    }
    for trade in &batch.trades {
        insert_trade(&mut *tx, trade).await?;
    }
    tx.commit().await?;
    tracing::debug!(
        positions = batch.positions.len(),
        trades = batch.trades.len(),
        "committed ledger batch"
    );
    Ok(())
}

/// Load every position, trade and note into a fresh journal.
pub async fn load_journal(pool: &PgPool) -> Result<Journal, sqlx::Error> {
    let positions: Vec<_> = list_positions(pool)
        .await?
        .into_iter()
        .filter_map(position_row_to_position)
        .collect();
    let trades: Vec<_> = list_trades(pool)
        .await?
        .into_iter()
        .filter_map(trade_row_to_trade)
        .collect();
    let entries: Vec<_> = list_entries(pool)
        .await?
        .into_iter()
        .filter_map(entry_row_to_entry)
        .collect();
    tracing::info!(
        positions = positions.len(),
        trades = trades.len(),
        entries = entries.len(),
        "hydrated journal from database"
    );
    Ok(Journal::from_parts(positions, trades, entries))
}
