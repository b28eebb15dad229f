//! Journal note persistence: upsert, list for hydration, delete.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::entry::{EntryType, JournalEntry};

#[derive(Debug, FromRow)]
pub struct EntryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub notes: String,
    pub trade_id: Option<Uuid>,
    pub entry_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Convert a row for hydration. Skips rows with an unknown entry type.
pub fn entry_row_to_entry(row: EntryRow) -> Option<JournalEntry> {
    Some(JournalEntry {
        id: row.id,
        user_id: row.user_id,
        date: row.date,
        notes: row.notes,
        trade_id: row.trade_id,
        entry_type: EntryType::parse(&row.entry_type)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub async fn list_entries(pool: &PgPool) -> Result<Vec<EntryRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EntryRow>(
        "SELECT id, user_id, date, notes, trade_id, entry_type, created_at, updated_at \
         FROM journal_entries ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Insert a note or overwrite the row with the same id.
pub async fn upsert_entry(pool: &PgPool, entry: &JournalEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO journal_entries (id, user_id, date, notes, trade_id, entry_type, \
         created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (id) DO UPDATE SET date = $3, notes = $4, trade_id = $5, \
         entry_type = $6, updated_at = $8",
    )
    .bind(entry.id)
    .bind(entry.user_id)
    .bind(entry.date)
    .bind(&entry.notes)
    .bind(entry.trade_id)
    .bind(entry.entry_type.as_str())
    .bind(entry.created_at)
    .bind(entry.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_entry(pool: &PgPool, user_id: Uuid, entry_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM journal_entries WHERE id = $1 AND user_id = $2")
        .bind(entry_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
