//! Journal notes: dated free text, optionally attached to one of the user's trades.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::api::routes::AppState;
use crate::api::trades::parse_iso_date;
use crate::error::{ApiError, ApiResult};
use crate::journal::{EntryFilter, Journal};
use crate::persistence;
use crate::types::entry::{EntryType, JournalEntry};

#[derive(Debug, Default, Deserialize)]
pub struct EntryQuery {
    pub trade_id: Option<String>,
    pub entry_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl EntryQuery {
    fn to_filter(&self) -> ApiResult<EntryFilter> {
        Ok(EntryFilter {
            trade_id: non_empty(&self.trade_id)
                .map(|id| {
                    Uuid::parse_str(id)
                        .map_err(|_| ApiError::BadRequest("Invalid trade_id".into()))
                })
                .transpose()?,
            entry_type: non_empty(&self.entry_type)
                .map(|t| {
                    EntryType::parse(t).ok_or_else(|| {
                        ApiError::BadRequest("entry_type must be trade_specific or general".into())
                    })
                })
                .transpose()?,
            date_from: non_empty(&self.date_from)
                .map(|d| parse_iso_date("date_from", d))
                .transpose()?,
            date_to: non_empty(&self.date_to)
                .map(|d| parse_iso_date("date_to", d))
                .transpose()?,
        })
    }
}

/// A trade id from a request body must name one of the caller's trades.
fn linked_trade(journal: &Journal, user_id: Uuid, raw: Option<&str>) -> ApiResult<Option<Uuid>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    Uuid::parse_str(raw)
        .ok()
        .filter(|id| journal.trade(user_id, *id).is_some())
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest("Referenced trade not found".into()))
}

fn parse_entry_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Journal entry"))
}

/// GET /api/journal
pub async fn list_entries(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<EntryQuery>,
) -> ApiResult<Json<Value>> {
    let filter = query.to_filter()?;
    let entries = state
        .journal
        .read()
        .await
        .entries_for_user(auth.user_id, &filter);
    Ok(Json(json!({ "success": true, "entries": entries })))
}

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub date: Option<String>,
    pub notes: Option<String>,
    pub trade_id: Option<String>,
}

/// POST /api/journal
pub async fn create_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateEntryRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let date = body
        .date
        .ok_or_else(|| ApiError::BadRequest("Missing required field: date".into()))?;
    let date = parse_iso_date("date", date.trim())?;
    let notes = body
        .notes
        .ok_or_else(|| ApiError::BadRequest("Missing required field: notes".into()))?;

    let mut journal = state.journal.write().await;
    let trade_id = linked_trade(&journal, auth.user_id, body.trade_id.as_deref())?;
    let entry = JournalEntry::new(auth.user_id, date, notes, trade_id);
    if let Some(pool) = &state.db {
        persistence::upsert_entry(pool, &entry).await?;
    }
    journal.upsert_entry(entry.clone());
    drop(journal);

    tracing::info!(
        user_id = %auth.user_id,
        entry_id = %entry.id,
        entry_type = entry.entry_type.as_str(),
        "created journal entry"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "entry": entry,
            "message": "Journal entry created successfully",
        })),
    ))
}

/// GET /api/journal/{id}
pub async fn get_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let entry_id = parse_entry_id(&id)?;
    let journal = state.journal.read().await;
    let entry = journal
        .entry(auth.user_id, entry_id)
        .ok_or(ApiError::NotFound("Journal entry"))?;
    Ok(Json(json!({ "success": true, "entry": entry })))
}

/// Partial edit; `trade_id: null` or `""` detaches the note from its trade.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEntryRequest {
    pub date: Option<String>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub trade_id: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// PUT /api/journal/{id}
pub async fn update_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateEntryRequest>,
) -> ApiResult<Json<Value>> {
    let entry_id = parse_entry_id(&id)?;
    let mut journal = state.journal.write().await;
    let mut entry = journal
        .entry(auth.user_id, entry_id)
        .cloned()
        .ok_or(ApiError::NotFound("Journal entry"))?;

    if let Some(date) = body.date {
        entry.date = parse_iso_date("date", date.trim())?;
    }
    if let Some(notes) = body.notes {
        entry.notes = notes;
    }
    if let Some(trade_id) = body.trade_id {
        let trade_id = linked_trade(&journal, auth.user_id, trade_id.as_deref())?;
        entry.link_trade(trade_id);
    }
    entry.updated_at = chrono::Utc::now();

    if let Some(pool) = &state.db {
        persistence::upsert_entry(pool, &entry).await?;
    }
    journal.upsert_entry(entry.clone());
    drop(journal);

    Ok(Json(json!({
        "success": true,
        "entry": entry,
        "message": "Journal entry updated successfully",
    })))
}

/// DELETE /api/journal/{id}
pub async fn delete_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let entry_id = parse_entry_id(&id)?;
    let mut journal = state.journal.write().await;
    if journal.entry(auth.user_id, entry_id).is_none() {
        return Err(ApiError::NotFound("Journal entry"));
    }
    if let Some(pool) = &state.db {
        persistence::delete_entry(pool, auth.user_id, entry_id).await?;
    }
    journal.remove_entry(auth.user_id, entry_id);
    drop(journal);

    tracing::info!(user_id = %auth.user_id, %entry_id, "deleted journal entry");
    Ok(Json(json!({
        "success": true,
        "message": "Journal entry deleted successfully",
    })))
}
