use axum::{
    Json,
    extract::{Multipart, State},
};
use chrono::Utc;

use crate::api::auth::AuthUser;
use crate::api::routes::AppState;
use crate::error::{ApiError, ApiResult};
use crate::ledger::{UploadSummary, build_upload};
use crate::persistence;
use crate::statement::{Broker, parse_statement};

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {e}"))
}

/// POST /api/dashboard/upload-statement
///
/// Multipart fields: `platform` (thinkorswim | robinhood) and `file`.
pub async fn upload_statement(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadSummary>> {
    let mut platform: Option<String> = None;
    let mut file: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("platform") => platform = Some(field.text().await.map_err(multipart_error)?),
            Some("file") => file = Some(field.bytes().await.map_err(multipart_error)?.to_vec()),
            _ => {}
        }
    }

    let platform = platform.filter(|p| !p.trim().is_empty());
    let (Some(platform), Some(file)) = (platform, file) else {
        return Err(ApiError::BadRequest("Platform and file are required".into()));
    };
    let broker: Broker = platform.parse()?;

    let executions = parse_statement(&file, broker);
    tracing::info!(
        user_id = %auth.user_id,
        broker = %broker,
        bytes = file.len(),
        executions = executions.len(),
        "parsed statement"
    );
    if executions.is_empty() {
        return Err(ApiError::NoExecutions);
    }

    // Index, commit and apply under one guard so concurrent uploads for a
    // symbol see each other's positions.
    let mut journal = state.journal.write().await;
    let index = journal.position_index(auth.user_id);
    let (batch, summary) = build_upload(auth.user_id, &executions, &index, Utc::now().date_naive());

    if let Some(pool) = &state.db {
        persistence::commit_batch(pool, &batch).await?;
    }
    journal.apply(&batch);
    drop(journal);

    tracing::info!(
        user_id = %auth.user_id,
        trades_added = summary.trades_added,
        new_positions = summary.new_positions,
        updated_positions = summary.updated_positions,
        total_pnl = %summary.total_pnl,
        "statement imported"
    );
    Ok(Json(summary))
}
