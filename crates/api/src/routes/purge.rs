//! Bulk message deletion.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use domain::models::{select_purgeable, PurgeRequest, PurgeResponse};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// Delete recent messages of a channel that match a filter.
///
/// POST /api/v1/channels/:channel_id/purge
///
/// Scans the `amount` most recent messages. Pinned messages and messages
/// too old for bulk deletion are kept.
pub async fn purge_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
    Json(request): Json<PurgeRequest>,
) -> Result<Json<PurgeResponse>, ApiError> {
    request.validate()?;

    let max = state.config.limits.max_purge_amount;
    if request.amount > max {
        return Err(ApiError::Validation(format!(
            "amount must be at most {}",
            max
        )));
    }

    let messages = state
        .gateway
        .recent_messages(channel_id, request.amount)
        .await?;
    let ids = select_purgeable(&messages, &request.filter, Utc::now());

    let deleted = if ids.is_empty() {
        0
    } else {
        state.gateway.delete_messages(channel_id, &ids).await?
    };

    info!(
        channel_id,
        filter = request.filter.name(),
        scanned = messages.len(),
        deleted,
        "Purged messages"
    );
    Ok(Json(PurgeResponse { deleted }))
}
