//! Platform event ingestion.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::PlatformEvent;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_event_received;

/// Queue a platform event for processing.
///
/// POST /api/v1/events
///
/// Returns 202 once queued. A full queue is reported as 503 so the relay
/// retries later instead of the event being dropped silently.
pub async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<PlatformEvent>,
) -> Result<StatusCode, ApiError> {
    let kind = event.kind();
    match state.events.try_send(event) {
        Ok(()) => {
            record_event_received(kind);
            Ok(StatusCode::ACCEPTED)
        }
        Err(TrySendError::Full(event)) => {
            warn!(kind, community_id = %event.community_id(), "Event queue full");
            Err(ApiError::ServiceUnavailable("Event queue is full".to_string()))
        }
        Err(TrySendError::Closed(_)) => Err(ApiError::ServiceUnavailable(
            "Event processing has stopped".to_string(),
        )),
    }
}
