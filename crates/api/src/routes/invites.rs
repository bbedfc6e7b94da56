//! Role invite administration.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    remote_max_uses, CreateRoleInviteRequest, InviteRecord, InviteSummary, ListInvitesResponse,
    RoleInviteResponse, UpdateInviteUsesRequest,
};
use domain::services::{GatewayError, InviteParams};
use persistence::repositories::InviteRepository;
use shared::duration::parse_duration_secs;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// Create an invite that grants a role.
///
/// POST /api/v1/communities/:community_id/invites
///
/// The role must exist. Without a channel the community's system channel is
/// used. The stored record carries the requested `max_uses`; the remote
/// invite may allow one more use (see [`remote_max_uses`]).
pub async fn create_invite(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
    Json(request): Json<CreateRoleInviteRequest>,
) -> Result<(StatusCode, Json<RoleInviteResponse>), ApiError> {
    request.validate()?;

    let duration_seconds = parse_duration_secs(request.duration.as_deref().unwrap_or("0"))
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let max_uses = request.max_uses.unwrap_or(0);

    if !state
        .gateway
        .role_exists(&community_id, request.role_id)
        .await?
    {
        return Err(ApiError::NotFound(format!(
            "Role {} does not exist",
            request.role_id
        )));
    }

    let channel_id = match request.channel_id {
        Some(channel_id) => channel_id,
        None => state
            .gateway
            .default_channel(&community_id)
            .await?
            .ok_or_else(|| {
                ApiError::Validation(
                    "Community has no default channel; channel_id is required".to_string(),
                )
            })?,
    };

    let params = InviteParams {
        max_age_secs: duration_seconds,
        max_uses: remote_max_uses(max_uses),
        reason: Some(format!(
            "Role invite for role {} created by {}",
            request.role_id, request.created_by
        )),
    };
    let live = state.gateway.create_invite(channel_id, &params).await?;

    let record = InviteRecord {
        invite_id: live.id,
        community_id: community_id.clone(),
        role_id: Some(request.role_id),
        creator_id: request.created_by,
        uses: 0,
        max_uses,
        duration_seconds: Some(duration_seconds),
        channel_id: Some(channel_id),
    };
    // Replaces a role-less record a concurrent reconciliation may have stored.
    InviteRepository::new(state.pool.clone())
        .upsert(&record)
        .await?;

    info!(
        community_id = %community_id,
        invite_id = %record.invite_id,
        role_id = request.role_id,
        creator_id = request.created_by,
        "Role invite created"
    );

    Ok((
        StatusCode::CREATED,
        Json(RoleInviteResponse::from_record(record)),
    ))
}

/// List the stored invites of a community in store order.
///
/// GET /api/v1/communities/:community_id/invites
pub async fn list_invites(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
) -> Result<Json<ListInvitesResponse>, ApiError> {
    let records = InviteRepository::new(state.pool.clone())
        .load(&community_id)
        .await?;

    Ok(Json(ListInvitesResponse {
        data: records.iter().map(InviteSummary::from).collect(),
    }))
}

/// Overwrite the stored use counter of an invite.
///
/// PATCH /api/v1/invites/:invite_id
pub async fn update_invite_uses(
    State(state): State<AppState>,
    Path(invite_id): Path<String>,
    Json(request): Json<UpdateInviteUsesRequest>,
) -> Result<Json<RoleInviteResponse>, ApiError> {
    request.validate()?;

    let repo = InviteRepository::new(state.pool.clone());
    if repo.set_uses(&invite_id, request.uses).await? == 0 {
        return Err(ApiError::NotFound(format!("Invite {} not found", invite_id)));
    }
    let record = repo
        .find(&invite_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Invite {} not found", invite_id)))?;

    info!(invite_id = %invite_id, uses = request.uses, "Invite uses updated");
    Ok(Json(RoleInviteResponse::from_record(record)))
}

/// Revoke an invite remotely and forget it locally.
///
/// DELETE /api/v1/invites/:invite_id
///
/// An invite already gone remotely is still removed locally.
pub async fn revoke_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let remote_found = match state.gateway.delete_invite(&invite_id).await {
        Ok(()) => true,
        Err(GatewayError::NotFound(_)) => false,
        Err(err) => return Err(err.into()),
    };

    let removed = InviteRepository::new(state.pool.clone())
        .remove(&invite_id)
        .await?;

    if !remote_found && removed == 0 {
        return Err(ApiError::NotFound(format!("Invite {} not found", invite_id)));
    }

    info!(invite_id = %invite_id, remote_found, "Invite revoked");
    Ok(StatusCode::NO_CONTENT)
}
