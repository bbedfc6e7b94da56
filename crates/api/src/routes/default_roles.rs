//! Default role configuration.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::{DefaultRole, SetDefaultRoleRequest};
use persistence::repositories::DefaultRoleRepository;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// Set the role granted to every admitted member of a community.
///
/// PUT /api/v1/communities/:community_id/default-role
pub async fn set_default_role(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
    Json(request): Json<SetDefaultRoleRequest>,
) -> Result<Json<DefaultRole>, ApiError> {
    request.validate()?;

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

    let default_role = DefaultRoleRepository::new(state.pool.clone())
        .set(&community_id, request.role_id)
        .await?;

    info!(community_id = %community_id, role_id = request.role_id, "Default role set");
    Ok(Json(default_role))
}
