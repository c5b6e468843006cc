use crate::state::AppState;
use crate::types::{ApiError, Grant, Permission};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct OriginQuery {
    pub origin: String,
}

#[derive(Debug, Deserialize)]
pub struct AllowRequest {
    pub origin: String,
    pub grant: Grant,
}

pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Permission>>, ApiError> {
    Ok(Json(state.permissions.list().await?))
}

pub async fn get_permission(
    State(state): State<AppState>,
    Query(query): Query<OriginQuery>,
) -> Result<Json<Permission>, ApiError> {
    state
        .permissions
        .get(&query.origin)
        .await?
        .map(Json)
        .ok_or(ApiError::PermissionNotFound(query.origin))
}

pub async fn allow_permission(
    State(state): State<AppState>,
    Json(request): Json<AllowRequest>,
) -> Result<StatusCode, ApiError> {
    state.permissions.allow(&request.origin, request.grant).await?;
    info!("granted access to {}", request.origin);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_permission(
    State(state): State<AppState>,
    Query(query): Query<OriginQuery>,
) -> Result<StatusCode, ApiError> {
    state.permissions.remove(&query.origin).await?;
    info!("revoked access for {}", query.origin);
    Ok(StatusCode::NO_CONTENT)
}
