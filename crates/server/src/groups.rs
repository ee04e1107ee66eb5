//! Group API endpoints

use api_types::group::{GroupNew, GroupView, GroupsResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::users;
use uuid::Uuid;

use crate::{ServerError, convert, server::ServerState};

/// Handle requests for creating a new group owned by the caller
pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupView>), ServerError> {
    let group = state
        .engine
        .create_group(&payload.name, &user.username)
        .await?;
    Ok((StatusCode::CREATED, Json(convert::group_view(&group))))
}

/// Handle requests for listing the caller's groups
pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<GroupsResponse>, ServerError> {
    let groups = state.engine.list_groups(&user.username).await?;
    Ok(Json(GroupsResponse {
        groups: groups.iter().map(convert::group_view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupView>, ServerError> {
    let group = state.engine.group(group_id, &user.username).await?;
    Ok(Json(convert::group_view(&group)))
}

/// Deletes the group with all its expenses (creator only)
pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_group(group_id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
