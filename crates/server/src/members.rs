//! Group membership API endpoints

use api_types::member::{MemberNew, MemberView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{NewMember, users};
use uuid::Uuid;

use crate::{ServerError, convert, server::ServerState};

/// Adds a registered user (`username`) or a guest (`name`) to a group.
pub async fn add(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<MemberNew>,
) -> Result<(StatusCode, Json<MemberView>), ServerError> {
    let new_member = match (payload.username, payload.name) {
        (Some(username), None) => NewMember::Registered(username),
        (None, Some(name)) => NewMember::Guest(name),
        _ => {
            return Err(ServerError::Generic(
                "either username or name required".to_string(),
            ));
        }
    };

    let member = state
        .engine
        .add_member(group_id, new_member, &user.username)
        .await?;
    Ok((StatusCode::CREATED, Json(convert::member_view(&member))))
}

pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((group_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_member(group_id, member_id, &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
