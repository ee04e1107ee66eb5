use api_types::summary::SummaryResponse;
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::users;
use uuid::Uuid;

use crate::{ServerError, convert, server::ServerState};

/// Handle requests for the balances of a group
pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<SummaryResponse>, ServerError> {
    let summary = state
        .engine
        .group_summary(group_id, &user.username)
        .await?;
    Ok(Json(convert::summary_response(&summary)))
}
