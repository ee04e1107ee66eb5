//! Expense API endpoints

use api_types::expense::{ExpenseNew, ExpenseUpdate, ExpenseView, ExpensesResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{ExpenseCmd, MoneyCents, SplitRequest, UpdateExpenseCmd, users};
use uuid::Uuid;

use crate::{ServerError, convert, server::ServerState};

/// Handle requests for recording an expense paid by the caller
pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    let mut split = SplitRequest {
        policy: payload
            .split_policy
            .map(convert::split_policy)
            .unwrap_or_default(),
        participants: None,
        explicit: convert::explicit_splits(payload.splits.as_deref().unwrap_or_default())?,
    };
    if let Some(participants) = payload.participants.as_deref() {
        split = split.participants(convert::member_keys(participants)?);
    }

    let mut cmd = ExpenseCmd::new(
        payload.group_id,
        user.username.as_str(),
        payload.description,
        MoneyCents::new(payload.amount_minor),
    )
    .split(split);
    if let Some(category) = payload.category {
        cmd = cmd.category(convert::category(category));
    }
    if let Some(occurred_at) = payload.occurred_at {
        cmd = cmd.occurred_at(occurred_at.with_timezone(&Utc));
    }

    let expense = state.engine.create_expense(cmd).await?;
    Ok((StatusCode::CREATED, Json(convert::expense_view(&expense))))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.engine.expense(id, &user.username).await?;
    Ok(Json(convert::expense_view(&expense)))
}

/// Handle requests for listing the expenses of a group, newest first
pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<ExpensesResponse>, ServerError> {
    let expenses = state
        .engine
        .list_expenses(group_id, &user.username)
        .await?;
    Ok(Json(ExpensesResponse {
        expenses: expenses.iter().map(convert::expense_view).collect(),
    }))
}

/// Handle requests for patching an expense (payer only)
pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<Json<ExpenseView>, ServerError> {
    let mut cmd = UpdateExpenseCmd::new(id, user.username.as_str());
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(amount_minor) = payload.amount_minor {
        cmd = cmd.amount(MoneyCents::new(amount_minor));
    }
    if let Some(category) = payload.category {
        cmd = cmd.category(convert::category(category));
    }
    if let Some(occurred_at) = payload.occurred_at {
        cmd = cmd.occurred_at(occurred_at.with_timezone(&Utc));
    }
    if let Some(policy) = payload.split_policy {
        cmd = cmd.policy(convert::split_policy(policy));
    }
    if let Some(participants) = payload.participants.as_deref() {
        cmd = cmd.participants(convert::member_keys(participants)?);
    }
    if let Some(splits) = payload.splits.as_deref() {
        cmd = cmd.explicit(convert::explicit_splits(splits)?);
    }

    let expense = state.engine.update_expense(cmd).await?;
    Ok(Json(convert::expense_view(&expense)))
}

/// Deletes an expense and its splits (payer only)
pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
