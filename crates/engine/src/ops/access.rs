//! Loading, authorization checks and saving shared by the engine operations.
//!
//! Everything here runs inside the caller's DB transaction.

use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Expense, Group, ResultEngine, expense_splits, expenses, groups, members, users,
};

use super::Engine;

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {username} not exists")))
    }

    pub(super) async fn load_group(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Group> {
        let model = groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        let members = members::Entity::find()
            .filter(members::Column::GroupId.eq(group_id.to_string()))
            .all(db)
            .await?;
        Group::try_from((model, members))
    }

    /// Loads a group the user belongs to (creator or current member).
    pub(super) async fn require_group_member(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Group> {
        let group = self.load_group(db, group_id).await?;
        if !group.is_member(user_id) {
            return Err(EngineError::Forbidden(
                "not a member of the group".to_string(),
            ));
        }
        Ok(group)
    }

    pub(super) async fn require_group_owner(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Group> {
        let group = self.load_group(db, group_id).await?;
        if group.created_by != user_id {
            return Err(EngineError::Forbidden(
                "only the group creator can do this".to_string(),
            ));
        }
        Ok(group)
    }

    /// Loads groups with their members, keeping the order of `models`.
    pub(super) async fn hydrate_groups(
        &self,
        db: &DatabaseTransaction,
        models: Vec<groups::Model>,
    ) -> ResultEngine<Vec<Group>> {
        let ids: Vec<String> = models.iter().map(|g| g.id.clone()).collect();
        let mut members_by_group: HashMap<String, Vec<members::Model>> = HashMap::new();
        for member in members::Entity::find()
            .filter(members::Column::GroupId.is_in(ids))
            .all(db)
            .await?
        {
            members_by_group
                .entry(member.group_id.clone())
                .or_default()
                .push(member);
        }

        models
            .into_iter()
            .map(|model| {
                let members = members_by_group.remove(&model.id).unwrap_or_default();
                Group::try_from((model, members))
            })
            .collect()
    }

    pub(super) async fn load_expense(
        &self,
        db: &DatabaseTransaction,
        expense_id: Uuid,
    ) -> ResultEngine<Expense> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        let splits = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(model.id.clone()))
            .all(db)
            .await?;
        Expense::try_from((model, splits))
    }

    /// Every expense of the group with its splits, newest first.
    pub(super) async fn load_expenses_for_group(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_desc(expenses::Column::OccurredAt)
            .order_by_desc(expenses::Column::CreatedAt)
            .all(db)
            .await?;
        let ids: Vec<String> = models.iter().map(|e| e.id.clone()).collect();

        let mut splits_by_expense: HashMap<String, Vec<expense_splits::Model>> = HashMap::new();
        for split in expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.is_in(ids))
            .all(db)
            .await?
        {
            splits_by_expense
                .entry(split.expense_id.clone())
                .or_default()
                .push(split);
        }

        models
            .into_iter()
            .map(|model| {
                let splits = splits_by_expense.remove(&model.id).unwrap_or_default();
                Expense::try_from((model, splits))
            })
            .collect()
    }

    /// Writes the group row and replaces its member rows.
    pub(super) async fn save_group(&self, db: &DatabaseTransaction, group: &Group) -> ResultEngine<()> {
        let row: groups::ActiveModel = group.into();
        if groups::Entity::find_by_id(group.id.to_string())
            .one(db)
            .await?
            .is_some()
        {
            row.update(db).await?;
        } else {
            row.insert(db).await?;
        }

        members::Entity::delete_many()
            .filter(members::Column::GroupId.eq(group.id.to_string()))
            .exec(db)
            .await?;
        let rows: Vec<members::ActiveModel> = group
            .members
            .iter()
            .enumerate()
            .map(|(position, member)| members::ActiveModel::from_member(member, group.id, position))
            .collect();
        if !rows.is_empty() {
            members::Entity::insert_many(rows).exec(db).await?;
        }
        Ok(())
    }

    /// Writes the expense row and replaces its splits as a whole.
    pub(super) async fn save_expense(
        &self,
        db: &DatabaseTransaction,
        expense: &Expense,
    ) -> ResultEngine<()> {
        let row: expenses::ActiveModel = expense.into();
        if expenses::Entity::find_by_id(expense.id.to_string())
            .one(db)
            .await?
            .is_some()
        {
            row.update(db).await?;
        } else {
            row.insert(db).await?;
        }

        expense_splits::Entity::delete_many()
            .filter(expense_splits::Column::ExpenseId.eq(expense.id.to_string()))
            .exec(db)
            .await?;
        let rows: Vec<expense_splits::ActiveModel> = expense
            .splits
            .iter()
            .enumerate()
            .map(|(position, split)| {
                expense_splits::ActiveModel::from_split(split, expense.id, position)
            })
            .collect();
        if !rows.is_empty() {
            expense_splits::Entity::insert_many(rows).exec(db).await?;
        }
        Ok(())
    }
}
