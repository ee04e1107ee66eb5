use sea_orm::{QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Expense, ExpenseCmd, ResultEngine, UpdateExpenseCmd, expense_splits, expenses,
};

use super::{Engine, with_tx};

impl Engine {
    /// Records an expense paid by `cmd.user_id` and its splits.
    pub async fn create_expense(&self, cmd: ExpenseCmd) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let group = self
                .require_group_member(&db_tx, cmd.group_id, &cmd.user_id)
                .await?;
            let expense = Expense::create(&group, &cmd)?;
            self.save_expense(&db_tx, &expense).await?;
            tracing::debug!(
                expense_id = %expense.id,
                group_id = %group.id,
                amount = %expense.amount,
                policy = expense.policy.as_str(),
                "expense created"
            );
            Ok(expense)
        })
    }

    /// Returns an expense. Members of its group only.
    pub async fn expense(&self, expense_id: Uuid, user_id: &str) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let expense = self.load_expense(&db_tx, expense_id).await?;
            self.require_group_member(&db_tx, expense.group_id, user_id)
                .await?;
            Ok(expense)
        })
    }

    /// Expenses of a group, newest first.
    pub async fn list_expenses(&self, group_id: Uuid, user_id: &str) -> ResultEngine<Vec<Expense>> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id)
                .await?;
            self.load_expenses_for_group(&db_tx, group_id).await
        })
    }

    /// Patches an expense, recomputing its splits when the amount or the
    /// split settings change. Payer only.
    pub async fn update_expense(&self, cmd: UpdateExpenseCmd) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let mut expense = self.load_expense(&db_tx, cmd.expense_id).await?;
            let group = self.load_group(&db_tx, expense.group_id).await?;
            expense.apply_update(&group, &cmd)?;
            self.save_expense(&db_tx, &expense).await?;
            tracing::debug!(
                expense_id = %expense.id,
                amount = %expense.amount,
                policy = expense.policy.as_str(),
                "expense updated"
            );
            Ok(expense)
        })
    }

    /// Deletes an expense with all its splits. Payer only.
    pub async fn delete_expense(&self, expense_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = expenses::Entity::find_by_id(expense_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
            if model.payer_id != user_id {
                return Err(EngineError::Forbidden(
                    "only the payer can delete an expense".to_string(),
                ));
            }

            expense_splits::Entity::delete_many()
                .filter(expense_splits::Column::ExpenseId.eq(model.id.clone()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(model.id).exec(&db_tx).await?;

            tracing::debug!(%expense_id, user_id, "expense deleted");
            Ok(())
        })
    }
}
