use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{GroupSummary, ResultEngine, summary};

use super::{Engine, with_tx};

impl Engine {
    /// Balances of every member of a group. Read-only; members only.
    pub async fn group_summary(&self, group_id: Uuid, user_id: &str) -> ResultEngine<GroupSummary> {
        with_tx!(self, |db_tx| {
            let group = self
                .require_group_member(&db_tx, group_id, user_id)
                .await?;
            let expenses = self.load_expenses_for_group(&db_tx, group.id).await?;
            Ok(summary::summarize(&group, &expenses))
        })
    }
}
