use sea_orm::{Condition, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Group, ResultEngine, expenses, groups, members};

use super::{Engine, with_tx};

impl Engine {
    /// Creates a group owned by `user_id`, who becomes its first member.
    pub async fn create_group(&self, name: &str, user_id: &str) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let group = Group::new(name, &user.username, &user.display_name)?;
            self.save_group(&db_tx, &group).await?;
            tracing::debug!(group_id = %group.id, user_id, "group created");
            Ok(group)
        })
    }

    /// Groups the user created or currently belongs to, newest first.
    pub async fn list_groups(&self, user_id: &str) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            let member_of: Vec<String> = members::Entity::find()
                .filter(members::Column::UserId.eq(user_id.to_string()))
                .filter(members::Column::RemovedAt.is_null())
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|m| m.group_id)
                .collect();

            let models = groups::Entity::find()
                .filter(
                    Condition::any()
                        .add(groups::Column::CreatedBy.eq(user_id.to_string()))
                        .add(groups::Column::Id.is_in(member_of)),
                )
                .order_by_desc(groups::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            self.hydrate_groups(&db_tx, models).await
        })
    }

    /// Returns a group with its members. Members only.
    pub async fn group(&self, group_id: Uuid, user_id: &str) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await
        })
    }

    /// Deletes a group together with its members, expenses and splits.
    /// Creator only.
    pub async fn delete_group(&self, group_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self
                .require_group_owner(&db_tx, group_id, user_id)
                .await?;
            let group_db_id = group.id.to_string();
            let backend = self.database.get_database_backend();

            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM expense_splits WHERE expense_id IN (SELECT id FROM expenses WHERE group_id = ?);",
                    vec![group_db_id.clone().into()],
                ))
                .await?;
            expenses::Entity::delete_many()
                .filter(expenses::Column::GroupId.eq(group_db_id.clone()))
                .exec(&db_tx)
                .await?;
            members::Entity::delete_many()
                .filter(members::Column::GroupId.eq(group_db_id.clone()))
                .exec(&db_tx)
                .await?;
            groups::Entity::delete_by_id(group_db_id).exec(&db_tx).await?;

            tracing::debug!(%group_id, user_id, "group deleted");
            Ok(())
        })
    }
}
