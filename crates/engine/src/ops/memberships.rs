use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{Member, ResultEngine};

use super::{Engine, with_tx};

/// Who to add to a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NewMember {
    /// An existing user, by username.
    Registered(String),
    /// A person without an account, by display name.
    Guest(String),
}

impl Engine {
    /// Adds a member to a group. Any current member may add people.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        new_member: NewMember,
        user_id: &str,
    ) -> ResultEngine<Member> {
        with_tx!(self, |db_tx| {
            let mut group = self
                .require_group_member(&db_tx, group_id, user_id)
                .await?;
            let member = match &new_member {
                NewMember::Registered(username) => {
                    let user = self.require_user(&db_tx, username.trim()).await?;
                    group
                        .add_registered(&user.username, &user.display_name)?
                        .clone()
                }
                NewMember::Guest(name) => group.add_guest(name)?.clone(),
            };
            self.save_group(&db_tx, &group).await?;
            tracing::debug!(%group_id, member_id = %member.id, kind = member.kind.as_str(), "member added");
            Ok(member)
        })
    }

    pub async fn add_registered_member(
        &self,
        group_id: Uuid,
        username: &str,
        user_id: &str,
    ) -> ResultEngine<Member> {
        self.add_member(group_id, NewMember::Registered(username.to_string()), user_id)
            .await
    }

    pub async fn add_guest_member(
        &self,
        group_id: Uuid,
        name: &str,
        user_id: &str,
    ) -> ResultEngine<Member> {
        self.add_member(group_id, NewMember::Guest(name.to_string()), user_id)
            .await
    }

    /// Removes a member. The creator can remove anybody else; members can
    /// remove themselves. Past expenses keep referring to the removed member.
    pub async fn remove_member(
        &self,
        group_id: Uuid,
        member_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Member> {
        with_tx!(self, |db_tx| {
            let mut group = self
                .require_group_member(&db_tx, group_id, user_id)
                .await?;
            let member = group.remove_member(member_id, user_id)?.clone();
            self.save_group(&db_tx, &group).await?;
            tracing::debug!(%group_id, %member_id, user_id, "member removed");
            Ok(member)
        })
    }
}
