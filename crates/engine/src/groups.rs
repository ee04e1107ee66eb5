//! The `Group` owns its members. The creator is always a registered member
//! and cannot be removed.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Member, MemberKey, MemberKind, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Current and removed members, in insertion order.
    pub members: Vec<Member>,
}

impl Group {
    pub fn new(name: &str, creator_id: &str, creator_name: &str) -> ResultEngine<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation(
                "group name must not be empty".to_string(),
            ));
        }
        let creator = Member::registered(creator_id, creator_name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_by: creator_id.trim().to_string(),
            created_at: Utc::now(),
            members: vec![creator],
        })
    }

    pub fn creator_key(&self) -> MemberKey {
        MemberKey::User(self.created_by.clone())
    }

    pub fn current_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| m.is_current())
    }

    /// Returns `true` if the user is the creator or a current registered
    /// member.
    pub fn is_member(&self, user_id: &str) -> bool {
        self.created_by == user_id
            || self
                .current_members()
                .any(|m| m.user_id.as_deref() == Some(user_id))
    }

    pub fn member(&self, member_id: Uuid) -> Option<&Member> {
        self.members.iter().find(|m| m.id == member_id)
    }

    /// Finds the member behind a key. Current members win over removed ones
    /// when a user left and joined again.
    pub fn member_by_key(&self, key: &MemberKey) -> Option<&Member> {
        self.current_members()
            .find(|m| &m.key() == key)
            .or_else(|| self.members.iter().find(|m| &m.key() == key))
    }

    pub fn current_member_by_key(&self, key: &MemberKey) -> Option<&Member> {
        self.current_members().find(|m| &m.key() == key)
    }

    /// Keys of every current member, creator included, without duplicates.
    pub fn participant_keys(&self) -> Vec<MemberKey> {
        let mut keys: Vec<MemberKey> = Vec::new();
        let creator = self.creator_key();
        if self.current_member_by_key(&creator).is_none() {
            keys.push(creator);
        }
        for key in self.current_members().map(Member::key) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Number of distinct identities currently in the group.
    pub fn member_count(&self) -> usize {
        self.participant_keys().len()
    }

    /// Adds a registered user. A user who left the group earlier gets their
    /// old member record back so their key and history stay attached.
    pub fn add_registered(&mut self, user_id: &str, display_name: &str) -> ResultEngine<&Member> {
        let key = MemberKey::User(user_id.trim().to_string());
        if self.current_member_by_key(&key).is_some() || self.created_by == user_id.trim() {
            return Err(EngineError::ExistingKey(format!("member {user_id}")));
        }
        if let Some(index) = self.members.iter().position(|m| m.key() == key) {
            let member = &mut self.members[index];
            member.removed_at = None;
            member.added_at = Utc::now();
            return Ok(&self.members[index]);
        }
        self.members.push(Member::registered(user_id, display_name)?);
        self.last_member()
    }

    /// Adds a guest. Guest names are unique among current guests, compared
    /// case-insensitively.
    pub fn add_guest(&mut self, display_name: &str) -> ResultEngine<&Member> {
        let member = Member::guest(display_name)?;
        if self
            .current_members()
            .any(|m| m.kind == MemberKind::Guest && m.same_name(&member.display_name))
        {
            return Err(EngineError::ExistingKey(format!(
                "member {}",
                member.display_name
            )));
        }
        self.members.push(member);
        self.last_member()
    }

    /// Marks a member as removed.
    ///
    /// The creator may remove anybody but themselves; a registered member may
    /// remove themselves.
    pub fn remove_member(&mut self, member_id: Uuid, caller: &str) -> ResultEngine<&Member> {
        let created_by = self.created_by.clone();
        let member = self
            .members
            .iter_mut()
            .find(|m| m.id == member_id && m.is_current())
            .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))?;

        if member.user_id.as_deref() == Some(created_by.as_str()) {
            return Err(EngineError::Forbidden(
                "cannot remove the group creator".to_string(),
            ));
        }
        let removing_self = member.user_id.as_deref() == Some(caller);
        if caller != created_by && !removing_self {
            return Err(EngineError::Forbidden(
                "only the group creator can remove other members".to_string(),
            ));
        }

        member.removed_at = Some(Utc::now());
        Ok(member)
    }

    fn last_member(&self) -> ResultEngine<&Member> {
        self.members
            .last()
            .ok_or_else(|| EngineError::Consistency("member list is empty".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::members::Entity")]
    Members,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(group: &Group) -> Self {
        Self {
            id: ActiveValue::Set(group.id.to_string()),
            name: ActiveValue::Set(group.name.clone()),
            created_by: ActiveValue::Set(group.created_by.clone()),
            created_at: ActiveValue::Set(group.created_at),
        }
    }
}

impl TryFrom<(Model, Vec<super::members::Model>)> for Group {
    type Error = EngineError;

    fn try_from((model, mut members): (Model, Vec<super::members::Model>)) -> ResultEngine<Self> {
        members.sort_by_key(|m| m.position);
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("group not exists".to_string()))?,
            name: model.name,
            created_by: model.created_by,
            created_at: model.created_at,
            members: members
                .into_iter()
                .map(Member::try_from)
                .collect::<ResultEngine<Vec<_>>>()?,
        })
    }
}
