//! Group members and the identity they aggregate money under.
//!
//! A member is either a registered user (linked by username) or a guest
//! known only inside one group. Both resolve to a [`MemberKey`]: the username
//! for registered members, the group-scoped member id for guests. The key is
//! what payers, splits and balances are matched on.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Registered,
    Guest,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Guest => "guest",
        }
    }
}

impl TryFrom<&str> for MemberKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "registered" => Ok(Self::Registered),
            "guest" => Ok(Self::Guest),
            other => Err(EngineError::Validation(format!(
                "invalid member kind: {other}"
            ))),
        }
    }
}

/// Canonical identity used to aggregate money across expenses.
///
/// Registered users and guests live in disjoint variants, so a username can
/// never collide with a guest id. The string form is `user:<username>` or
/// `guest:<member id>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MemberKey {
    User(String),
    Guest(Uuid),
}

impl MemberKey {
    /// Resolves the key of a split: the user id when the split carries one,
    /// the member id otherwise.
    pub fn for_split(member_id: Uuid, user_id: Option<&str>) -> Self {
        match user_id {
            Some(user_id) => Self::User(user_id.to_string()),
            None => Self::Guest(member_id),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User(user_id) => Some(user_id),
            Self::Guest(_) => None,
        }
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(user_id) => write!(f, "user:{user_id}"),
            Self::Guest(member_id) => write!(f, "guest:{member_id}"),
        }
    }
}

impl FromStr for MemberKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::Validation(format!("invalid member key: {s}"));
        match s.split_once(':') {
            Some(("user", user_id)) if !user_id.trim().is_empty() => {
                Ok(Self::User(user_id.to_string()))
            }
            Some(("guest", member_id)) => Uuid::parse_str(member_id)
                .map(Self::Guest)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl From<MemberKey> for String {
    fn from(value: MemberKey) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for MemberKey {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A participant of a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub display_name: String,
    pub kind: MemberKind,
    pub added_at: DateTime<Utc>,
    /// Set when the member left the group. Removed members stay around so
    /// historical splits keep resolving to them.
    pub removed_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn registered(user_id: &str, display_name: &str) -> ResultEngine<Self> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(EngineError::Validation(
                "user id must not be empty".to_string(),
            ));
        }
        let display_name = match display_name.trim() {
            "" => user_id,
            name => name,
        };
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: Some(user_id.to_string()),
            display_name: display_name.to_string(),
            kind: MemberKind::Registered,
            added_at: Utc::now(),
            removed_at: None,
        })
    }

    pub fn guest(display_name: &str) -> ResultEngine<Self> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(EngineError::Validation(
                "member name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: None,
            display_name: display_name.to_string(),
            kind: MemberKind::Guest,
            added_at: Utc::now(),
            removed_at: None,
        })
    }

    /// The key this member aggregates money under.
    pub fn key(&self) -> MemberKey {
        match (self.kind, self.user_id.as_deref()) {
            (MemberKind::Registered, Some(user_id)) => MemberKey::User(user_id.to_string()),
            _ => MemberKey::Guest(self.id),
        }
    }

    pub fn is_current(&self) -> bool {
        self.removed_at.is_none()
    }

    /// Returns `true` if both names are equal once normalized and lowercased.
    pub fn same_name(&self, other: &str) -> bool {
        fold_name(&self.display_name) == fold_name(other)
    }
}

fn fold_name(name: &str) -> String {
    name.trim().nfkc().collect::<String>().to_lowercase()
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "group_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub position: i32,
    pub user_id: Option<String>,
    pub display_name: String,
    pub kind: String,
    pub added_at: DateTimeUtc,
    pub removed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_member(member: &Member, group_id: Uuid, position: usize) -> Self {
        Self {
            id: ActiveValue::Set(member.id.to_string()),
            group_id: ActiveValue::Set(group_id.to_string()),
            position: ActiveValue::Set(i32::try_from(position).unwrap_or(i32::MAX)),
            user_id: ActiveValue::Set(member.user_id.clone()),
            display_name: ActiveValue::Set(member.display_name.clone()),
            kind: ActiveValue::Set(member.kind.as_str().to_string()),
            added_at: ActiveValue::Set(member.added_at),
            removed_at: ActiveValue::Set(member.removed_at),
        }
    }
}

impl TryFrom<Model> for Member {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind = MemberKind::try_from(model.kind.as_str())?;
        if kind == MemberKind::Registered && model.user_id.is_none() {
            return Err(EngineError::Consistency(format!(
                "registered member {} has no user id",
                model.id
            )));
        }
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::Consistency(format!("invalid member id: {}", model.id)))?,
            // Guests never carry a user link, whatever the row says.
            user_id: match kind {
                MemberKind::Registered => model.user_id,
                MemberKind::Guest => None,
            },
            display_name: model.display_name,
            kind,
            added_at: model.added_at,
            removed_at: model.removed_at,
        })
    }
}
