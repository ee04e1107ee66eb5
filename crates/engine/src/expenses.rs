//! Expenses.
//!
//! An `Expense` is one spending event inside a group, fronted by a registered
//! user and shared among participants through its [`ExpenseSplit`]s. Splits
//! are always produced by [`splits::compute`](crate::splits::compute), never
//! taken verbatim from callers.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseCmd, ExpenseSplit, ExplicitSplit, Group, MemberKey, MoneyCents,
    ResultEngine, SplitPolicy, UpdateExpenseCmd, splits,
};

use super::expense_splits;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Food,
    Transport,
    Entertainment,
    Utilities,
    Shopping,
    Healthcare,
    Education,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::Food,
        Self::Transport,
        Self::Entertainment,
        Self::Utilities,
        Self::Shopping,
        Self::Healthcare,
        Self::Education,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Transport => "transport",
            Self::Entertainment => "entertainment",
            Self::Utilities => "utilities",
            Self::Shopping => "shopping",
            Self::Healthcare => "healthcare",
            Self::Education => "education",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for Category {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| EngineError::Validation(format!("invalid category: {value}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Uuid,
    pub description: String,
    pub amount: MoneyCents,
    pub category: Category,
    pub occurred_at: DateTime<Utc>,
    /// Username of the registered user who paid.
    pub payer_id: String,
    pub policy: SplitPolicy,
    pub splits: Vec<ExpenseSplit>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Builds a new expense paid by `cmd.user_id`, with splits computed from
    /// `cmd.split`.
    ///
    /// Participants must be current members of `group`; when none are given
    /// every current member participates.
    pub fn create(group: &Group, cmd: &ExpenseCmd) -> ResultEngine<Self> {
        if cmd.group_id != group.id {
            return Err(EngineError::Consistency(
                "expense command targets another group".to_string(),
            ));
        }
        if !group.is_member(&cmd.user_id) {
            return Err(EngineError::Forbidden(
                "payer is not a member of the group".to_string(),
            ));
        }
        let description = normalize_description(&cmd.description)?;

        let participants = cmd
            .split
            .requested_participants()
            .unwrap_or_else(|| group.participant_keys());
        let splits = build_splits(
            group,
            &[],
            cmd.amount,
            cmd.split.policy,
            &participants,
            &cmd.split.explicit,
            false,
        )?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            group_id: group.id,
            description,
            amount: cmd.amount,
            category: cmd.category,
            occurred_at: cmd.occurred_at.unwrap_or(now),
            payer_id: cmd.user_id.clone(),
            policy: cmd.split.policy,
            splits,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a patch. Either every field changes or none does.
    pub fn apply_update(&mut self, group: &Group, cmd: &UpdateExpenseCmd) -> ResultEngine<()> {
        if cmd.user_id != self.payer_id {
            return Err(EngineError::Forbidden(
                "only the payer can change an expense".to_string(),
            ));
        }
        let description = cmd
            .description
            .as_deref()
            .map(normalize_description)
            .transpose()?;

        if cmd.changes_splits() {
            self.recompute_splits(
                group,
                cmd.amount,
                cmd.policy,
                cmd.participants.clone(),
                cmd.explicit.clone(),
            )?;
        }

        if let Some(description) = description {
            self.description = description;
        }
        if let Some(category) = cmd.category {
            self.category = category;
        }
        if let Some(occurred_at) = cmd.occurred_at {
            self.occurred_at = occurred_at;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Recomputes the splits after a change of amount, policy, participants
    /// or explicit shares.
    ///
    /// Missing arguments default to the current state: the current
    /// participants, and the current percentages (percentage policy) or
    /// amounts (custom policy) as explicit shares. Participants may be
    /// current or removed members of `group`, or keys already present on the
    /// expense. On error the expense is left untouched.
    pub fn recompute_splits(
        &mut self,
        group: &Group,
        amount: Option<MoneyCents>,
        policy: Option<SplitPolicy>,
        participants: Option<Vec<MemberKey>>,
        explicit: Option<Vec<ExplicitSplit>>,
    ) -> ResultEngine<()> {
        let amount = amount.unwrap_or(self.amount);
        let policy = policy.unwrap_or(self.policy);
        let participants = match (participants, &explicit) {
            (Some(participants), _) => participants,
            (None, Some(explicit)) if !explicit.is_empty() => {
                explicit.iter().map(|s| s.key.clone()).collect()
            }
            _ => self.splits.iter().map(ExpenseSplit::key).collect(),
        };
        let explicit = explicit.unwrap_or_else(|| self.current_explicit(policy));

        let splits = build_splits(
            group,
            &self.splits,
            amount,
            policy,
            &participants,
            &explicit,
            true,
        )?;

        self.amount = amount;
        self.policy = policy;
        self.splits = splits;
        Ok(())
    }

    /// Sum of the owed amounts. Equals `amount` for every expense built by
    /// the engine.
    pub fn owed_total(&self) -> MoneyCents {
        self.splits.iter().map(|s| s.owed).sum()
    }

    fn current_explicit(&self, policy: SplitPolicy) -> Vec<ExplicitSplit> {
        self.splits
            .iter()
            .filter_map(|s| match policy {
                SplitPolicy::Equal => None,
                SplitPolicy::Percentage => Some(ExplicitSplit::percent(s.key(), s.percent)),
                SplitPolicy::Custom => Some(ExplicitSplit::amount(s.key(), s.owed)),
            })
            .collect()
    }
}

fn normalize_description(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Computes the splits and attaches each share to the identity behind its
/// key.
fn build_splits(
    group: &Group,
    previous: &[ExpenseSplit],
    amount: MoneyCents,
    policy: SplitPolicy,
    participants: &[MemberKey],
    explicit: &[ExplicitSplit],
    allow_historical: bool,
) -> ResultEngine<Vec<ExpenseSplit>> {
    // Resolve first so unknown participants are reported before share errors.
    let identities = participants
        .iter()
        .map(|key| resolve_identity(group, previous, key, allow_historical))
        .collect::<ResultEngine<Vec<_>>>()?;

    let computed = splits::compute(amount, policy, participants, explicit)?;

    Ok(computed
        .into_iter()
        .zip(identities)
        .map(|(split, (member_id, user_id, display_name))| ExpenseSplit {
            member_id,
            user_id,
            display_name,
            owed: split.owed,
            percent: split.percent,
        })
        .collect())
}

fn resolve_identity(
    group: &Group,
    previous: &[ExpenseSplit],
    key: &MemberKey,
    allow_historical: bool,
) -> ResultEngine<(Uuid, Option<String>, String)> {
    let member = if allow_historical {
        group.member_by_key(key)
    } else {
        group.current_member_by_key(key)
    };
    if let Some(member) = member {
        return Ok((member.id, member.user_id.clone(), member.display_name.clone()));
    }
    if let Some(split) = previous.iter().find(|s| &s.key() == key) {
        return Ok((split.member_id, split.user_id.clone(), split.display_name.clone()));
    }
    // The creator always belongs to the group, even without a member row.
    if *key == group.creator_key() {
        return Ok((Uuid::new_v4(), Some(group.created_by.clone()), group.created_by.clone()));
    }
    Err(EngineError::Validation(format!(
        "participant {key} is not a member of the group"
    )))
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub category: String,
    pub occurred_at: DateTimeUtc,
    pub payer_id: String,
    pub split_policy: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense_splits::Entity")]
    Splits,
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::expense_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Splits.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            category: ActiveValue::Set(expense.category.as_str().to_string()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            payer_id: ActiveValue::Set(expense.payer_id.clone()),
            split_policy: ActiveValue::Set(expense.policy.as_str().to_string()),
            created_at: ActiveValue::Set(expense.created_at),
            updated_at: ActiveValue::Set(expense.updated_at),
        }
    }
}

impl TryFrom<(Model, Vec<expense_splits::Model>)> for Expense {
    type Error = EngineError;

    fn try_from((model, mut splits): (Model, Vec<expense_splits::Model>)) -> ResultEngine<Self> {
        splits.sort_by_key(|s| s.position);
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("expense not exists".to_string()))?,
            group_id: Uuid::parse_str(&model.group_id)
                .map_err(|_| EngineError::Consistency(format!("invalid group id: {}", model.group_id)))?,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            category: Category::try_from(model.category.as_str())?,
            occurred_at: model.occurred_at,
            payer_id: model.payer_id,
            policy: SplitPolicy::try_from(model.split_policy.as_str())?,
            splits: splits
                .into_iter()
                .map(ExpenseSplit::try_from)
                .collect::<ResultEngine<Vec<_>>>()?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
