//! Expense splits.
//!
//! An [`ExpenseSplit`] is the share of one participant in an
//! [`Expense`](crate::Expense). It carries enough identity (member id, user
//! id, display name) to be aggregated even after the member left the group.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MemberKey, MoneyCents, Percent};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub member_id: Uuid,
    pub user_id: Option<String>,
    pub display_name: String,
    pub owed: MoneyCents,
    pub percent: Percent,
}

impl ExpenseSplit {
    pub fn key(&self) -> MemberKey {
        MemberKey::for_split(self.member_id, self.user_id.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "expense_splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub position: i32,
    pub member_id: String,
    pub user_id: Option<String>,
    pub display_name: String,
    pub amount_minor: i64,
    pub percent_milli: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_split(split: &ExpenseSplit, expense_id: Uuid, position: usize) -> Self {
        Self {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            expense_id: ActiveValue::Set(expense_id.to_string()),
            position: ActiveValue::Set(i32::try_from(position).unwrap_or(i32::MAX)),
            member_id: ActiveValue::Set(split.member_id.to_string()),
            user_id: ActiveValue::Set(split.user_id.clone()),
            display_name: ActiveValue::Set(split.display_name.clone()),
            amount_minor: ActiveValue::Set(split.owed.cents()),
            percent_milli: ActiveValue::Set(split.percent.milli()),
        }
    }
}

impl TryFrom<Model> for ExpenseSplit {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            member_id: Uuid::parse_str(&model.member_id).map_err(|_| {
                EngineError::Consistency(format!("invalid split member id: {}", model.member_id))
            })?,
            user_id: model.user_id,
            display_name: model.display_name,
            owed: MoneyCents::new(model.amount_minor),
            percent: Percent::from_milli(model.percent_milli),
        })
    }
}
