use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod group {
    use super::*;
    use crate::member::MemberView;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: Uuid,
        pub name: String,
        /// Username of the creator.
        pub created_by: String,
        pub created_at: DateTime<Utc>,
        /// Current and removed members, in the order they joined.
        pub members: Vec<MemberView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupsResponse {
        pub groups: Vec<GroupView>,
    }
}

pub mod member {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MemberKind {
        Registered,
        Guest,
    }

    /// Request body for adding a member.
    ///
    /// Exactly one of the fields must be set: `username` adds a registered
    /// user, `name` adds a guest.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MemberNew {
        pub username: Option<String>,
        pub name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub id: Uuid,
        /// `user:<username>` or `guest:<member id>`.
        pub member_key: String,
        pub user_id: Option<String>,
        pub display_name: String,
        pub kind: MemberKind,
        pub removed: bool,
    }
}

pub mod expense {
    use super::*;

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

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SplitPolicy {
        #[default]
        Equal,
        Percentage,
        Custom,
    }

    /// One caller-supplied share. `percentage` is used by the percentage
    /// policy, `amount_minor` by the custom one.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SplitInput {
        pub member_key: String,
        pub percentage: Option<f64>,
        pub amount_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub group_id: Uuid,
        pub description: String,
        /// Must be > 0.
        pub amount_minor: i64,
        pub category: Option<Category>,
        /// RFC3339 timestamp. If absent, server uses now().
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub split_policy: Option<SplitPolicy>,
        /// Member keys sharing the expense. Defaults to the keys in `splits`,
        /// or every current member.
        pub participants: Option<Vec<String>>,
        pub splits: Option<Vec<SplitInput>>,
    }

    /// Partial update. Changing the amount or any split field recomputes the
    /// splits.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub description: Option<String>,
        pub amount_minor: Option<i64>,
        pub category: Option<Category>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub split_policy: Option<SplitPolicy>,
        pub participants: Option<Vec<String>>,
        pub splits: Option<Vec<SplitInput>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitView {
        pub member_id: Uuid,
        pub member_key: String,
        pub user_id: Option<String>,
        pub display_name: String,
        pub amount_minor: i64,
        pub percentage: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub group_id: Uuid,
        pub description: String,
        pub amount_minor: i64,
        pub category: Category,
        pub occurred_at: DateTime<Utc>,
        /// Username of the payer.
        pub payer: String,
        pub split_policy: SplitPolicy,
        pub splits: Vec<SplitView>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpensesResponse {
        pub expenses: Vec<ExpenseView>,
    }
}

pub mod summary {
    use super::*;
    use crate::member::MemberKind;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SettlementState {
        Owes,
        Owed,
        Settled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementView {
        pub state: SettlementState,
        /// Never negative.
        pub amount_minor: i64,
        /// Human readable form, e.g. "Owes 12.50".
        pub label: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub member_key: String,
        pub display_name: String,
        pub kind: MemberKind,
        pub total_paid_minor: i64,
        pub total_owed_minor: i64,
        /// Positive: owes the group. Negative: is owed by the group.
        pub balance_minor: i64,
        pub settlement: SettlementView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryResponse {
        pub total_expenses_minor: i64,
        pub expense_count: u64,
        pub member_count: u64,
        pub balances: Vec<BalanceView>,
    }
}

#[cfg(test)]
mod tests {
    use super::expense::{Category, ExpenseNew, SplitPolicy};
    use super::member::MemberNew;

    #[test]
    fn expense_new_accepts_minimal_body() {
        let body = r#"{
            "group_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "description": "Dinner",
            "amount_minor": 4200
        }"#;
        let expense: ExpenseNew = serde_json::from_str(body).unwrap();
        assert_eq!(expense.amount_minor, 4200);
        assert!(expense.category.is_none());
        assert!(expense.splits.is_none());
    }

    #[test]
    fn enums_use_snake_case() {
        let body = r#"{
            "group_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "description": "Rent",
            "amount_minor": 100000,
            "category": "utilities",
            "split_policy": "percentage",
            "splits": [
                {"member_key": "user:alice", "percentage": 60.0},
                {"member_key": "user:bob", "percentage": 40.0}
            ]
        }"#;
        let expense: ExpenseNew = serde_json::from_str(body).unwrap();
        assert_eq!(expense.category, Some(Category::Utilities));
        assert_eq!(expense.split_policy, Some(SplitPolicy::Percentage));
        assert_eq!(expense.splits.map(|s| s.len()), Some(2));
        assert_eq!(
            serde_json::to_string(&SplitPolicy::Custom).unwrap(),
            "\"custom\""
        );
    }

    #[test]
    fn member_new_fields_are_optional() {
        let member: MemberNew = serde_json::from_str(r#"{"name": "Dave"}"#).unwrap();
        assert_eq!(member.name.as_deref(), Some("Dave"));
        assert!(member.username.is_none());
    }
}
