//! Command structs for engine operations.
//!
//! These types group parameters for expense writes (create/update), keeping
//! call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Category, ExplicitSplit, MemberKey, MoneyCents, SplitPolicy};

/// How an expense is divided among its participants.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitRequest {
    pub policy: SplitPolicy,
    /// Participants in order. `None` means "every current member", or the
    /// keys of `explicit` when those are given.
    pub participants: Option<Vec<MemberKey>>,
    pub explicit: Vec<ExplicitSplit>,
}

impl SplitRequest {
    #[must_use]
    pub fn equal() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn percentage(explicit: Vec<ExplicitSplit>) -> Self {
        Self {
            policy: SplitPolicy::Percentage,
            participants: None,
            explicit,
        }
    }

    #[must_use]
    pub fn custom(explicit: Vec<ExplicitSplit>) -> Self {
        Self {
            policy: SplitPolicy::Custom,
            participants: None,
            explicit,
        }
    }

    #[must_use]
    pub fn participants(mut self, participants: Vec<MemberKey>) -> Self {
        self.participants = Some(participants);
        self
    }

    /// Participant order: explicit list, then explicit split keys.
    pub(crate) fn requested_participants(&self) -> Option<Vec<MemberKey>> {
        match (&self.participants, self.explicit.is_empty()) {
            (Some(participants), _) => Some(participants.clone()),
            (None, false) => Some(self.explicit.iter().map(|s| s.key.clone()).collect()),
            (None, true) => None,
        }
    }
}

/// Create an expense paid by `user_id`.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub group_id: Uuid,
    pub user_id: String,
    pub description: String,
    pub amount: MoneyCents,
    pub category: Category,
    pub occurred_at: Option<DateTime<Utc>>,
    pub split: SplitRequest,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        user_id: impl Into<String>,
        description: impl Into<String>,
        amount: MoneyCents,
    ) -> Self {
        Self {
            group_id,
            user_id: user_id.into(),
            description: description.into(),
            amount,
            category: Category::default(),
            occurred_at: None,
            split: SplitRequest::equal(),
        }
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn split(mut self, split: SplitRequest) -> Self {
        self.split = split;
        self
    }
}

/// Patch an existing expense. Only the payer may apply it.
///
/// Any of `amount`, `policy`, `participants` or `explicit` triggers a split
/// recomputation; unset split fields keep their current values.
#[derive(Clone, Debug)]
pub struct UpdateExpenseCmd {
    pub expense_id: Uuid,
    pub user_id: String,

    pub description: Option<String>,
    pub category: Option<Category>,
    pub occurred_at: Option<DateTime<Utc>>,

    pub amount: Option<MoneyCents>,
    pub policy: Option<SplitPolicy>,
    pub participants: Option<Vec<MemberKey>>,
    pub explicit: Option<Vec<ExplicitSplit>>,
}

impl UpdateExpenseCmd {
    #[must_use]
    pub fn new(expense_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            expense_id,
            user_id: user_id.into(),
            description: None,
            category: None,
            occurred_at: None,
            amount: None,
            policy: None,
            participants: None,
            explicit: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: SplitPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn participants(mut self, participants: Vec<MemberKey>) -> Self {
        self.participants = Some(participants);
        self
    }

    #[must_use]
    pub fn explicit(mut self, explicit: Vec<ExplicitSplit>) -> Self {
        self.explicit = Some(explicit);
        self
    }

    pub(crate) fn changes_splits(&self) -> bool {
        self.amount.is_some()
            || self.policy.is_some()
            || self.participants.is_some()
            || self.explicit.is_some()
    }
}
