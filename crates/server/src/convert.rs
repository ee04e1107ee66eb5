//! Mapping between the wire types in `api_types` and the engine types.

use api_types::{expense, group, member, summary};
use engine::{
    Category, Expense, ExplicitSplit, Group, GroupSummary, Member, MemberBalance, MemberKey,
    MemberKind, MoneyCents, Percent, SettlementState, SplitPolicy,
};

use crate::ServerError;

pub(crate) fn category(value: expense::Category) -> Category {
    match value {
        expense::Category::Food => Category::Food,
        expense::Category::Transport => Category::Transport,
        expense::Category::Entertainment => Category::Entertainment,
        expense::Category::Utilities => Category::Utilities,
        expense::Category::Shopping => Category::Shopping,
        expense::Category::Healthcare => Category::Healthcare,
        expense::Category::Education => Category::Education,
        expense::Category::Other => Category::Other,
    }
}

fn category_view(value: Category) -> expense::Category {
    match value {
        Category::Food => expense::Category::Food,
        Category::Transport => expense::Category::Transport,
        Category::Entertainment => expense::Category::Entertainment,
        Category::Utilities => expense::Category::Utilities,
        Category::Shopping => expense::Category::Shopping,
        Category::Healthcare => expense::Category::Healthcare,
        Category::Education => expense::Category::Education,
        Category::Other => expense::Category::Other,
    }
}

pub(crate) fn split_policy(value: expense::SplitPolicy) -> SplitPolicy {
    match value {
        expense::SplitPolicy::Equal => SplitPolicy::Equal,
        expense::SplitPolicy::Percentage => SplitPolicy::Percentage,
        expense::SplitPolicy::Custom => SplitPolicy::Custom,
    }
}

fn split_policy_view(value: SplitPolicy) -> expense::SplitPolicy {
    match value {
        SplitPolicy::Equal => expense::SplitPolicy::Equal,
        SplitPolicy::Percentage => expense::SplitPolicy::Percentage,
        SplitPolicy::Custom => expense::SplitPolicy::Custom,
    }
}

fn member_kind_view(value: MemberKind) -> member::MemberKind {
    match value {
        MemberKind::Registered => member::MemberKind::Registered,
        MemberKind::Guest => member::MemberKind::Guest,
    }
}

pub(crate) fn member_keys(keys: &[String]) -> Result<Vec<MemberKey>, ServerError> {
    keys.iter()
        .map(|key| key.parse::<MemberKey>().map_err(ServerError::from))
        .collect()
}

/// A split carries a percentage or an amount; the engine checks it matches
/// the policy.
pub(crate) fn explicit_splits(
    splits: &[expense::SplitInput],
) -> Result<Vec<ExplicitSplit>, ServerError> {
    splits
        .iter()
        .map(|split| {
            let key = split.member_key.parse::<MemberKey>()?;
            match (split.percentage, split.amount_minor) {
                (Some(percentage), None) => {
                    Ok(ExplicitSplit::percent(key, Percent::from_f64(percentage)?))
                }
                (None, Some(amount)) => Ok(ExplicitSplit::amount(key, MoneyCents::new(amount))),
                _ => Err(ServerError::Generic(format!(
                    "split for {key} needs either percentage or amount_minor"
                ))),
            }
        })
        .collect()
}

pub(crate) fn member_view(member: &Member) -> member::MemberView {
    member::MemberView {
        id: member.id,
        member_key: member.key().to_string(),
        user_id: member.user_id.clone(),
        display_name: member.display_name.clone(),
        kind: member_kind_view(member.kind),
        removed: !member.is_current(),
    }
}

pub(crate) fn group_view(group: &Group) -> group::GroupView {
    group::GroupView {
        id: group.id,
        name: group.name.clone(),
        created_by: group.created_by.clone(),
        created_at: group.created_at,
        members: group.members.iter().map(member_view).collect(),
    }
}

pub(crate) fn expense_view(expense: &Expense) -> expense::ExpenseView {
    expense::ExpenseView {
        id: expense.id,
        group_id: expense.group_id,
        description: expense.description.clone(),
        amount_minor: expense.amount.cents(),
        category: category_view(expense.category),
        occurred_at: expense.occurred_at,
        payer: expense.payer_id.clone(),
        split_policy: split_policy_view(expense.policy),
        splits: expense
            .splits
            .iter()
            .map(|split| expense::SplitView {
                member_id: split.member_id,
                member_key: split.key().to_string(),
                user_id: split.user_id.clone(),
                display_name: split.display_name.clone(),
                amount_minor: split.owed.cents(),
                percentage: split.percent.as_f64(),
            })
            .collect(),
        created_at: expense.created_at,
        updated_at: expense.updated_at,
    }
}

fn balance_view(balance: &MemberBalance) -> summary::BalanceView {
    let record = &balance.record;
    summary::BalanceView {
        member_key: record.key.to_string(),
        display_name: record.display_name.clone(),
        kind: member_kind_view(record.kind),
        total_paid_minor: record.total_paid.cents(),
        total_owed_minor: record.total_owed.cents(),
        balance_minor: record.balance.cents(),
        settlement: summary::SettlementView {
            state: match balance.settlement.state {
                SettlementState::Owes => summary::SettlementState::Owes,
                SettlementState::Owed => summary::SettlementState::Owed,
                SettlementState::Settled => summary::SettlementState::Settled,
            },
            amount_minor: balance.settlement.amount.cents(),
            label: balance.settlement.to_string(),
        },
    }
}

pub(crate) fn summary_response(summary: &GroupSummary) -> summary::SummaryResponse {
    summary::SummaryResponse {
        total_expenses_minor: summary.total_expenses.cents(),
        expense_count: summary.expense_count as u64,
        member_count: summary.member_count as u64,
        balances: summary.balances.iter().map(balance_view).collect(),
    }
}
