use serde::{Deserialize, Serialize};

use crate::{BalanceRecord, Expense, Group, MoneyCents, Settlement, balances, settlement};

/// A balance row together with how it reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    #[serde(flatten)]
    pub record: BalanceRecord,
    pub settlement: Settlement,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub total_expenses: MoneyCents,
    pub expense_count: usize,
    /// Distinct member keys among the creator and the current members.
    pub member_count: usize,
    pub balances: Vec<MemberBalance>,
}

/// Summarizes `expenses`, which must all belong to `group`.
pub fn summarize(group: &Group, expenses: &[Expense]) -> GroupSummary {
    let balances = balances::aggregate(group, expenses)
        .into_iter()
        .map(|record| MemberBalance {
            settlement: settlement::present(&record),
            record,
        })
        .collect();

    GroupSummary {
        total_expenses: expenses.iter().map(|e| e.amount).sum(),
        expense_count: expenses.len(),
        member_count: group.member_count(),
        balances,
    }
}
