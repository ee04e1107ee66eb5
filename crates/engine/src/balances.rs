//! Balance aggregation.
//!
//! Folds the expense history of a group into one [`BalanceRecord`] per
//! member key. Pure and order independent: the same group and expenses
//! always produce the same records, whatever order the expenses come in.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{Expense, Group, MemberKey, MemberKind, MoneyCents};

/// Name given to a split whose identity cannot be resolved at all.
pub const UNKNOWN_MEMBER_NAME: &str = "Unknown member";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub key: MemberKey,
    pub display_name: String,
    pub kind: MemberKind,
    pub total_paid: MoneyCents,
    pub total_owed: MoneyCents,
    /// `total_owed - total_paid`. Positive means the member owes the group.
    pub balance: MoneyCents,
}

impl BalanceRecord {
    fn zeroed(key: MemberKey, display_name: String) -> Self {
        let kind = match key {
            MemberKey::User(_) => MemberKind::Registered,
            MemberKey::Guest(_) => MemberKind::Guest,
        };
        Self {
            key,
            display_name,
            kind,
            total_paid: MoneyCents::ZERO,
            total_owed: MoneyCents::ZERO,
            balance: MoneyCents::ZERO,
        }
    }
}

/// Aggregates `expenses` into per-member balances.
///
/// Records start with the creator and the current members of `group`, in
/// group order. Payers and split participants outside that set (removed
/// members, unknown keys) get a record on demand, appended sorted by key, so
/// no money is ever dropped and the balances always sum to zero.
pub fn aggregate(group: &Group, expenses: &[Expense]) -> Vec<BalanceRecord> {
    let mut known: Vec<BalanceRecord> = group
        .participant_keys()
        .into_iter()
        .map(|key| {
            let name = group
                .member_by_key(&key)
                .map(|m| m.display_name.clone())
                .or_else(|| key.user_id().map(ToString::to_string))
                .unwrap_or_else(|| UNKNOWN_MEMBER_NAME.to_string());
            BalanceRecord::zeroed(key, name)
        })
        .collect();
    let index: HashMap<MemberKey, usize> = known
        .iter()
        .enumerate()
        .map(|(i, record)| (record.key.clone(), i))
        .collect();
    let mut on_demand: BTreeMap<MemberKey, BalanceRecord> = BTreeMap::new();

    for expense in expenses {
        let payer = MemberKey::User(expense.payer_id.clone());
        record_for(&index, &mut known, &mut on_demand, &payer).total_paid += expense.amount;

        for split in &expense.splits {
            record_for(&index, &mut known, &mut on_demand, &split.key()).total_owed += split.owed;
        }
    }
    for record in on_demand.values_mut() {
        record.display_name = fallback_name(group, &record.key, expenses);
    }

    known
        .into_iter()
        .chain(on_demand.into_values())
        .map(|mut record| {
            record.balance = record.total_owed - record.total_paid;
            record
        })
        .collect()
}

fn record_for<'a>(
    index: &HashMap<MemberKey, usize>,
    known: &'a mut [BalanceRecord],
    on_demand: &'a mut BTreeMap<MemberKey, BalanceRecord>,
    key: &MemberKey,
) -> &'a mut BalanceRecord {
    if let Some(&i) = index.get(key) {
        return &mut known[i];
    }
    on_demand
        .entry(key.clone())
        .or_insert_with(|| BalanceRecord::zeroed(key.clone(), String::new()))
}

/// Best available display name for a key outside the current member set:
/// the (removed) member record, then the name stored on the split of the
/// newest expense naming the key, then the username.
fn fallback_name(group: &Group, key: &MemberKey, expenses: &[Expense]) -> String {
    let name = group
        .member_by_key(key)
        .map(|m| m.display_name.clone())
        .filter(|name| !name.trim().is_empty())
        .or_else(|| {
            expenses
                .iter()
                .filter_map(|expense| {
                    expense
                        .splits
                        .iter()
                        .find(|s| &s.key() == key && !s.display_name.trim().is_empty())
                        .map(|s| ((expense.created_at, expense.id), &s.display_name))
                })
                .max_by(|a, b| a.0.cmp(&b.0))
                .map(|(_, name)| name.clone())
        })
        .or_else(|| key.user_id().map(ToString::to_string));

    match name {
        Some(name) => name,
        None => {
            tracing::warn!(group_id = %group.id, %key, "split references an unresolvable member");
            UNKNOWN_MEMBER_NAME.to_string()
        }
    }
}

/// Sum of every balance. Zero for any output of [`aggregate`].
pub fn net_total(records: &[BalanceRecord]) -> MoneyCents {
    records.iter().map(|r| r.balance).sum()
}
