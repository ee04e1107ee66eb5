//! Balance conservation, idempotence and order independence.

use proptest::prelude::*;
use uuid::Uuid;

use engine::{
    Expense, ExpenseCmd, ExpenseSplit, ExplicitSplit, Group, MemberKey, MoneyCents, Percent,
    SplitPolicy, SplitRequest, balances::aggregate,
};

#[derive(Clone, Debug)]
struct ExpenseShape {
    payer_is_creator: bool,
    amount: i64,
    /// Bit mask over the three members; never zero.
    participants: u8,
    policy: SplitPolicy,
    /// Relative share per member, used by percentage and custom splits.
    weights: [i64; 3],
    /// Custom split slack, within the one cent tolerance.
    slack: i64,
    /// Extra share owed by a key outside the group, optionally named.
    stranger: Option<(i64, bool)>,
}

fn expense_shape() -> impl Strategy<Value = ExpenseShape> {
    (
        any::<bool>(),
        1i64..=100_000_000,
        1u8..8,
        prop_oneof![
            Just(SplitPolicy::Equal),
            Just(SplitPolicy::Percentage),
            Just(SplitPolicy::Custom),
        ],
        [0i64..=1_000, 0i64..=1_000, 0i64..=1_000],
        -1i64..=1,
        proptest::option::of((1i64..=10_000, any::<bool>())),
    )
        .prop_map(
            |(payer_is_creator, amount, participants, policy, weights, slack, stranger)| {
                ExpenseShape {
                    payer_is_creator,
                    amount,
                    participants,
                    policy,
                    weights,
                    slack,
                    stranger,
                }
            },
        )
}

/// Splits `total` proportionally to `weights`, the remainder going last.
fn proportional(total: i64, weights: &[i64]) -> Vec<i64> {
    let sum: i64 = weights.iter().sum();
    let mut parts: Vec<i64> = if sum == 0 {
        let n = i64::try_from(weights.len()).unwrap();
        vec![total / n; weights.len()]
    } else {
        weights.iter().map(|w| total * w / sum).collect()
    };
    let rest = total - parts.iter().sum::<i64>();
    if let Some(last) = parts.last_mut() {
        *last += rest;
    }
    parts
}

fn split_request(
    shape: &ExpenseShape,
    participants: Vec<MemberKey>,
    weights: &[i64],
) -> SplitRequest {
    match shape.policy {
        SplitPolicy::Equal => SplitRequest::equal().participants(participants),
        SplitPolicy::Percentage => {
            let percents = proportional(Percent::HUNDRED.milli(), weights);
            SplitRequest::percentage(
                participants
                    .into_iter()
                    .zip(percents)
                    .map(|(key, p)| ExplicitSplit::percent(key, Percent::from_milli(p)))
                    .collect(),
            )
        }
        SplitPolicy::Custom => {
            let mut shares = proportional(shape.amount, weights);
            if let Some(last) = shares.last_mut() {
                if *last + shape.slack >= 0 {
                    *last += shape.slack;
                }
            }
            SplitRequest::custom(
                participants
                    .into_iter()
                    .zip(shares)
                    .map(|(key, cents)| ExplicitSplit::amount(key, MoneyCents::new(cents)))
                    .collect(),
            )
        }
    }
}

fn build(shapes: &[ExpenseShape], remove_bob: bool) -> (Group, Vec<Expense>) {
    let mut group = Group::new("Trip", "alice", "Alice").unwrap();
    group.add_registered("bob", "Bob").unwrap();
    group.add_guest("Carol").unwrap();
    let keys = group.participant_keys();

    let expenses = shapes
        .iter()
        .map(|shape| {
            let payer = if shape.payer_is_creator { "alice" } else { "bob" };
            let (participants, weights): (Vec<MemberKey>, Vec<i64>) = keys
                .iter()
                .zip(shape.weights)
                .enumerate()
                .filter(|(i, _)| shape.participants & (1 << *i) != 0)
                .map(|(_, (key, weight))| (key.clone(), weight))
                .unzip();
            let cmd = ExpenseCmd::new(group.id, payer, "Item", MoneyCents::new(shape.amount))
                .split(split_request(shape, participants, &weights));
            let mut expense = Expense::create(&group, &cmd).unwrap();

            if let Some((extra, named)) = shape.stranger {
                expense.splits.push(ExpenseSplit {
                    member_id: Uuid::new_v4(),
                    user_id: None,
                    display_name: if named { "Ghost".to_string() } else { String::new() },
                    owed: MoneyCents::new(extra),
                    percent: Percent::ZERO,
                });
                expense.amount += MoneyCents::new(extra);
            }
            expense
        })
        .collect();

    if remove_bob {
        let bob = group.members[1].id;
        group.remove_member(bob, "alice").unwrap();
    }
    (group, expenses)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: balances always sum to zero, even after a member leaves.
    #[test]
    fn property_balances_are_conserved(
        shapes in proptest::collection::vec(expense_shape(), 0..=12),
        remove_bob in any::<bool>(),
    ) {
        let (group, expenses) = build(&shapes, remove_bob);
        let records = aggregate(&group, &expenses);
        let total: MoneyCents = records.iter().map(|r| r.balance).sum();
        prop_assert_eq!(total, MoneyCents::ZERO);

        let paid: MoneyCents = records.iter().map(|r| r.total_paid).sum();
        let spent: MoneyCents = expenses.iter().map(|e| e.amount).sum();
        prop_assert_eq!(paid, spent);
    }

    /// PROPERTY: aggregating twice gives the same records.
    #[test]
    fn property_aggregation_is_idempotent(
        shapes in proptest::collection::vec(expense_shape(), 0..=12),
        remove_bob in any::<bool>(),
    ) {
        let (group, expenses) = build(&shapes, remove_bob);
        prop_assert_eq!(aggregate(&group, &expenses), aggregate(&group, &expenses));
    }

    /// PROPERTY: expense order does not change the result.
    #[test]
    fn property_aggregation_ignores_expense_order(
        shapes in proptest::collection::vec(expense_shape(), 0..=12),
        remove_bob in any::<bool>(),
    ) {
        let (group, expenses) = build(&shapes, remove_bob);
        let mut reversed = expenses.clone();
        reversed.reverse();
        prop_assert_eq!(aggregate(&group, &expenses), aggregate(&group, &reversed));
    }
}
