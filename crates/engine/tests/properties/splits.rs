//! Split reconciliation: every accepted split adds up to the expense amount.

use proptest::prelude::*;

use engine::{
    EngineError, ExplicitSplit, MemberKey, MoneyCents, Percent, SplitPolicy, splits::compute,
};

fn keys(n: usize) -> Vec<MemberKey> {
    (0..n).map(|i| MemberKey::User(format!("user{i}"))).collect()
}

/// Percentages (in milli-percent) that add up to exactly 100%.
fn whole_percentages() -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::vec(0i64..=1_000, 1..=8)
        .prop_filter("at least one weight", |w| w.iter().any(|x| *x > 0))
        .prop_map(|weights| {
            let sum: i64 = weights.iter().sum();
            let mut percents: Vec<i64> = weights
                .iter()
                .map(|w| w * Percent::HUNDRED.milli() / sum)
                .collect();
            let rest = Percent::HUNDRED.milli() - percents.iter().sum::<i64>();
            if let Some(last) = percents.last_mut() {
                *last += rest;
            }
            percents
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: equal shares add up to the amount and are never negative.
    #[test]
    fn property_equal_split_reconciles(
        amount in 1i64..=10_000_000,
        n in 1usize..=20,
    ) {
        let splits = compute(MoneyCents::new(amount), SplitPolicy::Equal, &keys(n), &[]).unwrap();
        prop_assert_eq!(splits.len(), n);
        prop_assert_eq!(splits.iter().map(|s| s.owed.cents()).sum::<i64>(), amount);
        prop_assert!(splits.iter().all(|s| !s.owed.is_negative()));
        prop_assert_eq!(
            splits.iter().map(|s| s.percent.milli()).sum::<i64>(),
            Percent::HUNDRED.milli()
        );
    }

    /// PROPERTY: percentage shares add up to the amount.
    #[test]
    fn property_percentage_split_reconciles(
        amount in 1i64..=10_000_000,
        percents in whole_percentages(),
    ) {
        let participants = keys(percents.len());
        let explicit: Vec<_> = participants
            .iter()
            .zip(&percents)
            .map(|(key, p)| ExplicitSplit::percent(key.clone(), Percent::from_milli(*p)))
            .collect();

        let splits = compute(
            MoneyCents::new(amount),
            SplitPolicy::Percentage,
            &participants,
            &explicit,
        )
        .unwrap();
        prop_assert_eq!(splits.iter().map(|s| s.owed.cents()).sum::<i64>(), amount);
        prop_assert!(splits.iter().all(|s| !s.owed.is_negative()));
    }

    /// PROPERTY: custom shares within one cent are accepted and made exact;
    /// anything further off is rejected.
    #[test]
    fn property_custom_split_tolerance(
        shares in proptest::collection::vec(0i64..=100_000, 1..=8),
        delta in -3i64..=3,
    ) {
        let sum: i64 = shares.iter().sum();
        let amount = sum + delta;
        prop_assume!(amount > 0);

        let participants = keys(shares.len());
        let explicit: Vec<_> = participants
            .iter()
            .zip(&shares)
            .map(|(key, cents)| ExplicitSplit::amount(key.clone(), MoneyCents::new(*cents)))
            .collect();
        let result = compute(MoneyCents::new(amount), SplitPolicy::Custom, &participants, &explicit);

        if delta.abs() <= 1 {
            let splits = result.unwrap();
            prop_assert_eq!(splits.iter().map(|s| s.owed.cents()).sum::<i64>(), amount);
            prop_assert!(splits.iter().all(|s| !s.owed.is_negative()));
        } else {
            prop_assert!(matches!(result, Err(EngineError::Validation(_))));
        }
    }
}
