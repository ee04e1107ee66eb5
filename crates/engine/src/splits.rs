//! Split calculator.
//!
//! Turns an expense amount, a [`SplitPolicy`] and an ordered list of
//! participants into per-participant owed amounts whose sum is exactly the
//! expense amount. Pure: no I/O, no clock.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{EngineError, MemberKey, MoneyCents, Percent, ResultEngine};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    #[default]
    Equal,
    Percentage,
    Custom,
}

impl SplitPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Percentage => "percentage",
            Self::Custom => "custom",
        }
    }
}

impl TryFrom<&str> for SplitPolicy {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "equal" => Ok(Self::Equal),
            "percentage" => Ok(Self::Percentage),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::Validation(format!(
                "invalid split policy: {other}"
            ))),
        }
    }
}

/// Caller-supplied share for one participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitValue {
    Percent(Percent),
    Amount(MoneyCents),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitSplit {
    pub key: MemberKey,
    pub value: SplitValue,
}

impl ExplicitSplit {
    pub fn percent(key: MemberKey, percent: Percent) -> Self {
        Self {
            key,
            value: SplitValue::Percent(percent),
        }
    }

    pub fn amount(key: MemberKey, amount: MoneyCents) -> Self {
        Self {
            key,
            value: SplitValue::Amount(amount),
        }
    }
}

/// One computed share.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedSplit {
    pub key: MemberKey,
    pub owed: MoneyCents,
    pub percent: Percent,
}

/// Maximum distance between the custom shares and the total (one cent).
pub const CUSTOM_TOLERANCE: MoneyCents = MoneyCents::new(1);

/// Largest accepted expense amount (one billion in major units). Keeps paid,
/// owed and group totals well inside `i64` for any realistic history.
pub const MAX_AMOUNT: MoneyCents = MoneyCents::new(1_000_000_000_00);

/// Computes the splits of `amount` among `participants`.
///
/// `explicit` is required for [`SplitPolicy::Percentage`] and
/// [`SplitPolicy::Custom`] and must carry exactly one entry per participant;
/// it is ignored for [`SplitPolicy::Equal`].
///
/// The result covers the participants in their given order and always sums
/// to `amount`.
pub fn compute(
    amount: MoneyCents,
    policy: SplitPolicy,
    participants: &[MemberKey],
    explicit: &[ExplicitSplit],
) -> ResultEngine<Vec<ComputedSplit>> {
    if !amount.is_positive() {
        return Err(EngineError::Validation(
            "amount must be > 0".to_string(),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(EngineError::Validation(format!(
            "amount must be <= {MAX_AMOUNT}, got {amount}"
        )));
    }
    if participants.is_empty() {
        return Err(EngineError::Validation(
            "an expense needs at least one participant".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(participants.len());
    if let Some(dup) = participants.iter().find(|key| !seen.insert(*key)) {
        return Err(EngineError::Validation(format!(
            "participant {dup} listed twice"
        )));
    }

    let (owed, percents) = match policy {
        SplitPolicy::Equal => equal(amount, participants.len())?,
        SplitPolicy::Percentage => percentage(amount, &explicit_values(participants, explicit)?)?,
        SplitPolicy::Custom => custom(amount, &explicit_values(participants, explicit)?)?,
    };

    Ok(participants
        .iter()
        .zip(owed.into_iter().zip(percents))
        .map(|(key, (owed, percent))| ComputedSplit {
            key: key.clone(),
            owed: MoneyCents::new(owed),
            percent: Percent::from_milli(percent),
        })
        .collect())
}

/// Orders the explicit values like `participants`, rejecting missing,
/// duplicated and unknown keys.
fn explicit_values(
    participants: &[MemberKey],
    explicit: &[ExplicitSplit],
) -> ResultEngine<Vec<SplitValue>> {
    if let Some(extra) = explicit.iter().find(|s| !participants.contains(&s.key)) {
        return Err(EngineError::Validation(format!(
            "split for {} who is not a participant",
            extra.key
        )));
    }
    participants
        .iter()
        .map(|key| {
            let mut matching = explicit.iter().filter(|s| &s.key == key);
            let split = matching.next().ok_or_else(|| {
                EngineError::Validation(format!("missing split for participant {key}"))
            })?;
            if matching.next().is_some() {
                return Err(EngineError::Validation(format!(
                    "more than one split for participant {key}"
                )));
            }
            Ok(split.value)
        })
        .collect()
}

fn equal(amount: MoneyCents, count: usize) -> ResultEngine<(Vec<i64>, Vec<i64>)> {
    let n = i64::try_from(count)
        .map_err(|_| EngineError::Validation("too many participants".to_string()))?;
    let share = amount
        .mul_div_round(1, n)
        .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;
    let mut owed = vec![share.cents(); count];
    reconcile(&mut owed, amount.cents());

    let mut percents = vec![round_div(Percent::HUNDRED.milli(), n); count];
    reconcile(&mut percents, Percent::HUNDRED.milli());

    Ok((owed, percents))
}

fn percentage(amount: MoneyCents, values: &[SplitValue]) -> ResultEngine<(Vec<i64>, Vec<i64>)> {
    let percents = values
        .iter()
        .map(|value| match value {
            SplitValue::Percent(p)
                if *p < Percent::ZERO || *p > Percent::HUNDRED + Percent::EPSILON =>
            {
                Err(EngineError::Validation(format!(
                    "percentage out of range: {p}"
                )))
            }
            SplitValue::Percent(p) => Ok(*p),
            SplitValue::Amount(_) => Err(EngineError::Validation(
                "percentage split needs a percentage for every participant".to_string(),
            )),
        })
        .collect::<ResultEngine<Vec<Percent>>>()?;

    let total: Percent = percents.iter().copied().sum();
    if !total.is_whole() {
        return Err(EngineError::Validation(format!(
            "percentages must add up to 100%, got {total}"
        )));
    }

    let mut owed = percents
        .iter()
        .map(|p| {
            amount
                .mul_div_round(p.milli(), Percent::HUNDRED.milli())
                .map(MoneyCents::cents)
                .ok_or_else(|| EngineError::Validation("amount too large".to_string()))
        })
        .collect::<ResultEngine<Vec<i64>>>()?;
    reconcile(&mut owed, amount.cents());

    Ok((owed, percents.into_iter().map(Percent::milli).collect()))
}

fn custom(amount: MoneyCents, values: &[SplitValue]) -> ResultEngine<(Vec<i64>, Vec<i64>)> {
    let mut owed = values
        .iter()
        .map(|value| match value {
            SplitValue::Amount(a) if a.is_negative() => Err(EngineError::Validation(format!(
                "custom split amount must not be negative, got {a}"
            ))),
            SplitValue::Amount(a) => Ok(a.cents()),
            SplitValue::Percent(_) => Err(EngineError::Validation(
                "custom split needs an amount for every participant".to_string(),
            )),
        })
        .collect::<ResultEngine<Vec<i64>>>()?;

    let total = owed
        .iter()
        .try_fold(MoneyCents::ZERO, |acc, cents| {
            acc.checked_add(MoneyCents::new(*cents))
        })
        .ok_or_else(|| {
            EngineError::Validation("custom split amounts are too large".to_string())
        })?;
    if (total - amount).abs() > CUSTOM_TOLERANCE {
        return Err(EngineError::Validation(format!(
            "custom splits add up to {total}, expected {amount}"
        )));
    }
    // Within tolerance: absorb the leftover cent so the total is exact.
    reconcile(&mut owed, amount.cents());

    let mut percents = owed
        .iter()
        .map(|cents| {
            MoneyCents::new(*cents)
                .mul_div_round(Percent::HUNDRED.milli(), amount.cents())
                .map_or(0, MoneyCents::cents)
        })
        .collect::<Vec<i64>>();
    reconcile(&mut percents, Percent::HUNDRED.milli());

    Ok((owed, percents))
}

/// Integer division rounded half away from zero (`denominator > 0`).
fn round_div(numerator: i64, denominator: i64) -> i64 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

/// Makes `shares` add up to `total`.
///
/// The residual goes to the first share that can take it without turning
/// negative. When no single share can (tiny totals spread over many
/// participants) it is handed out one unit at a time in order.
fn reconcile(shares: &mut [i64], total: i64) {
    let mut residual = total - shares.iter().sum::<i64>();
    if residual == 0 {
        return;
    }
    if let Some(share) = shares.iter_mut().find(|s| **s + residual >= 0) {
        *share += residual;
        return;
    }
    let step = residual.signum();
    while residual != 0 {
        let before = residual;
        for share in shares.iter_mut() {
            if residual == 0 {
                break;
            }
            if *share + step >= 0 {
                *share += step;
                residual -= step;
            }
        }
        if residual == before {
            break;
        }
    }
}
