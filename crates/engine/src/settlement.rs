//! Turns a balance into what a member reads on screen.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BalanceRecord, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    /// The member owes the group.
    Owes,
    /// The group owes the member.
    Owed,
    Settled,
}

impl SettlementState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owes => "owes",
            Self::Owed => "owed",
            Self::Settled => "settled",
        }
    }
}

/// Member-versus-group position. `amount` is never negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub state: SettlementState,
    pub amount: MoneyCents,
}

impl Settlement {
    pub fn from_balance(balance: MoneyCents) -> Self {
        let state = if balance.is_positive() {
            SettlementState::Owes
        } else if balance.is_negative() {
            SettlementState::Owed
        } else {
            SettlementState::Settled
        };
        Self {
            state,
            amount: balance.abs(),
        }
    }
}

pub fn present(record: &BalanceRecord) -> Settlement {
    Settlement::from_balance(record.balance)
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            SettlementState::Owes => write!(f, "Owes {}", self.amount),
            SettlementState::Owed => write!(f, "Gets back {}", self.amount),
            SettlementState::Settled => f.write_str("Settled up"),
        }
    }
}
