//! Balance engine for shared group expenses.
//!
//! The pure part turns expenses into splits ([`splits`]), folds them into
//! per-member balances ([`balances`]) and presents them ([`settlement`],
//! [`summary`]). [`Engine`] wraps it with sea-orm persistence and the
//! group, membership and expense lifecycles.

pub use balances::{BalanceRecord, UNKNOWN_MEMBER_NAME};
pub use commands::{ExpenseCmd, SplitRequest, UpdateExpenseCmd};
pub use error::EngineError;
pub use expense_splits::ExpenseSplit;
pub use expenses::{Category, Expense};
pub use groups::Group;
pub use members::{Member, MemberKey, MemberKind};
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder, NewMember};
pub use percent::Percent;
pub use settlement::{Settlement, SettlementState};
pub use splits::{
    CUSTOM_TOLERANCE, ComputedSplit, ExplicitSplit, MAX_AMOUNT, SplitPolicy, SplitValue,
};
pub use summary::{GroupSummary, MemberBalance};

pub mod balances;
mod commands;
mod error;
pub mod expense_splits;
pub mod expenses;
pub mod groups;
pub mod members;
mod money;
mod ops;
mod percent;
pub mod settlement;
pub mod splits;
pub mod summary;
pub mod users;

type ResultEngine<T> = Result<T, EngineError>;
