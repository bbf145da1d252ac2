//! Shared domain types: bond catalog rows, trade sides, pagination.
//! Use chrono date types for timestamps, never raw strings.

pub mod bond;
pub mod pagination;
pub mod transaction;

pub use bond::{Bond, RiskLevel};
pub use pagination::{PageParams, Pagination};
pub use transaction::{BondSnapshot, TradeSide, TransactionStatus};
