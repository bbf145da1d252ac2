pub mod ledger;
pub mod seed_data;
pub mod valuation;

pub use ledger::{LedgerError, TradeReceipt};
