// the clearinghouse ledger: coordinates balance transfers, interest accrual,
// liquidations, bankruptcy resolution, and signed-order settlement. all
// mutating operations are single atomic steps: check, compute, then commit.

mod balances;
mod config;
mod core;
mod liquidations;
mod orders;
mod results;

pub use config::EngineConfig;
pub use core::Clearinghouse;
pub use results::{BankruptcyOutcome, LedgerError, LiquidationOutcome, SettlementOutcome};
