// clearing-core: margin-trading clearinghouse engine.
// ledger-first architecture: balance integrity and liquidation take priority.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketIndex, AccountId, TokenAmount, Price, Tick
//   2.x  balance.rs: scaled balances, token conversion, deposit/borrow flips
//   3.x  interest.rs: utilization curve, cumulative index accrual
//   4.x  market.rs: spot market aggregates + perp market venues
//   5.x  account.rs: positions, orders, liquidation flags
//   6.x  margin.rs: weighted collateral/liability valuation
//   7.x  liquidation.rs: transfer clamping, insurance fund
//   7.1  bankruptcy.rs: social-loss index math
//   8.x  order.rs: order model, auction ramp, crossing predicate
//   8.1  signed_order.rs: signed messages, replay store, verifier seam
//   9.x  engine/: the clearinghouse: balances, liquidations, orders
//   10.x price_feed.rs: oracle feed with tick staleness
//   11.x events.rs: append-only state transition records

// core ledger modules
pub mod account;
pub mod balance;
pub mod bankruptcy;
pub mod engine;
pub mod events;
pub mod interest;
pub mod liquidation;
pub mod margin;
pub mod market;
pub mod types;

// order flow modules
pub mod order;
pub mod signed_order;

// integration modules
pub mod price_feed;

// re exports for convenience
pub use account::*;
pub use balance::*;
pub use bankruptcy::*;
pub use engine::*;
pub use events::*;
pub use interest::*;
pub use liquidation::*;
pub use margin::*;
pub use market::*;
pub use order::*;
pub use price_feed::*;
pub use signed_order::*;
pub use types::*;
