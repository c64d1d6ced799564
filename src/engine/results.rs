// result types and errors for ledger operations.

use crate::account::AccountError;
use crate::balance::BalanceError;
use crate::market::MarketError;
use crate::price_feed::OracleError;
use crate::signed_order::SignedOrderStoreError;
use crate::types::{AccountId, MarketIndex, OrderId, Price, TokenAmount};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct LiquidationOutcome {
    pub liquidation_id: u16,
    pub asset_transfer: TokenAmount,
    pub liability_transfer: TokenAmount,
    pub if_fee: TokenAmount,
    pub asset_price: Price,
    pub liability_price: Price,
    pub victim_bankrupt: bool,
}

#[derive(Debug, Clone)]
pub struct BankruptcyOutcome {
    pub liquidation_id: u16,
    pub borrow_amount: TokenAmount,
    pub cumulative_deposit_interest_delta: Decimal,
}

/// Outcome of one atomic maker/taker settlement.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub taker_order_id: OrderId,
    pub maker_order_id: OrderId,
    pub fill_price: Price,
    pub base_filled: Decimal,
    /// Replay identity: sha256 of the taker's signature.
    pub hash: [u8; 32],
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    // precondition failures
    #[error("Account {0:?} margin is above the maintenance threshold")]
    NotLiquidatable(AccountId),

    #[error("Account {0:?} is not bankrupt")]
    NotBankrupt(AccountId),

    #[error("Withdrawal would leave account {0:?} below initial margin")]
    WithdrawalExceedsMargin(AccountId),

    // resource exhaustion
    #[error("Liquidator {0:?} cannot absorb any of the liability")]
    InsufficientLiquidatorCollateral(AccountId),

    #[error("Signed-order store for account {0:?} is full")]
    ReplayStoreFull(AccountId),

    #[error("Signed-order store for account {0:?} is not initialized")]
    ReplayStoreNotInitialized(AccountId),

    // invalid order params
    #[error("Auction params must be supplied together for signed market orders")]
    AuctionParamsRequired,

    #[error("Order type is not accepted by this settlement path")]
    UnsupportedOrderType,

    #[error("Maker price does not cross the taker's bound")]
    OrdersDoNotCross,

    // replay protection
    #[error("Signed order was already accepted for account {0:?}")]
    ReplayDetected(AccountId),

    #[error("Signature does not verify against the account authority")]
    SignatureInvalid,

    // lookups
    #[error("Order {0:?} not found")]
    OrderNotFound(OrderId),

    #[error("Account {account:?} holds no {side} position in market {market:?}")]
    PositionMissing {
        account: AccountId,
        market: MarketIndex,
        side: &'static str,
    },

    // wrapped module errors
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("Balance error: {0}")]
    Balance(#[from] BalanceError),

    #[error("Signed-order store error: {0}")]
    SignedOrderStore(#[from] SignedOrderStoreError),
}
