// every state change produces an event. used for audit trails, state
// reconstruction, and notifying external subscribers. records are append-only
// and immutable once emitted; the EventPayload enum lists all record types.

use crate::types::{
    AccountId, MarketIndex, OrderId, PositionDirection, Price, Tick, Timestamp, TokenAmount,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub tick: Tick,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, tick: Tick, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            tick,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // balance events
    Deposit(DepositRecord),
    Withdrawal(WithdrawalRecord),

    // risk events
    Liquidation(LiquidationRecord),

    // order events
    OrderPlaced(OrderRecord),
    OrderCanceled(OrderCancelRecord),
    Fill(FillRecord),
    SignedOrder(SignedOrderRecord),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRecord {
    pub account_id: AccountId,
    pub market_index: MarketIndex,
    pub amount: TokenAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub account_id: AccountId,
    pub market_index: MarketIndex,
    pub amount: TokenAmount,
}

/// One liquidation-family action against an account. The variant carries the
/// action-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationRecord {
    pub account_id: AccountId,
    pub liquidator_id: AccountId,
    pub liquidation_id: u16,
    pub liquidation_type: LiquidationType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LiquidationType {
    LiquidateSpot {
        asset_market_index: MarketIndex,
        asset_price: Price,
        asset_transfer: TokenAmount,
        liability_market_index: MarketIndex,
        liability_price: Price,
        liability_transfer: TokenAmount,
        if_fee: TokenAmount,
    },
    SpotBankruptcy {
        market_index: MarketIndex,
        borrow_amount: TokenAmount,
        cumulative_deposit_interest_delta: Decimal,
    },
    PerpBankruptcy {
        market_index: MarketIndex,
        pnl_forgiven: Decimal,
        covered_by_insurance: Decimal,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub market_index: MarketIndex,
    pub direction: PositionDirection,
    pub base_asset_amount: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelRecord {
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub market_index: MarketIndex,
    pub reason: CancelReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CancelReason {
    UserRequested,
    StoreDeleted,
    MakerUnfilledRemainder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRecord {
    pub market_index: MarketIndex,
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub direction: PositionDirection,
    pub base_asset_amount: Decimal,
    pub price: Price,
    pub is_maker: bool,
}

/// Correlation record for an atomic signed-order settlement: `hash` is the
/// sha256 digest of the taker's signature, letting off-chain clients match
/// the fill back to the message they signed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedOrderRecord {
    pub taker_account_id: AccountId,
    pub taker_order_id: OrderId,
    pub uuid: [u8; 8],
    pub hash: [u8; 32],
}

impl Event {
    pub fn as_liquidation(&self) -> Option<&LiquidationRecord> {
        match &self.payload {
            EventPayload::Liquidation(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_fill(&self) -> Option<&FillRecord> {
        match &self.payload {
            EventPayload::Fill(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_signed_order(&self) -> Option<&SignedOrderRecord> {
        match &self.payload {
            EventPayload::SignedOrder(record) => Some(record),
            _ => None,
        }
    }
}
