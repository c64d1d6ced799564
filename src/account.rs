//! Account state: spot balance positions, perp positions, resting orders,
//! and liquidation bookkeeping.
//!
//! Positions are kept in the order the markets were first touched. The
//! liquidation flags are transient and cleared once solvency is restored.

use crate::balance::SpotPosition;
use crate::order::{Order, OrderStatus};
use crate::types::{AccountId, MarketIndex, OrderId, SpotBalanceType, SubAccountId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Verifying key for the account's signed orders. Opaque bytes; the actual
/// scheme lives behind the injected `SignatureVerifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority(pub [u8; 32]);

/// A signed base-asset exposure in one perp market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerpPosition {
    pub market_index: MarketIndex,
    /// Positive = long, negative = short, in BASE_PRECISION units.
    pub base_asset_amount: Decimal,
    /// Cumulative quote paid (negative) or received (positive) for the base.
    pub quote_asset_amount: Decimal,
}

impl PerpPosition {
    pub fn new(market_index: MarketIndex) -> Self {
        Self {
            market_index,
            base_asset_amount: Decimal::ZERO,
            quote_asset_amount: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub sub_account_id: SubAccountId,
    pub authority: Authority,
    /// One entry per spot market touched, in touch order.
    pub spot_positions: Vec<SpotPosition>,
    pub perp_positions: Vec<PerpPosition>,
    /// Resting and historical orders.
    pub orders: Vec<Order>,
    pub is_being_liquidated: bool,
    pub is_bankrupt: bool,
    /// Monotonic counter, starts at 1; consumed by liquidation records.
    pub next_liquidation_id: u16,
    /// Monotonic counter, starts at 1; consumed by order placement.
    pub next_order_id: u32,
    pub created_at: Timestamp,
}

impl Account {
    pub fn new(
        id: AccountId,
        sub_account_id: SubAccountId,
        authority: Authority,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            sub_account_id,
            authority,
            spot_positions: Vec::new(),
            perp_positions: Vec::new(),
            orders: Vec::new(),
            is_being_liquidated: false,
            is_bankrupt: false,
            next_liquidation_id: 1,
            next_order_id: 1,
            created_at: timestamp,
        }
    }

    pub fn spot_position(&self, market_index: MarketIndex) -> Option<&SpotPosition> {
        self.spot_positions.iter().find(|p| p.market_index == market_index)
    }

    pub fn spot_position_mut(&mut self, market_index: MarketIndex) -> Option<&mut SpotPosition> {
        self.spot_positions.iter_mut().find(|p| p.market_index == market_index)
    }

    /// Position for a market, created empty on first touch.
    pub fn spot_position_mut_or_new(&mut self, market_index: MarketIndex) -> &mut SpotPosition {
        if self.spot_position(market_index).is_none() {
            self.spot_positions.push(SpotPosition::new(market_index));
        }
        self.spot_position_mut(market_index).unwrap()
    }

    pub fn perp_position(&self, market_index: MarketIndex) -> Option<&PerpPosition> {
        self.perp_positions.iter().find(|p| p.market_index == market_index)
    }

    pub fn perp_position_mut_or_new(&mut self, market_index: MarketIndex) -> &mut PerpPosition {
        if self.perp_position(market_index).is_none() {
            self.perp_positions.push(PerpPosition::new(market_index));
        }
        self.perp_positions
            .iter_mut()
            .find(|p| p.market_index == market_index)
            .unwrap()
    }

    pub fn has_deposits(&self) -> bool {
        self.spot_positions.iter().any(|p| p.holds(SpotBalanceType::Deposit))
    }

    pub fn has_borrows(&self) -> bool {
        self.spot_positions.iter().any(|p| p.holds(SpotBalanceType::Borrow))
    }

    /// Consume the next liquidation id (first call returns 1).
    pub fn take_liquidation_id(&mut self) -> u16 {
        let id = self.next_liquidation_id;
        self.next_liquidation_id += 1;
        id
    }

    pub fn take_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.order_id == order_id)
    }

    pub fn order_mut(&mut self, order_id: OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.order_id == order_id)
    }

    pub fn open_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.status == OrderStatus::Open)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    #[error("Account {0:?} not found")]
    NotFound(AccountId),

    #[error("Account {account:?} has no position in market {market:?}")]
    PositionNotFound { account: AccountId, market: MarketIndex },

    #[error("Sub-account id does not match the signed message")]
    SubAccountMismatch,
}
