//! Order types, auction pricing, and the crossing predicate.
//!
//! Orders rest on the account that placed them. There is no central book:
//! matching is point-to-point — a maker names the taker order it wants to
//! cross, and the engine settles both legs in one atomic step.

use crate::types::{MarketIndex, OrderId, Price, PositionDirection, Tick};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketType {
    Spot,
    Perp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Executes against the auction ramp, then the static limit if any.
    Market,
    /// Resting order at a fixed price.
    Limit,
    /// Limit order armed only once the oracle crosses the trigger price.
    TriggerLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Filled,
    Canceled,
}

/// Maker-side posting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostOnlyParam {
    None,
    MustPostOnly,
}

impl Default for PostOnlyParam {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerCondition {
    /// Arms when the oracle price rises to or above the trigger.
    Above,
    /// Arms when the oracle price falls to or below the trigger.
    Below,
}

/// Client-supplied order parameters, embedded verbatim in signed messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderParams {
    pub market_index: MarketIndex,
    pub market_type: MarketType,
    pub order_type: OrderType,
    pub direction: PositionDirection,
    /// Base-asset amount in BASE_PRECISION units.
    pub base_asset_amount: Decimal,
    /// Static limit price; zero means none.
    pub price: Decimal,
    pub auction_start_price: Option<Decimal>,
    pub auction_end_price: Option<Decimal>,
    pub auction_duration: Option<u16>,
    pub post_only: PostOnlyParam,
    pub trigger_price: Option<Decimal>,
    pub trigger_condition: Option<TriggerCondition>,
}

impl OrderParams {
    pub fn market(
        market_index: MarketIndex,
        direction: PositionDirection,
        base_asset_amount: Decimal,
    ) -> Self {
        Self {
            market_index,
            market_type: MarketType::Perp,
            order_type: OrderType::Market,
            direction,
            base_asset_amount,
            price: Decimal::ZERO,
            auction_start_price: None,
            auction_end_price: None,
            auction_duration: None,
            post_only: PostOnlyParam::None,
            trigger_price: None,
            trigger_condition: None,
        }
    }

    pub fn limit(
        market_index: MarketIndex,
        direction: PositionDirection,
        base_asset_amount: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            market_index,
            market_type: MarketType::Perp,
            order_type: OrderType::Limit,
            direction,
            base_asset_amount,
            price,
            auction_start_price: None,
            auction_end_price: None,
            auction_duration: None,
            post_only: PostOnlyParam::None,
            trigger_price: None,
            trigger_condition: None,
        }
    }

    pub fn with_auction(mut self, start: Decimal, end: Decimal, duration: u16) -> Self {
        self.auction_start_price = Some(start);
        self.auction_end_price = Some(end);
        self.auction_duration = Some(duration);
        self
    }

    pub fn with_limit_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }

    pub fn post_only(mut self) -> Self {
        self.post_only = PostOnlyParam::MustPostOnly;
        self
    }

    pub fn has_complete_auction(&self) -> bool {
        self.auction_start_price.is_some()
            && self.auction_end_price.is_some()
            && self.auction_duration.is_some()
    }

    pub fn has_partial_auction(&self) -> bool {
        let present = [
            self.auction_start_price.is_some(),
            self.auction_end_price.is_some(),
            self.auction_duration.is_some(),
        ];
        present.iter().any(|p| *p) && !present.iter().all(|p| *p)
    }
}

/// A resting or historical order on an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub market_index: MarketIndex,
    pub market_type: MarketType,
    pub order_type: OrderType,
    pub direction: PositionDirection,
    pub base_asset_amount: Decimal,
    pub base_asset_amount_filled: Decimal,
    pub price: Decimal,
    pub auction_start_price: Option<Decimal>,
    pub auction_end_price: Option<Decimal>,
    pub auction_duration: Option<u16>,
    pub post_only: PostOnlyParam,
    pub trigger_price: Option<Decimal>,
    pub trigger_condition: Option<TriggerCondition>,
    /// Placement tick. For signed taker orders this is the message's
    /// sequence number, not the tick the ledger processed it at.
    pub tick: Tick,
}

impl Order {
    pub fn from_params(order_id: OrderId, params: &OrderParams, tick: Tick) -> Self {
        Self {
            order_id,
            status: OrderStatus::Open,
            market_index: params.market_index,
            market_type: params.market_type,
            order_type: params.order_type,
            direction: params.direction,
            base_asset_amount: params.base_asset_amount,
            base_asset_amount_filled: Decimal::ZERO,
            price: params.price,
            auction_start_price: params.auction_start_price,
            auction_end_price: params.auction_end_price,
            auction_duration: params.auction_duration,
            post_only: params.post_only,
            trigger_price: params.trigger_price,
            trigger_condition: params.trigger_condition,
            tick,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    pub fn remaining(&self) -> Decimal {
        (self.base_asset_amount - self.base_asset_amount_filled).max(Decimal::ZERO)
    }

    /// Record a fill; flips to Filled when nothing remains.
    pub fn fill(&mut self, base_amount: Decimal) {
        debug_assert!(base_amount <= self.remaining(), "cannot fill more than remaining");
        self.base_asset_amount_filled += base_amount;
        if self.remaining().is_zero() {
            self.status = OrderStatus::Filled;
        }
    }

    /// The price this order is willing to trade at on tick `now`. Inside the
    /// auction window the price ramps linearly from start to end; afterwards
    /// the static limit applies, falling back to the auction end price when
    /// the order has no limit.
    pub fn limit_price_at(&self, now: Tick) -> Option<Price> {
        if let (Some(start), Some(end), Some(duration)) = (
            self.auction_start_price,
            self.auction_end_price,
            self.auction_duration,
        ) {
            let elapsed = now.elapsed_since(self.tick);
            let duration = i64::from(duration);
            if elapsed < duration {
                let progress = Decimal::from(elapsed) / Decimal::from(duration);
                let price = start + (end - start) * progress;
                return Price::new(price);
            }
            if self.price.is_zero() {
                return Price::new(end);
            }
            return Price::new(self.price);
        }

        if self.price.is_zero() {
            None
        } else {
            Price::new(self.price)
        }
    }

    /// Whether an oracle print satisfies the trigger condition.
    pub fn should_trigger(&self, oracle_price: Price) -> bool {
        match (self.trigger_price, self.trigger_condition) {
            (Some(trigger), Some(TriggerCondition::Above)) => oracle_price.value() >= trigger,
            (Some(trigger), Some(TriggerCondition::Below)) => oracle_price.value() <= trigger,
            _ => false,
        }
    }
}

/// Whether a taker bound and a maker quote cross: a long taker pays up to its
/// bound, a short taker sells down to it.
pub fn crosses(taker_direction: PositionDirection, taker_bound: Price, maker_price: Price) -> bool {
    match taker_direction {
        PositionDirection::Long => maker_price.value() <= taker_bound.value(),
        PositionDirection::Short => maker_price.value() >= taker_bound.value(),
    }
}
