//! Market configuration and state.
//!
//! A spot market tracks the aggregate interest-bearing deposit and borrow
//! pools for one token. A perp market is a venue for signed-order matching;
//! its pricing internals live outside the clearinghouse.

use crate::balance::scaled_to_token;
use crate::interest::{compute_accrual, AccrualUpdate, InterestRateCurve};
use crate::types::{MarketIndex, OracleId, SpotBalanceType, Tick, TokenAmount};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Market status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    /// Market is open.
    Active,
    /// Operations paused (e.g. during an incident).
    Paused,
}

impl Default for MarketStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Static spot market configuration (immutable after creation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotMarketConfig {
    pub market_index: MarketIndex,
    /// Human-readable name (e.g. "USDC", "SOL")
    pub name: String,
    /// Token decimals; one whole token is 10^decimals base units.
    pub decimals: u32,
    pub oracle_id: OracleId,
    pub interest_curve: InterestRateCurve,
    /// Discount on the seized asset granted to the liquidator.
    pub liquidator_fee: Decimal,
    /// Fraction of a liability transfer skimmed into the insurance fund.
    pub if_fee_ratio: Decimal,
    pub initial_asset_weight: Decimal,
    pub maintenance_asset_weight: Decimal,
    pub initial_liability_weight: Decimal,
    pub maintenance_liability_weight: Decimal,
}

impl SpotMarketConfig {
    /// Quote-asset market preset: weight-neutral, never discounted.
    pub fn quote(market_index: MarketIndex, oracle_id: OracleId) -> Self {
        Self {
            market_index,
            name: "USDC".to_string(),
            decimals: 6,
            oracle_id,
            interest_curve: InterestRateCurve::default(),
            liquidator_fee: Decimal::ZERO,
            if_fee_ratio: dec!(0.01),
            initial_asset_weight: Decimal::ONE,
            maintenance_asset_weight: Decimal::ONE,
            initial_liability_weight: Decimal::ONE,
            maintenance_liability_weight: Decimal::ONE,
        }
    }

    /// Volatile base-asset market preset.
    pub fn base(market_index: MarketIndex, oracle_id: OracleId, name: &str) -> Self {
        Self {
            market_index,
            name: name.to_string(),
            decimals: 9,
            oracle_id,
            interest_curve: InterestRateCurve::default(),
            liquidator_fee: Decimal::ZERO,
            if_fee_ratio: dec!(0.01),
            initial_asset_weight: dec!(0.8),
            maintenance_asset_weight: dec!(0.9),
            initial_liability_weight: dec!(1.2),
            maintenance_liability_weight: dec!(1.1),
        }
    }

    /// Value in quote units of `amount` base units at `price`.
    pub fn token_value(&self, amount: TokenAmount, price: Decimal) -> Decimal {
        amount.value() * price / Self::unit(self.decimals)
    }

    pub fn unit(decimals: u32) -> Decimal {
        Decimal::from(10u64.pow(decimals))
    }
}

/// Dynamic spot market state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotMarket {
    pub config: SpotMarketConfig,
    pub status: MarketStatus,
    /// Aggregate scaled balances across all accounts.
    pub deposit_balance_scaled: Decimal,
    pub borrow_balance_scaled: Decimal,
    /// Cumulative interest indices, baseline 1.0. Accrual only raises them;
    /// bankruptcy socialization is the single path that lowers the deposit
    /// index.
    pub cumulative_deposit_interest: Decimal,
    pub cumulative_borrow_interest: Decimal,
    pub last_interest_tick: Tick,
}

impl SpotMarket {
    pub fn new(config: SpotMarketConfig, tick: Tick) -> Self {
        Self {
            config,
            status: MarketStatus::Active,
            deposit_balance_scaled: Decimal::ZERO,
            borrow_balance_scaled: Decimal::ZERO,
            cumulative_deposit_interest: Decimal::ONE,
            cumulative_borrow_interest: Decimal::ONE,
            last_interest_tick: tick,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MarketStatus::Active
    }

    pub fn index_for(&self, balance_type: SpotBalanceType) -> Decimal {
        match balance_type {
            SpotBalanceType::Deposit => self.cumulative_deposit_interest,
            SpotBalanceType::Borrow => self.cumulative_borrow_interest,
        }
    }

    /// Real token amount behind one side's aggregate scaled balance.
    pub fn token_amount(&self, balance_type: SpotBalanceType) -> TokenAmount {
        let scaled = match balance_type {
            SpotBalanceType::Deposit => self.deposit_balance_scaled,
            SpotBalanceType::Borrow => self.borrow_balance_scaled,
        };
        scaled_to_token(scaled, self.index_for(balance_type), balance_type)
    }

    /// Net balance (deposits - borrows) in exact real units, no per-side
    /// rounding. The quantity bankruptcy socialization must strictly
    /// increase.
    pub fn net_token_balance(&self) -> Decimal {
        self.deposit_balance_scaled * self.cumulative_deposit_interest
            - self.borrow_balance_scaled * self.cumulative_borrow_interest
    }

    /// Advance both interest indices to `now`. Must run before any
    /// balance-affecting operation reads the indices.
    pub fn accrue_interest(&mut self, now: Tick) -> AccrualUpdate {
        let deposits = self.deposit_balance_scaled * self.cumulative_deposit_interest;
        let borrows = self.borrow_balance_scaled * self.cumulative_borrow_interest;

        let update = compute_accrual(
            deposits,
            borrows,
            self.cumulative_deposit_interest,
            self.cumulative_borrow_interest,
            &self.config.interest_curve,
            self.last_interest_tick,
            now,
        );

        self.cumulative_deposit_interest += update.deposit_index_delta;
        self.cumulative_borrow_interest += update.borrow_index_delta;
        if now > self.last_interest_tick {
            self.last_interest_tick = now;
        }
        update
    }

    /// Apply scaled deltas to the aggregates; callers have already validated
    /// the deltas against the positions they came from.
    pub fn apply_scaled_deltas(&mut self, deposit_delta: Decimal, borrow_delta: Decimal) {
        self.deposit_balance_scaled = (self.deposit_balance_scaled + deposit_delta).max(Decimal::ZERO);
        self.borrow_balance_scaled = (self.borrow_balance_scaled + borrow_delta).max(Decimal::ZERO);
    }
}

/// A perp venue. Positions created against it live on accounts; fills come
/// exclusively from the order engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerpMarket {
    pub market_index: MarketIndex,
    pub name: String,
    pub oracle_id: OracleId,
    pub status: MarketStatus,
}

impl PerpMarket {
    pub fn new(market_index: MarketIndex, oracle_id: OracleId, name: &str) -> Self {
        Self {
            market_index,
            name: name.to_string(),
            oracle_id,
            status: MarketStatus::Active,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MarketError {
    #[error("Spot market {0:?} not found")]
    SpotMarketNotFound(MarketIndex),

    #[error("Perp market {0:?} not found")]
    PerpMarketNotFound(MarketIndex),

    #[error("Market {0:?} is not active")]
    MarketNotActive(MarketIndex),
}
