//! Margin valuation across an account's spot positions.
//!
//! Collateral is the weighted oracle value of deposits, liability the
//! weighted value of borrows. Asset weights discount collateral (<= 1),
//! liability weights pad debt (>= 1). An account is liquidatable when
//! weighted collateral no longer covers weighted liability.

use crate::balance::scaled_to_token;
use crate::market::SpotMarket;
use crate::types::{MarketIndex, Price, SpotBalanceType};
use crate::account::Account;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginTier {
    Initial,
    Maintenance,
}

#[derive(Debug, Clone, Copy)]
pub struct MarginSummary {
    /// Weighted value of all deposits, quote units.
    pub collateral_value: Decimal,
    /// Weighted value of all borrows, quote units.
    pub liability_value: Decimal,
}

impl MarginSummary {
    /// Collateral / liability. Max when there is nothing owed.
    pub fn ratio(&self) -> Decimal {
        if self.liability_value.is_zero() {
            return Decimal::MAX;
        }
        self.collateral_value / self.liability_value
    }

    pub fn meets_requirement(&self) -> bool {
        self.collateral_value >= self.liability_value
    }

    /// Weighted value still free to absorb new liability.
    pub fn free_value(&self) -> Decimal {
        self.collateral_value - self.liability_value
    }
}

/// Value every spot position at the given oracle prices. Prices are keyed by
/// market; missing markets contribute nothing (callers validate prices for
/// the markets they act on).
pub fn margin_summary(
    account: &Account,
    markets: &HashMap<MarketIndex, SpotMarket>,
    prices: &HashMap<MarketIndex, Price>,
    tier: MarginTier,
) -> MarginSummary {
    let mut collateral_value = Decimal::ZERO;
    let mut liability_value = Decimal::ZERO;

    for position in &account.spot_positions {
        if position.is_empty() {
            continue;
        }
        let (Some(market), Some(price)) = (
            markets.get(&position.market_index),
            prices.get(&position.market_index),
        ) else {
            continue;
        };

        let amount = scaled_to_token(
            position.scaled_balance,
            market.index_for(position.balance_type),
            position.balance_type,
        );
        let value = market.config.token_value(amount, price.value());

        match position.balance_type {
            SpotBalanceType::Deposit => {
                let weight = match tier {
                    MarginTier::Initial => market.config.initial_asset_weight,
                    MarginTier::Maintenance => market.config.maintenance_asset_weight,
                };
                collateral_value += value * weight;
            }
            SpotBalanceType::Borrow => {
                let weight = match tier {
                    MarginTier::Initial => market.config.initial_liability_weight,
                    MarginTier::Maintenance => market.config.maintenance_liability_weight,
                };
                liability_value += value * weight;
            }
        }
    }

    MarginSummary {
        collateral_value,
        liability_value,
    }
}

/// Largest liability (in liability-market base units) a liquidator can take
/// on while staying at maintenance margin, given that each unit also brings
/// in its asset-side countervalue. `None` means unbounded: the discounted
/// asset received outweighs the padded liability assumed.
pub fn liquidator_headroom(
    free_value: Decimal,
    asset_market: &SpotMarket,
    liability_market: &SpotMarket,
    liability_price: Price,
    liquidator_fee: Decimal,
) -> Option<Decimal> {
    let asset_weight = asset_market.config.maintenance_asset_weight;
    let liability_weight = liability_market.config.maintenance_liability_weight;

    // per quote-unit of liability assumed, the net margin cost
    let net_cost = liability_weight - (Decimal::ONE + liquidator_fee) * asset_weight;
    if net_cost <= Decimal::ZERO {
        return None;
    }

    if free_value <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }

    let max_value = free_value / net_cost;
    let unit = crate::market::SpotMarketConfig::unit(liability_market.config.decimals);
    Some((max_value / liability_price.value() * unit).floor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Authority;
    use crate::market::SpotMarketConfig;
    use crate::types::{AccountId, OracleId, SubAccountId, Tick, Timestamp};
    use rust_decimal_macros::dec;

    fn setup() -> (Account, HashMap<MarketIndex, SpotMarket>, HashMap<MarketIndex, Price>) {
        let mut markets = HashMap::new();
        markets.insert(
            MarketIndex(0),
            SpotMarket::new(SpotMarketConfig::quote(MarketIndex(0), OracleId(0)), Tick(0)),
        );
        markets.insert(
            MarketIndex(1),
            SpotMarket::new(
                SpotMarketConfig::base(MarketIndex(1), OracleId(1), "SOL"),
                Tick(0),
            ),
        );

        let mut prices = HashMap::new();
        prices.insert(MarketIndex(0), Price::new_unchecked(dec!(1)));
        prices.insert(MarketIndex(1), Price::new_unchecked(dec!(100)));

        let account = Account::new(
            AccountId(1),
            SubAccountId(0),
            Authority([0u8; 32]),
            Timestamp::from_millis(0),
        );
        (account, markets, prices)
    }

    #[test]
    fn empty_account_has_max_ratio() {
        let (account, markets, prices) = setup();
        let summary = margin_summary(&account, &markets, &prices, MarginTier::Maintenance);
        assert_eq!(summary.ratio(), Decimal::MAX);
        assert!(summary.meets_requirement());
    }

    #[test]
    fn deposit_and_borrow_weighted() {
        let (mut account, markets, prices) = setup();
        // 100 USDC deposit
        let pos = account.spot_position_mut_or_new(MarketIndex(0));
        pos.scaled_balance = dec!(100_000_000);
        pos.balance_type = SpotBalanceType::Deposit;
        // 0.5 SOL borrow at $100 = $50, weighted 1.1 -> 55
        let pos = account.spot_position_mut_or_new(MarketIndex(1));
        pos.scaled_balance = dec!(500_000_000);
        pos.balance_type = SpotBalanceType::Borrow;

        let summary = margin_summary(&account, &markets, &prices, MarginTier::Maintenance);
        assert_eq!(summary.collateral_value, dec!(100));
        assert_eq!(summary.liability_value, dec!(55));
        assert!(summary.meets_requirement());
    }

    #[test]
    fn doubling_price_makes_account_liquidatable() {
        let (mut account, markets, mut prices) = setup();
        let pos = account.spot_position_mut_or_new(MarketIndex(0));
        pos.scaled_balance = dec!(100_000_000);
        pos.balance_type = SpotBalanceType::Deposit;
        let pos = account.spot_position_mut_or_new(MarketIndex(1));
        pos.scaled_balance = dec!(500_000_000);
        pos.balance_type = SpotBalanceType::Borrow;

        prices.insert(MarketIndex(1), Price::new_unchecked(dec!(200)));
        let summary = margin_summary(&account, &markets, &prices, MarginTier::Maintenance);
        // borrow value 100, weighted 110 > 100 collateral
        assert!(!summary.meets_requirement());
        assert!(summary.ratio() < Decimal::ONE);
    }

    #[test]
    fn headroom_bounded_when_liability_weight_dominates() {
        let (_, markets, _) = setup();
        let quote = markets.get(&MarketIndex(0)).unwrap();
        let sol = markets.get(&MarketIndex(1)).unwrap();

        // receiving quote (weight 1.0) against sol debt (weight 1.1), no fee:
        // each quote-unit of liability costs 0.1 of free value
        let headroom = liquidator_headroom(
            dec!(20),
            quote,
            sol,
            Price::new_unchecked(dec!(200)),
            Decimal::ZERO,
        )
        .expect("bounded");
        // 20 / 0.1 = 200 quote of liability = 1 SOL = 1e9 base units
        assert_eq!(headroom, dec!(1_000_000_000));
    }

    #[test]
    fn headroom_unbounded_when_discount_covers_weight() {
        let (_, markets, _) = setup();
        let quote = markets.get(&MarketIndex(0)).unwrap();
        // quote liability (weight 1.0) against quote asset (weight 1.0) with
        // any positive fee nets out favorable
        let headroom = liquidator_headroom(
            dec!(1),
            quote,
            quote,
            Price::new_unchecked(dec!(1)),
            dec!(0.01),
        );
        assert!(headroom.is_none());
    }
}
