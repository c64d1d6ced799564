//! Spot liquidation math.
//!
//! A liquidator assumes part of an insolvent account's borrow and receives
//! deposit collateral of equal oracle value plus a discount. A fixed fraction
//! of the liability transfer is skimmed for the insurance fund: the victim's
//! borrow is only reduced by the post-fee amount, so the skim is retained as
//! victim debt backing the fund's claim.

use crate::market::{SpotMarket, SpotMarketConfig};
use crate::types::{MarketIndex, Price, TokenAmount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The transfer legs of one liquidation, all in base units of their market.
#[derive(Debug, Clone, Copy)]
pub struct LiquidationTransfers {
    pub liability_transfer: TokenAmount,
    pub asset_transfer: TokenAmount,
    pub if_fee: TokenAmount,
}

/// Clamp the liability transfer to what the caller asked for, what the victim
/// owes, what the victim's asset deposit can pay for, and what the liquidator
/// can absorb.
pub fn clamp_liability_transfer(
    max_requested: TokenAmount,
    victim_borrow: TokenAmount,
    asset_implied_cap: TokenAmount,
    liquidator_headroom: Option<Decimal>,
) -> TokenAmount {
    let mut transfer = max_requested.min(victim_borrow).min(asset_implied_cap);
    if let Some(headroom) = liquidator_headroom {
        transfer = transfer.min(TokenAmount::new(headroom.max(Decimal::ZERO)));
    }
    transfer
}

/// The liability amount whose discounted asset countervalue equals the
/// victim's available deposit. Beyond this there is nothing left to seize.
pub fn asset_implied_liability_cap(
    asset_available: TokenAmount,
    asset_market: &SpotMarketConfig,
    liability_market: &SpotMarketConfig,
    asset_price: Price,
    liability_price: Price,
) -> TokenAmount {
    let asset_value = asset_market.token_value(asset_available, asset_price.value());
    let liability_value = asset_value / (Decimal::ONE + asset_market.liquidator_fee);
    let unit = SpotMarketConfig::unit(liability_market.decimals);
    TokenAmount::new((liability_value / liability_price.value() * unit).floor())
}

/// Asset base units owed for a liability transfer: equal oracle value scaled
/// across token decimals, plus the liquidator discount.
pub fn asset_transfer_for_liability(
    liability_transfer: TokenAmount,
    asset_market: &SpotMarketConfig,
    liability_market: &SpotMarketConfig,
    asset_price: Price,
    liability_price: Price,
) -> TokenAmount {
    let liability_value =
        liability_market.token_value(liability_transfer, liability_price.value());
    let gross = liability_value * (Decimal::ONE + asset_market.liquidator_fee);
    let unit = SpotMarketConfig::unit(asset_market.decimals);
    TokenAmount::new((gross / asset_price.value() * unit).floor())
}

/// Insurance-fund skim on the liability side.
pub fn insurance_fund_fee(liability_transfer: TokenAmount, if_fee_ratio: Decimal) -> TokenAmount {
    TokenAmount::new((liability_transfer.value() * if_fee_ratio).floor())
}

/// Compute all transfer legs for a liquidation.
pub fn compute_transfers(
    max_requested: TokenAmount,
    victim_borrow: TokenAmount,
    asset_available: TokenAmount,
    asset_market: &SpotMarket,
    liability_market: &SpotMarket,
    asset_price: Price,
    liability_price: Price,
    liquidator_headroom: Option<Decimal>,
) -> LiquidationTransfers {
    let cap = asset_implied_liability_cap(
        asset_available,
        &asset_market.config,
        &liability_market.config,
        asset_price,
        liability_price,
    );
    let liability_transfer =
        clamp_liability_transfer(max_requested, victim_borrow, cap, liquidator_headroom);
    let asset_transfer = asset_transfer_for_liability(
        liability_transfer,
        &asset_market.config,
        &liability_market.config,
        asset_price,
        liability_price,
    );
    let if_fee = insurance_fund_fee(liability_transfer, liability_market.config.if_fee_ratio);

    LiquidationTransfers {
        liability_transfer,
        asset_transfer,
        if_fee,
    }
}

/// Loss-absorption reserve, capitalized by liquidation skims. Balances are
/// per market because fees are denominated in the liability token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsuranceFund {
    balances: HashMap<MarketIndex, TokenAmount>,
}

impl InsuranceFund {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, market_index: MarketIndex) -> TokenAmount {
        self.balances
            .get(&market_index)
            .copied()
            .unwrap_or_else(TokenAmount::zero)
    }

    pub fn deposit(&mut self, market_index: MarketIndex, amount: TokenAmount) {
        let entry = self
            .balances
            .entry(market_index)
            .or_insert_with(TokenAmount::zero);
        *entry = entry.add(amount);
    }

    /// Pay out up to `amount`; returns what the fund could actually cover.
    pub fn cover_bad_debt(&mut self, market_index: MarketIndex, amount: TokenAmount) -> TokenAmount {
        let entry = self
            .balances
            .entry(market_index)
            .or_insert_with(TokenAmount::zero);
        let covered = TokenAmount::min(entry, amount);
        *entry = entry.saturating_sub(covered);
        covered
    }
}
