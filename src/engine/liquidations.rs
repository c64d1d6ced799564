//! Liquidation and bankruptcy resolution.
//!
//! Both operations are check-compute-commit: every precondition is validated
//! and every transfer leg computed before the first balance moves, so an
//! error leaves no trace. Racing liquidators are serialized by call order;
//! the loser re-evaluates preconditions and fails cleanly.

use super::core::Clearinghouse;
use super::results::{BankruptcyOutcome, LedgerError, LiquidationOutcome};
use crate::account::AccountError;
use crate::balance::scaled_to_token;
use crate::bankruptcy::deposit_interest_delta;
use crate::events::{EventPayload, LiquidationRecord, LiquidationType};
use crate::liquidation::{compute_transfers, LiquidationTransfers};
use crate::margin::{liquidator_headroom, MarginTier};
use crate::market::MarketError;
use crate::types::{AccountId, MarketIndex, SpotBalanceType, TokenAmount};
use rust_decimal::Decimal;

impl Clearinghouse {
    /// Transfer part of an insolvent account's borrow to a liquidator in
    /// exchange for deposit collateral of matching value, skimming the
    /// insurance-fund fee from the liability side.
    pub fn liquidate_spot(
        &mut self,
        liquidator_id: AccountId,
        victim_id: AccountId,
        asset_market_index: MarketIndex,
        liability_market_index: MarketIndex,
        max_liability_transfer: TokenAmount,
    ) -> Result<LiquidationOutcome, LedgerError> {
        self.accrue_market(asset_market_index)?;
        self.accrue_market(liability_market_index)?;

        // -- check --------------------------------------------------------

        if !self.accounts.contains_key(&liquidator_id) {
            return Err(AccountError::NotFound(liquidator_id).into());
        }

        // margin precondition comes first: a healed account fails with
        // NotLiquidatable no matter what positions it still carries
        let victim_summary = self.margin_summary_for(victim_id, MarginTier::Maintenance)?;
        if victim_summary.meets_requirement() {
            return Err(LedgerError::NotLiquidatable(victim_id));
        }

        let victim = self
            .accounts
            .get(&victim_id)
            .ok_or(AccountError::NotFound(victim_id))?;

        let asset_position = victim
            .spot_position(asset_market_index)
            .filter(|p| p.holds(SpotBalanceType::Deposit))
            .ok_or(LedgerError::PositionMissing {
                account: victim_id,
                market: asset_market_index,
                side: "deposit",
            })?;
        let liability_position = victim
            .spot_position(liability_market_index)
            .filter(|p| p.holds(SpotBalanceType::Borrow))
            .ok_or(LedgerError::PositionMissing {
                account: victim_id,
                market: liability_market_index,
                side: "borrow",
            })?;

        let asset_market = self
            .spot_markets
            .get(&asset_market_index)
            .ok_or(MarketError::SpotMarketNotFound(asset_market_index))?;
        let liability_market = self
            .spot_markets
            .get(&liability_market_index)
            .ok_or(MarketError::SpotMarketNotFound(liability_market_index))?;

        let asset_price = self
            .oracle
            .fresh_price(asset_market.config.oracle_id, self.current_tick)?
            .price;
        let liability_price = self
            .oracle
            .fresh_price(liability_market.config.oracle_id, self.current_tick)?
            .price;

        let liquidator_summary = self.margin_summary_for(liquidator_id, MarginTier::Maintenance)?;
        let headroom = liquidator_headroom(
            liquidator_summary.free_value(),
            asset_market,
            liability_market,
            liability_price,
            asset_market.config.liquidator_fee,
        );

        // -- compute ------------------------------------------------------

        let victim_borrow = scaled_to_token(
            liability_position.scaled_balance,
            liability_market.cumulative_borrow_interest,
            SpotBalanceType::Borrow,
        );
        let asset_available = scaled_to_token(
            asset_position.scaled_balance,
            asset_market.cumulative_deposit_interest,
            SpotBalanceType::Deposit,
        );

        let LiquidationTransfers {
            liability_transfer,
            asset_transfer,
            if_fee,
        } = compute_transfers(
            max_liability_transfer,
            victim_borrow,
            asset_available,
            asset_market,
            liability_market,
            asset_price,
            liability_price,
            headroom,
        );

        if liability_transfer.is_zero() {
            return Err(LedgerError::InsufficientLiquidatorCollateral(liquidator_id));
        }

        let liability_assumed = liability_transfer.saturating_sub(if_fee);

        // -- commit -------------------------------------------------------

        // asset leg: victim deposit -> liquidator deposit
        self.apply_spot_transfer(
            victim_id,
            asset_market_index,
            SpotBalanceType::Borrow,
            asset_transfer,
        )?;
        self.apply_spot_transfer(
            liquidator_id,
            asset_market_index,
            SpotBalanceType::Deposit,
            asset_transfer,
        )?;

        // liability leg: victim borrow shrinks by the post-fee amount, the
        // liquidator assumes the same; the fee stays behind as victim debt
        // backing the insurance fund's claim
        self.apply_spot_transfer(
            victim_id,
            liability_market_index,
            SpotBalanceType::Deposit,
            liability_assumed,
        )?;
        self.apply_spot_transfer(
            liquidator_id,
            liability_market_index,
            SpotBalanceType::Borrow,
            liability_assumed,
        )?;
        self.insurance_fund.deposit(liability_market_index, if_fee);

        let victim = self.accounts.get_mut(&victim_id).unwrap();
        victim.is_being_liquidated = true;
        let liquidation_id = victim.take_liquidation_id();

        let victim_bankrupt = !victim.has_deposits() && victim.has_borrows();
        if victim_bankrupt {
            victim.is_bankrupt = true;
        }

        self.emit_event(EventPayload::Liquidation(LiquidationRecord {
            account_id: victim_id,
            liquidator_id,
            liquidation_id,
            liquidation_type: LiquidationType::LiquidateSpot {
                asset_market_index,
                asset_price,
                asset_transfer,
                liability_market_index,
                liability_price,
                liability_transfer,
                if_fee,
            },
        }));

        Ok(LiquidationOutcome {
            liquidation_id,
            asset_transfer,
            liability_transfer,
            if_fee,
            asset_price,
            liability_price,
            victim_bankrupt,
        })
    }

    /// Forgive a bankrupt account's residual borrow and socialize the loss
    /// into the market's deposit interest index. Only reachable after
    /// liquidation has exhausted every deposit the account held.
    pub fn resolve_spot_bankruptcy(
        &mut self,
        liquidator_id: AccountId,
        victim_id: AccountId,
        market_index: MarketIndex,
    ) -> Result<BankruptcyOutcome, LedgerError> {
        self.accrue_market(market_index)?;

        // -- check --------------------------------------------------------

        let victim = self
            .accounts
            .get(&victim_id)
            .ok_or(AccountError::NotFound(victim_id))?;
        if !victim.is_bankrupt {
            return Err(LedgerError::NotBankrupt(victim_id));
        }

        let position = victim
            .spot_position(market_index)
            .filter(|p| p.holds(SpotBalanceType::Borrow))
            .ok_or(LedgerError::PositionMissing {
                account: victim_id,
                market: market_index,
                side: "borrow",
            })?;
        let position_scaled = position.scaled_balance;

        let market = self
            .spot_markets
            .get(&market_index)
            .ok_or(MarketError::SpotMarketNotFound(market_index))?;

        // -- compute ------------------------------------------------------

        let borrow_amount = scaled_to_token(
            position_scaled,
            market.cumulative_borrow_interest,
            SpotBalanceType::Borrow,
        );
        let delta = deposit_interest_delta(borrow_amount, market.deposit_balance_scaled);

        // -- commit -------------------------------------------------------

        let market = self.spot_markets.get_mut(&market_index).unwrap();
        market.apply_scaled_deltas(Decimal::ZERO, -position_scaled);
        market.cumulative_deposit_interest -= delta;

        let victim = self.accounts.get_mut(&victim_id).unwrap();
        let position = victim.spot_position_mut(market_index).unwrap();
        position.scaled_balance = Decimal::ZERO;

        if !victim.has_borrows() {
            victim.is_bankrupt = false;
            victim.is_being_liquidated = false;
        }
        let liquidation_id = victim.take_liquidation_id();

        self.emit_event(EventPayload::Liquidation(LiquidationRecord {
            account_id: victim_id,
            liquidator_id,
            liquidation_id,
            liquidation_type: LiquidationType::SpotBankruptcy {
                market_index,
                borrow_amount,
                cumulative_deposit_interest_delta: delta,
            },
        }));

        Ok(BankruptcyOutcome {
            liquidation_id,
            borrow_amount,
            cumulative_deposit_interest_delta: delta,
        })
    }

    /// Forgive a bankrupt account's negative perp quote balance, drawing on
    /// the insurance fund first. The remainder is written off against the
    /// fund's future skims rather than billed to counterparties.
    pub fn resolve_perp_bankruptcy(
        &mut self,
        liquidator_id: AccountId,
        victim_id: AccountId,
        market_index: MarketIndex,
    ) -> Result<(), LedgerError> {
        let victim = self
            .accounts
            .get(&victim_id)
            .ok_or(AccountError::NotFound(victim_id))?;
        if !victim.is_bankrupt {
            return Err(LedgerError::NotBankrupt(victim_id));
        }

        let position = victim
            .perp_position(market_index)
            .filter(|p| p.base_asset_amount.is_zero() && p.quote_asset_amount < Decimal::ZERO)
            .ok_or(LedgerError::PositionMissing {
                account: victim_id,
                market: market_index,
                side: "perp quote deficit",
            })?;
        let pnl_forgiven = -position.quote_asset_amount;

        let covered = self
            .insurance_fund
            .cover_bad_debt(market_index, TokenAmount::new(pnl_forgiven.floor()));

        let victim = self.accounts.get_mut(&victim_id).unwrap();
        let position = victim
            .perp_positions
            .iter_mut()
            .find(|p| p.market_index == market_index)
            .unwrap();
        position.quote_asset_amount = Decimal::ZERO;

        let has_perp_deficit = victim
            .perp_positions
            .iter()
            .any(|p| p.quote_asset_amount < Decimal::ZERO);
        if !victim.has_borrows() && !has_perp_deficit {
            victim.is_bankrupt = false;
            victim.is_being_liquidated = false;
        }
        let liquidation_id = victim.take_liquidation_id();

        self.emit_event(EventPayload::Liquidation(LiquidationRecord {
            account_id: victim_id,
            liquidator_id,
            liquidation_id,
            liquidation_type: LiquidationType::PerpBankruptcy {
                market_index,
                pnl_forgiven,
                covered_by_insurance: covered.value(),
            },
        }));

        Ok(())
    }
}
