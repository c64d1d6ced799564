//! Balance ledger operations: interest accrual, transfers, deposits and
//! withdrawals.
//!
//! Every operation here follows accrue-then-act: the touched market's
//! interest indices are brought up to the current tick before any balance is
//! read or written, so all conversions see up-to-date indices.

use super::core::Clearinghouse;
use super::results::LedgerError;
use crate::account::AccountError;
use crate::balance::compute_balance_update;
use crate::events::{DepositRecord, EventPayload, WithdrawalRecord};
use crate::margin::{margin_summary, MarginTier};
use crate::market::MarketError;
use crate::types::{AccountId, MarketIndex, SpotBalanceType, TokenAmount};

impl Clearinghouse {
    /// Bring a market's interest indices up to the current tick.
    pub(super) fn accrue_market(&mut self, market_index: MarketIndex) -> Result<(), LedgerError> {
        let now = self.current_tick;
        let market = self
            .spot_markets
            .get_mut(&market_index)
            .ok_or(MarketError::SpotMarketNotFound(market_index))?;
        market.accrue_interest(now);
        Ok(())
    }

    /// Move `amount` tokens into the given side of an account's position,
    /// flipping the position across zero if needed, and mirror the scaled
    /// deltas into the market aggregates. The caller has already accrued the
    /// market.
    pub(super) fn apply_spot_transfer(
        &mut self,
        account_id: AccountId,
        market_index: MarketIndex,
        balance_type: SpotBalanceType,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }

        let market = self
            .spot_markets
            .get_mut(&market_index)
            .ok_or(MarketError::SpotMarketNotFound(market_index))?;
        let deposit_index = market.cumulative_deposit_interest;
        let borrow_index = market.cumulative_borrow_interest;

        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(AccountError::NotFound(account_id))?;
        let position = account.spot_position_mut_or_new(market_index);

        let update =
            compute_balance_update(position, balance_type, amount, deposit_index, borrow_index);

        position.scaled_balance = update.new_scaled_balance;
        position.balance_type = update.new_balance_type;

        let market = self.spot_markets.get_mut(&market_index).unwrap();
        market.apply_scaled_deltas(update.deposit_scaled_delta, update.borrow_scaled_delta);

        Ok(())
    }

    /// Credit tokens to an account's deposit side (paying down a borrow
    /// first if one exists).
    pub fn deposit(
        &mut self,
        account_id: AccountId,
        market_index: MarketIndex,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        if !self.accounts.contains_key(&account_id) {
            return Err(AccountError::NotFound(account_id).into());
        }
        self.accrue_market(market_index)?;
        self.apply_spot_transfer(account_id, market_index, SpotBalanceType::Deposit, amount)?;

        self.emit_event(EventPayload::Deposit(DepositRecord {
            account_id,
            market_index,
            amount,
        }));
        Ok(())
    }

    /// Debit tokens from an account's deposit side. Withdrawing more than is
    /// on deposit flips the position into a borrow; the resulting account
    /// must still meet initial margin.
    pub fn withdraw(
        &mut self,
        account_id: AccountId,
        market_index: MarketIndex,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        self.accrue_market(market_index)?;

        // evaluate the post-withdrawal account on copies before committing
        let market = self
            .spot_markets
            .get(&market_index)
            .ok_or(MarketError::SpotMarketNotFound(market_index))?;
        let deposit_index = market.cumulative_deposit_interest;
        let borrow_index = market.cumulative_borrow_interest;

        let account = self
            .accounts
            .get(&account_id)
            .ok_or(AccountError::NotFound(account_id))?;

        let mut preview = account.clone();
        let position = preview.spot_position_mut_or_new(market_index);
        let update = compute_balance_update(
            position,
            SpotBalanceType::Borrow,
            amount,
            deposit_index,
            borrow_index,
        );
        position.scaled_balance = update.new_scaled_balance;
        position.balance_type = update.new_balance_type;

        if preview.has_borrows() {
            let prices = self.collect_spot_prices(&preview)?;
            let summary = margin_summary(&preview, &self.spot_markets, &prices, MarginTier::Initial);
            if !summary.meets_requirement() {
                return Err(LedgerError::WithdrawalExceedsMargin(account_id));
            }
        }

        // commit
        let account = self.accounts.get_mut(&account_id).unwrap();
        *account.spot_position_mut_or_new(market_index) =
            preview.spot_position(market_index).unwrap().clone();
        let market = self.spot_markets.get_mut(&market_index).unwrap();
        market.apply_scaled_deltas(update.deposit_scaled_delta, update.borrow_scaled_delta);

        self.emit_event(EventPayload::Withdrawal(WithdrawalRecord {
            account_id,
            market_index,
            amount,
        }));
        Ok(())
    }
}
