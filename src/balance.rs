// 2.0: scaled-balance math. a spot position stores `scaled_balance`, a claim
// normalized by the market's cumulative interest index for its side; the real
// token amount is recovered as scaled * index. interest accrual moves the index,
// never the stored balances.
//
// rounding always favors the market aggregate: converting tokens into a claim
// rounds the claim down, converting a claim back into tokens rounds deposits
// down and borrows up, and removing tokens from a claim rounds the removed
// claim up. dust stays on the ledger side.

use crate::types::{MarketIndex, SpotBalanceType, TokenAmount, SCALED_BALANCE_DP};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A single market's balance entry on an account. `scaled_balance` is never
/// negative; crossing zero flips `balance_type` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotPosition {
    pub market_index: MarketIndex,
    pub scaled_balance: Decimal,
    pub balance_type: SpotBalanceType,
}

impl SpotPosition {
    pub fn new(market_index: MarketIndex) -> Self {
        Self {
            market_index,
            scaled_balance: Decimal::ZERO,
            balance_type: SpotBalanceType::Deposit,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scaled_balance.is_zero()
    }

    pub fn holds(&self, balance_type: SpotBalanceType) -> bool {
        !self.is_empty() && self.balance_type == balance_type
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// Convert a token amount into scaled units at the given index.
pub fn token_to_scaled(amount: TokenAmount, index: Decimal, rounding: Rounding) -> Decimal {
    debug_assert!(index > Decimal::ZERO);
    let raw = amount.value() / index;
    match rounding {
        Rounding::Down => raw.round_dp_with_strategy(SCALED_BALANCE_DP, RoundingStrategy::ToZero),
        Rounding::Up => {
            raw.round_dp_with_strategy(SCALED_BALANCE_DP, RoundingStrategy::AwayFromZero)
        }
    }
}

/// Recover the whole-unit token amount a scaled balance is worth. Deposits
/// round down (the ledger owes the depositor no dust), borrows round up (the
/// borrower owes every fractional unit).
pub fn scaled_to_token(
    scaled: Decimal,
    index: Decimal,
    balance_type: SpotBalanceType,
) -> TokenAmount {
    debug_assert!(index > Decimal::ZERO);
    let raw = scaled * index;
    let amount = match balance_type {
        SpotBalanceType::Deposit => raw.floor(),
        SpotBalanceType::Borrow => raw.ceil(),
    };
    TokenAmount::new(amount.max(Decimal::ZERO))
}

/// Outcome of applying a token delta to a position: the scaled deltas the
/// market aggregates must absorb, and the position's end state.
#[derive(Debug, Clone, Copy)]
pub struct BalanceUpdate {
    pub deposit_scaled_delta: Decimal,
    pub borrow_scaled_delta: Decimal,
    pub new_scaled_balance: Decimal,
    pub new_balance_type: SpotBalanceType,
}

/// Compute the effect of moving `amount` tokens into (`increase` of
/// `balance_type`) or out of a position. Crossing zero flips the position to
/// the opposite balance type with the remainder; this is the only way a
/// position changes sides.
pub fn compute_balance_update(
    position: &SpotPosition,
    balance_type: SpotBalanceType,
    amount: TokenAmount,
    deposit_index: Decimal,
    borrow_index: Decimal,
) -> BalanceUpdate {
    let index_for = |bt: SpotBalanceType| match bt {
        SpotBalanceType::Deposit => deposit_index,
        SpotBalanceType::Borrow => borrow_index,
    };

    let mut deposit_scaled_delta = Decimal::ZERO;
    let mut borrow_scaled_delta = Decimal::ZERO;

    if position.is_empty() || position.balance_type == balance_type {
        // straight increase on the same side
        let scaled = token_to_scaled(amount, index_for(balance_type), Rounding::Down);
        match balance_type {
            SpotBalanceType::Deposit => deposit_scaled_delta = scaled,
            SpotBalanceType::Borrow => borrow_scaled_delta = scaled,
        }
        return BalanceUpdate {
            deposit_scaled_delta,
            borrow_scaled_delta,
            new_scaled_balance: position.scaled_balance + scaled,
            new_balance_type: balance_type,
        };
    }

    // opposite side: reduce the existing claim first, flip with the remainder
    let current_type = position.balance_type;
    let current_tokens = scaled_to_token(position.scaled_balance, index_for(current_type), current_type);

    if amount <= current_tokens {
        // an exact full repayment clears the claim outright so no dust survives
        let scaled_removed = if amount == current_tokens {
            position.scaled_balance
        } else {
            token_to_scaled(amount, index_for(current_type), Rounding::Up)
                .min(position.scaled_balance)
        };
        match current_type {
            SpotBalanceType::Deposit => deposit_scaled_delta = -scaled_removed,
            SpotBalanceType::Borrow => borrow_scaled_delta = -scaled_removed,
        }
        return BalanceUpdate {
            deposit_scaled_delta,
            borrow_scaled_delta,
            new_scaled_balance: position.scaled_balance - scaled_removed,
            new_balance_type: current_type,
        };
    }

    let remainder = amount.saturating_sub(current_tokens);
    let scaled_added = token_to_scaled(remainder, index_for(balance_type), Rounding::Down);
    match current_type {
        SpotBalanceType::Deposit => {
            deposit_scaled_delta = -position.scaled_balance;
            borrow_scaled_delta = scaled_added;
        }
        SpotBalanceType::Borrow => {
            borrow_scaled_delta = -position.scaled_balance;
            deposit_scaled_delta = scaled_added;
        }
    }
    BalanceUpdate {
        deposit_scaled_delta,
        borrow_scaled_delta,
        new_scaled_balance: scaled_added,
        new_balance_type: balance_type,
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BalanceError {
    #[error("Position in market {0:?} would go negative")]
    NegativeBalance(MarketIndex),

    #[error("Market {0:?} aggregate balance would go negative")]
    NegativeAggregate(MarketIndex),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn token_scaled_roundtrip_at_unit_index() {
        let amount = TokenAmount::new(dec!(100_000_000));
        let scaled = token_to_scaled(amount, dec!(1), Rounding::Down);
        assert_eq!(scaled, dec!(100_000_000));
        let back = scaled_to_token(scaled, dec!(1), SpotBalanceType::Deposit);
        assert_eq!(back, amount);
    }

    #[test]
    fn deposit_rounds_down_borrow_rounds_up() {
        let index = dec!(1.0000001);
        let scaled = dec!(999);
        let dep = scaled_to_token(scaled, index, SpotBalanceType::Deposit);
        let bor = scaled_to_token(scaled, index, SpotBalanceType::Borrow);
        assert_eq!(dep.value(), dec!(999));
        assert_eq!(bor.value(), dec!(1000));
    }

    #[test]
    fn increase_same_side() {
        let mut pos = SpotPosition::new(MarketIndex(1));
        let update = compute_balance_update(
            &pos,
            SpotBalanceType::Deposit,
            TokenAmount::new(dec!(1_000)),
            dec!(1),
            dec!(1),
        );
        assert_eq!(update.deposit_scaled_delta, dec!(1_000));
        assert_eq!(update.new_balance_type, SpotBalanceType::Deposit);
        pos.scaled_balance = update.new_scaled_balance;
        assert_eq!(pos.scaled_balance, dec!(1_000));
    }

    #[test]
    fn overdraw_flips_to_borrow() {
        let pos = SpotPosition {
            market_index: MarketIndex(1),
            scaled_balance: dec!(500),
            balance_type: SpotBalanceType::Deposit,
        };
        // borrowing 800 against a 500 deposit leaves a 300 borrow
        let update = compute_balance_update(
            &pos,
            SpotBalanceType::Borrow,
            TokenAmount::new(dec!(800)),
            dec!(1),
            dec!(1),
        );
        assert_eq!(update.deposit_scaled_delta, dec!(-500));
        assert_eq!(update.borrow_scaled_delta, dec!(300));
        assert_eq!(update.new_balance_type, SpotBalanceType::Borrow);
        assert_eq!(update.new_scaled_balance, dec!(300));
    }

    #[test]
    fn partial_reduction_keeps_side() {
        let pos = SpotPosition {
            market_index: MarketIndex(1),
            scaled_balance: dec!(500),
            balance_type: SpotBalanceType::Borrow,
        };
        let update = compute_balance_update(
            &pos,
            SpotBalanceType::Deposit,
            TokenAmount::new(dec!(200)),
            dec!(1),
            dec!(1),
        );
        assert_eq!(update.borrow_scaled_delta, dec!(-200));
        assert_eq!(update.new_balance_type, SpotBalanceType::Borrow);
        assert_eq!(update.new_scaled_balance, dec!(300));
    }

    #[test]
    fn reduction_never_exceeds_claim() {
        // at index > 1, removing the full token value must not push the
        // scaled balance below zero
        let pos = SpotPosition {
            market_index: MarketIndex(1),
            scaled_balance: dec!(100),
            balance_type: SpotBalanceType::Borrow,
        };
        let index = dec!(1.000000000003);
        let owed = scaled_to_token(pos.scaled_balance, index, SpotBalanceType::Borrow);
        let update =
            compute_balance_update(&pos, SpotBalanceType::Deposit, owed, dec!(1), index);
        assert!(update.new_scaled_balance >= Decimal::ZERO);
    }
}
