//! Social-loss math for bankruptcy resolution.
//!
//! A forgiven borrow is not billed to any single party. The market's
//! cumulative deposit interest index is lowered so that every depositor's
//! claim shrinks by a pro-rata share of the loss. The borrow index is never
//! touched: remaining borrowers owe exactly what they owed before.

use crate::types::{TokenAmount, INTEREST_INDEX_DP};
use rust_decimal::{Decimal, RoundingStrategy};

/// Index reduction that spreads `forgiven_borrow` (real token units) across
/// `deposit_balance_scaled`. One base unit stays unspread and the quotient is
/// truncated at the index quantum: depositors as a whole absorb strictly less
/// than the forgiven borrow, so the market's net balance strictly increases.
pub fn deposit_interest_delta(
    forgiven_borrow: TokenAmount,
    deposit_balance_scaled: Decimal,
) -> Decimal {
    if deposit_balance_scaled <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let spread = (forgiven_borrow.value() - Decimal::ONE).max(Decimal::ZERO);
    (spread / deposit_balance_scaled)
        .round_dp_with_strategy(INTEREST_INDEX_DP, RoundingStrategy::ToZero)
}

/// Total real value the deposit side gives up under an index reduction.
pub fn socialized_loss(delta: Decimal, deposit_balance_scaled: Decimal) -> Decimal {
    delta * deposit_balance_scaled
}
