// 3.0: interest accrual. borrowers pay depositors continuously; the rate is a
// function of utilization (borrow/deposit). 3.0 has the params/state structs,
// 3.1+ the rate math. accrual only moves the two cumulative indices; stored
// scaled balances never change.

use crate::types::{Tick, INTEREST_INDEX_DP, TICKS_PER_YEAR};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Two-segment borrow-rate curve: linear up to the optimal utilization, then
/// a steeper linear ramp to the max rate at 100% utilization. Rates are
/// annualized fractions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestRateCurve {
    pub optimal_utilization: Decimal,
    pub optimal_borrow_rate: Decimal,
    pub max_borrow_rate: Decimal,
}

impl Default for InterestRateCurve {
    fn default() -> Self {
        Self {
            optimal_utilization: dec!(0.8),
            optimal_borrow_rate: dec!(0.10),
            max_borrow_rate: dec!(1.0),
        }
    }
}

// 3.1: fraction of deposits currently lent out. capped at 1.
pub fn utilization(deposits: Decimal, borrows: Decimal) -> Decimal {
    if deposits <= Decimal::ZERO {
        if borrows > Decimal::ZERO {
            return Decimal::ONE;
        }
        return Decimal::ZERO;
    }
    (borrows / deposits).min(Decimal::ONE)
}

// 3.2: annualized borrow rate from the curve.
pub fn borrow_rate(util: Decimal, curve: &InterestRateCurve) -> Decimal {
    if util <= curve.optimal_utilization {
        if curve.optimal_utilization.is_zero() {
            return curve.optimal_borrow_rate;
        }
        curve.optimal_borrow_rate * util / curve.optimal_utilization
    } else {
        let excess = util - curve.optimal_utilization;
        let span = Decimal::ONE - curve.optimal_utilization;
        if span.is_zero() {
            return curve.max_borrow_rate;
        }
        curve.optimal_borrow_rate + (curve.max_borrow_rate - curve.optimal_borrow_rate) * excess / span
    }
}

// 3.3: depositors earn the borrow rate pro-rated by utilization.
pub fn deposit_rate(util: Decimal, borrow: Decimal) -> Decimal {
    borrow * util
}

/// Index growth over `elapsed_ticks` at an annualized `rate`. Quantized down
/// so indices only ever gain what the ledger can account for.
pub fn index_delta(index: Decimal, rate: Decimal, elapsed_ticks: i64) -> Decimal {
    if elapsed_ticks <= 0 || rate.is_zero() {
        return Decimal::ZERO;
    }
    let growth = index * rate * Decimal::from(elapsed_ticks) / Decimal::from(TICKS_PER_YEAR);
    growth
        .round_dp_with_strategy(INTEREST_INDEX_DP, RoundingStrategy::ToZero)
        .max(Decimal::ZERO)
}

/// Result of one accrual step.
#[derive(Debug, Clone, Copy)]
pub struct AccrualUpdate {
    pub deposit_index_delta: Decimal,
    pub borrow_index_delta: Decimal,
    pub utilization: Decimal,
    pub borrow_rate: Decimal,
}

/// Compute the accrual for a market snapshot. `deposits`/`borrows` are real
/// token amounts at the current indices.
pub fn compute_accrual(
    deposits: Decimal,
    borrows: Decimal,
    deposit_index: Decimal,
    borrow_index: Decimal,
    curve: &InterestRateCurve,
    last_tick: Tick,
    now: Tick,
) -> AccrualUpdate {
    let elapsed = now.elapsed_since(last_tick);
    let util = utilization(deposits, borrows);

    if borrows.is_zero() || elapsed == 0 {
        return AccrualUpdate {
            deposit_index_delta: Decimal::ZERO,
            borrow_index_delta: Decimal::ZERO,
            utilization: util,
            borrow_rate: Decimal::ZERO,
        };
    }

    let b_rate = borrow_rate(util, curve);
    let d_rate = deposit_rate(util, b_rate);

    AccrualUpdate {
        deposit_index_delta: index_delta(deposit_index, d_rate, elapsed),
        borrow_index_delta: index_delta(borrow_index, b_rate, elapsed),
        utilization: util,
        borrow_rate: b_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> InterestRateCurve {
        InterestRateCurve::default()
    }

    #[test]
    fn utilization_basic() {
        assert_eq!(utilization(dec!(1000), dec!(500)), dec!(0.5));
        assert_eq!(utilization(dec!(0), dec!(0)), Decimal::ZERO);
        assert_eq!(utilization(dec!(0), dec!(10)), Decimal::ONE);
    }

    #[test]
    fn borrow_rate_below_optimal() {
        // half of optimal utilization -> half of optimal rate
        let rate = borrow_rate(dec!(0.4), &curve());
        assert_eq!(rate, dec!(0.05));
    }

    #[test]
    fn borrow_rate_above_optimal() {
        // 90% utilization: 0.10 + 0.90 * (0.1/0.2) = 0.55
        let rate = borrow_rate(dec!(0.9), &curve());
        assert_eq!(rate, dec!(0.55));
    }

    #[test]
    fn borrow_rate_at_max() {
        assert_eq!(borrow_rate(Decimal::ONE, &curve()), dec!(1.0));
    }

    #[test]
    fn deposit_rate_scaled_by_utilization() {
        assert_eq!(deposit_rate(dec!(0.5), dec!(0.10)), dec!(0.05));
    }

    #[test]
    fn no_accrual_without_borrows() {
        let update = compute_accrual(
            dec!(1_000_000),
            Decimal::ZERO,
            Decimal::ONE,
            Decimal::ONE,
            &curve(),
            Tick(0),
            Tick(10_000),
        );
        assert_eq!(update.deposit_index_delta, Decimal::ZERO);
        assert_eq!(update.borrow_index_delta, Decimal::ZERO);
    }

    #[test]
    fn accrual_grows_both_indices() {
        let update = compute_accrual(
            dec!(1_000_000_000),
            dec!(500_000_000),
            Decimal::ONE,
            Decimal::ONE,
            &curve(),
            Tick(0),
            Tick(1_000_000),
        );
        assert!(update.borrow_index_delta > Decimal::ZERO);
        assert!(update.deposit_index_delta > Decimal::ZERO);
        // borrowers pay more than depositors earn per unit of index
        assert!(update.borrow_index_delta > update.deposit_index_delta);
    }

    #[test]
    fn index_delta_quantized_down() {
        let delta = index_delta(Decimal::ONE, dec!(0.10), 1);
        // one tick of 10% APR is a few nano-units of index
        assert!(delta >= Decimal::ZERO);
        assert!(delta < dec!(0.00000001));
        assert_eq!(delta, delta.round_dp(INTEREST_INDEX_DP));
    }
}
