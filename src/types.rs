// 1.0: all the primitives live here. nothing in the ledger works without these types.
// IDs, ticks, token amounts, prices, balance directions. each is a newtype so the
// compiler catches type mixups.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spot and perp markets live in separate index spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketIndex(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubAccountId(pub u16);

/// Order ids are per-account counters starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OracleId(pub u32);

// Long = position gains when price goes up. Short = gains when price goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionDirection {
    Long,
    Short,
}

impl PositionDirection {
    pub fn sign(&self) -> Decimal {
        match self {
            PositionDirection::Long => dec!(1),
            PositionDirection::Short => dec!(-1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            PositionDirection::Long => PositionDirection::Short,
            PositionDirection::Short => PositionDirection::Long,
        }
    }
}

/// Which side of a spot market a position sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpotBalanceType {
    Deposit,
    Borrow,
}

impl SpotBalanceType {
    pub fn opposite(&self) -> Self {
        match self {
            SpotBalanceType::Deposit => SpotBalanceType::Borrow,
            SpotBalanceType::Borrow => SpotBalanceType::Deposit,
        }
    }
}

// 1.1: token amount in base units of a mint (e.g. lamports, micro-usdc).
// always a whole number of units; conversions from scaled balances round
// toward the market (deposits down, borrows up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount(Decimal);

impl TokenAmount {
    pub fn new(value: Decimal) -> Self {
        debug_assert!(value >= Decimal::ZERO);
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn min(&self, other: TokenAmount) -> Self {
        Self(self.0.min(other.0))
    }

    pub fn add(&self, other: TokenAmount) -> Self {
        Self(self.0 + other.0)
    }

    pub fn saturating_sub(&self, other: TokenAmount) -> Self {
        Self((self.0 - other.0).max(Decimal::ZERO))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for TokenAmount {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TokenAmount {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// 1.2: oracle price in quote currency per whole unit of the asset. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: logical clock tick. all ordering, auction windows, and oracle freshness
// are expressed in ticks; wall-clock time is only used to stamp event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick(pub i64);

impl Tick {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn advance(&self, delta: i64) -> Self {
        Self(self.0 + delta)
    }

    pub fn elapsed_since(&self, earlier: Tick) -> i64 {
        (self.0 - earlier.0).max(0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.4: millisecond wall-clock timestamp, for event records only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

// 1.5: precision constants.

/// Base-asset amounts for perp orders are expressed in 1e-9 units of the asset.
pub const BASE_PRECISION: Decimal = dec!(1_000_000_000);

/// Decimal places kept on scaled spot balances.
pub const SCALED_BALANCE_DP: u32 = 9;

/// Decimal places kept on cumulative interest indices.
pub const INTEREST_INDEX_DP: u32 = 12;

/// Ticks per year at the nominal 2 ticks/second cadence. Interest rates are
/// annualized and pro-rated against this.
pub const TICKS_PER_YEAR: i64 = 63_072_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sign_and_opposite() {
        assert_eq!(PositionDirection::Long.sign(), dec!(1));
        assert_eq!(PositionDirection::Short.sign(), dec!(-1));
        assert_eq!(PositionDirection::Long.opposite(), PositionDirection::Short);
    }

    #[test]
    fn balance_type_opposite() {
        assert_eq!(SpotBalanceType::Deposit.opposite(), SpotBalanceType::Borrow);
        assert_eq!(SpotBalanceType::Borrow.opposite(), SpotBalanceType::Deposit);
    }

    #[test]
    fn token_amount_ordering() {
        let a = TokenAmount::new(dec!(100));
        let b = TokenAmount::new(dec!(250));
        assert_eq!(a.min(b), a);
        assert_eq!(b.saturating_sub(a).value(), dec!(150));
        assert_eq!(a.saturating_sub(b).value(), dec!(0));
    }

    #[test]
    fn tick_elapsed_never_negative() {
        let t0 = Tick(100);
        let t1 = Tick(150);
        assert_eq!(t1.elapsed_since(t0), 50);
        assert_eq!(t0.elapsed_since(t1), 0);
    }
}
