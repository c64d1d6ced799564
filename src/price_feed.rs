// Price feed integration.
//
// The ledger is agnostic to where prices come from — Pyth, a CEX aggregator,
// or a custom oracle. Whatever publishes into the feed must already have
// aggregated its sources; the ledger only checks freshness and reads
// (price, confidence, last_update_tick).

use crate::types::{OracleId, Price, Tick};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One oracle print.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OraclePrice {
    pub price: Price,
    /// Confidence interval around the price, if the source provides one.
    pub confidence: Option<Decimal>,
    pub last_update_tick: Tick,
}

impl OraclePrice {
    pub fn new(price: Price, last_update_tick: Tick) -> Self {
        Self {
            price,
            confidence: None,
            last_update_tick,
        }
    }

    pub fn with_confidence(mut self, confidence: Decimal) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn is_stale(&self, now: Tick, max_tick_age: i64) -> bool {
        now.elapsed_since(self.last_update_tick) > max_tick_age
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("No price published for oracle {0:?}")]
    NoPrice(OracleId),

    #[error("Oracle {oracle:?} price is {age} ticks old, max {max_age}")]
    Stale {
        oracle: OracleId,
        age: i64,
        max_age: i64,
    },
}

/// In-memory oracle store. Operations that value collateral read through
/// `fresh_price` and fail rather than proceed on an out-of-date print.
#[derive(Debug, Clone, Default)]
pub struct OracleFeed {
    prices: HashMap<OracleId, OraclePrice>,
    /// Maximum tick age before a print is rejected.
    pub max_tick_age: i64,
}

impl OracleFeed {
    pub fn new(max_tick_age: i64) -> Self {
        Self {
            prices: HashMap::new(),
            max_tick_age,
        }
    }

    pub fn publish(&mut self, oracle: OracleId, update: OraclePrice) {
        self.prices.insert(oracle, update);
    }

    pub fn latest(&self, oracle: OracleId) -> Option<&OraclePrice> {
        self.prices.get(&oracle)
    }

    /// The current print, rejecting stale data.
    pub fn fresh_price(&self, oracle: OracleId, now: Tick) -> Result<OraclePrice, OracleError> {
        let update = self.prices.get(&oracle).ok_or(OracleError::NoPrice(oracle))?;
        let age = now.elapsed_since(update.last_update_tick);
        if age > self.max_tick_age {
            return Err(OracleError::Stale {
                oracle,
                age,
                max_age: self.max_tick_age,
            });
        }
        Ok(*update)
    }
}
