// engine/core.rs: the clearinghouse. holds all markets, accounts, the
// insurance fund, the oracle feed, the injected signature verifier, and the
// event log. every mutating operation elsewhere in engine/ goes through the
// state owned here.

use super::config::EngineConfig;
use super::results::LedgerError;
use crate::account::{Account, Authority};
use crate::events::{Event, EventId, EventPayload, LiquidationRecord};
use crate::liquidation::InsuranceFund;
use crate::margin::{margin_summary, MarginSummary, MarginTier};
use crate::market::{MarketError, PerpMarket, SpotMarket, SpotMarketConfig};
use crate::price_feed::{OracleFeed, OraclePrice};
use crate::signed_order::{Sha256Verifier, SignatureVerifier, SignedOrderStore};
use crate::types::{AccountId, MarketIndex, OracleId, Price, SubAccountId, Tick, Timestamp};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Main ledger struct. All state lives here; operations are atomic against
/// it. There is no interior threading: contention between callers is
/// resolved purely by the order operations are applied in.
pub struct Clearinghouse {
    pub(super) config: EngineConfig,
    pub(super) spot_markets: HashMap<MarketIndex, SpotMarket>,
    pub(super) perp_markets: HashMap<MarketIndex, PerpMarket>,
    pub(super) accounts: HashMap<AccountId, Account>,
    pub(super) order_stores: HashMap<AccountId, SignedOrderStore>,
    pub(super) insurance_fund: InsuranceFund,
    pub(super) oracle: OracleFeed,
    pub(super) verifier: Box<dyn SignatureVerifier>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_tick: Tick,
    pub(super) current_time: Timestamp,
}

impl std::fmt::Debug for Clearinghouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clearinghouse")
            .field("spot_markets", &self.spot_markets.len())
            .field("perp_markets", &self.perp_markets.len())
            .field("accounts", &self.accounts.len())
            .field("events", &self.events.len())
            .field("current_tick", &self.current_tick)
            .finish()
    }
}

impl Clearinghouse {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_verifier(config, Box::new(Sha256Verifier))
    }

    pub fn with_verifier(config: EngineConfig, verifier: Box<dyn SignatureVerifier>) -> Self {
        let oracle = OracleFeed::new(config.oracle_max_tick_age);
        Self {
            config,
            spot_markets: HashMap::new(),
            perp_markets: HashMap::new(),
            accounts: HashMap::new(),
            order_stores: HashMap::new(),
            insurance_fund: InsuranceFund::new(),
            oracle,
            verifier,
            events: Vec::new(),
            next_event_id: 1,
            current_tick: Tick::zero(),
            current_time: Timestamp::from_millis(0),
        }
    }

    // clock

    pub fn set_tick(&mut self, tick: Tick) {
        self.current_tick = tick;
    }

    pub fn advance_tick(&mut self, delta: i64) {
        self.current_tick = self.current_tick.advance(delta);
    }

    pub fn tick(&self) -> Tick {
        self.current_tick
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    // bootstrap primitives

    pub fn initialize_spot_market(&mut self, config: SpotMarketConfig) -> MarketIndex {
        let market_index = config.market_index;
        let market = SpotMarket::new(config, self.current_tick);
        self.spot_markets.insert(market_index, market);
        market_index
    }

    pub fn initialize_perp_market(&mut self, market: PerpMarket) -> MarketIndex {
        let market_index = market.market_index;
        self.perp_markets.insert(market_index, market);
        market_index
    }

    pub fn initialize_account(
        &mut self,
        authority: Authority,
        sub_account_id: SubAccountId,
    ) -> AccountId {
        let id = AccountId(self.accounts.len() as u64 + 1);
        let account = Account::new(id, sub_account_id, authority, self.current_time);
        self.accounts.insert(id, account);
        id
    }

    // accessors

    pub fn spot_market(&self, market_index: MarketIndex) -> Option<&SpotMarket> {
        self.spot_markets.get(&market_index)
    }

    pub fn perp_market(&self, market_index: MarketIndex) -> Option<&PerpMarket> {
        self.perp_markets.get(&market_index)
    }

    pub fn account(&self, account_id: AccountId) -> Option<&Account> {
        self.accounts.get(&account_id)
    }

    pub fn order_store(&self, account_id: AccountId) -> Option<&SignedOrderStore> {
        self.order_stores.get(&account_id)
    }

    pub fn insurance_fund(&self) -> &InsuranceFund {
        &self.insurance_fund
    }

    // oracle

    pub fn publish_oracle_price(&mut self, oracle: OracleId, price: Price) {
        self.oracle
            .publish(oracle, OraclePrice::new(price, self.current_tick));
    }

    pub fn publish_oracle_update(&mut self, oracle: OracleId, update: OraclePrice) {
        self.oracle.publish(oracle, update);
    }

    pub fn oracle_price(&self, oracle: OracleId) -> Result<OraclePrice, LedgerError> {
        Ok(self.oracle.fresh_price(oracle, self.current_tick)?)
    }

    // margin

    /// Fresh oracle prices for every spot market the account touches, keyed
    /// by market index. Fails on the first stale or missing print.
    pub(super) fn collect_spot_prices(
        &self,
        account: &Account,
    ) -> Result<HashMap<MarketIndex, Price>, LedgerError> {
        let mut prices = HashMap::new();
        for position in &account.spot_positions {
            if position.is_empty() {
                continue;
            }
            let market = self
                .spot_markets
                .get(&position.market_index)
                .ok_or(MarketError::SpotMarketNotFound(position.market_index))?;
            let update = self
                .oracle
                .fresh_price(market.config.oracle_id, self.current_tick)?;
            prices.insert(position.market_index, update.price);
        }
        Ok(prices)
    }

    pub fn margin_summary_for(
        &self,
        account_id: AccountId,
        tier: MarginTier,
    ) -> Result<MarginSummary, LedgerError> {
        let account = self
            .accounts
            .get(&account_id)
            .ok_or(crate::account::AccountError::NotFound(account_id))?;
        let prices = self.collect_spot_prices(account)?;
        Ok(margin_summary(account, &self.spot_markets, &prices, tier))
    }

    pub fn margin_ratio(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        Ok(self
            .margin_summary_for(account_id, MarginTier::Maintenance)?
            .ratio())
    }

    // events

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn liquidation_records(&self) -> impl Iterator<Item = &LiquidationRecord> {
        self.events.iter().filter_map(|e| e.as_liquidation())
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(
            EventId(self.next_event_id),
            self.current_tick,
            self.current_time,
            payload,
        );
        self.next_event_id += 1;

        if self.config.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
