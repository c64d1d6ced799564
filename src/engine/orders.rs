//! Signed-order placement and atomic maker/taker settlement.
//!
//! Two entry points consume signed taker messages. `place_signed_taker_order`
//! persists the message's uuid in the account's replay store and leaves the
//! order resting for later discovery. `place_and_make_signed_order` settles
//! maker against taker in one step and performs NO replay bookkeeping of its
//! own: replaying an identical message through it yields a second independent
//! fill, unless the message was previously persisted, in which case the
//! resting order is filled instead of a new one being created.

use super::core::Clearinghouse;
use super::results::{LedgerError, SettlementOutcome};
use crate::account::AccountError;
use crate::events::{
    CancelReason, EventPayload, FillRecord, OrderCancelRecord, OrderRecord, SignedOrderRecord,
};
use crate::market::MarketError;
use crate::order::{crosses, MarketType, Order, OrderParams, OrderStatus, OrderType, TriggerCondition};
use crate::signed_order::{
    digest, Signature, SignedOrderEntry, SignedOrderMessage, SignedOrderStore,
    SignedOrderStoreError, TriggerOrderParams,
};
use crate::types::{AccountId, OrderId, PositionDirection, Price, BASE_PRECISION};
use rust_decimal::Decimal;

impl Clearinghouse {
    /// Create the fixed-capacity signed-order store for an account. Must run
    /// before the account can place signed taker orders.
    pub fn initialize_order_store(
        &mut self,
        account_id: AccountId,
        capacity: usize,
    ) -> Result<(), LedgerError> {
        if !self.accounts.contains_key(&account_id) {
            return Err(AccountError::NotFound(account_id).into());
        }
        self.order_stores
            .insert(account_id, SignedOrderStore::new(capacity));
        Ok(())
    }

    /// Tear down an account's signed-order store. Any order still resting
    /// through it is canceled.
    pub fn delete_order_store(&mut self, account_id: AccountId) -> Result<(), LedgerError> {
        let store = self
            .order_stores
            .remove(&account_id)
            .ok_or(LedgerError::ReplayStoreNotInitialized(account_id))?;

        let mut canceled = Vec::new();
        if let Some(account) = self.accounts.get_mut(&account_id) {
            for entry in store.entries() {
                if let Some(order) = account.order_mut(entry.order_id) {
                    if order.is_open() {
                        order.status = OrderStatus::Canceled;
                        canceled.push((entry.order_id, order.market_index));
                    }
                }
            }
        }
        for (order_id, market_index) in canceled {
            self.emit_event(EventPayload::OrderCanceled(OrderCancelRecord {
                account_id,
                order_id,
                market_index,
                reason: CancelReason::StoreDeleted,
            }));
        }
        Ok(())
    }

    /// Client-requested cancel of a resting order.
    pub fn cancel_order(
        &mut self,
        account_id: AccountId,
        order_id: OrderId,
    ) -> Result<(), LedgerError> {
        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(AccountError::NotFound(account_id))?;
        let order = account
            .order_mut(order_id)
            .filter(|o| o.is_open())
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        order.status = OrderStatus::Canceled;
        let market_index = order.market_index;

        self.emit_event(EventPayload::OrderCanceled(OrderCancelRecord {
            account_id,
            order_id,
            market_index,
            reason: CancelReason::UserRequested,
        }));
        Ok(())
    }

    fn check_order_market(&self, params: &OrderParams) -> Result<(), LedgerError> {
        match params.market_type {
            MarketType::Perp if !self.perp_markets.contains_key(&params.market_index) => {
                Err(MarketError::PerpMarketNotFound(params.market_index).into())
            }
            MarketType::Spot if !self.spot_markets.contains_key(&params.market_index) => {
                Err(MarketError::SpotMarketNotFound(params.market_index).into())
            }
            _ => Ok(()),
        }
    }

    /// Verify a signed message against the taker's authority. Returns the
    /// replay identity digest of the signature.
    fn verify_signed_message(
        &self,
        taker_id: AccountId,
        message: &SignedOrderMessage,
        signature: &Signature,
    ) -> Result<[u8; 32], LedgerError> {
        let taker = self
            .accounts
            .get(&taker_id)
            .ok_or(AccountError::NotFound(taker_id))?;
        if taker.sub_account_id != message.sub_account_id {
            return Err(AccountError::SubAccountMismatch.into());
        }
        let bytes = message.to_signing_bytes();
        if !self.verifier.verify(&bytes, signature, &taker.authority) {
            return Err(LedgerError::SignatureInvalid);
        }
        Ok(digest(&signature.0))
    }

    /// Place a signed taker order as a resting order, persisting its uuid
    /// for replay protection. The order's tick is the message's sequence
    /// number, so a later fill evaluates the auction from the moment the
    /// client signed, not the moment the ledger saw the message.
    pub fn place_signed_taker_order(
        &mut self,
        taker_id: AccountId,
        message: &SignedOrderMessage,
        signature: &Signature,
    ) -> Result<OrderId, LedgerError> {
        let hash = self.verify_signed_message(taker_id, message, signature)?;

        let params = &message.order_params;
        if params.order_type == OrderType::Market && !params.has_complete_auction()
            || params.has_partial_auction()
        {
            return Err(LedgerError::AuctionParamsRequired);
        }
        self.check_order_market(params)?;

        let store = self
            .order_stores
            .get(&taker_id)
            .ok_or(LedgerError::ReplayStoreNotInitialized(taker_id))?;
        if store.contains_uuid(&message.uuid) {
            return Err(LedgerError::ReplayDetected(taker_id));
        }
        if store.len() >= store.capacity() {
            return Err(LedgerError::ReplayStoreFull(taker_id));
        }

        // commit: order first, then the replay entry that references it
        let account = self.accounts.get_mut(&taker_id).unwrap();
        let order_id = account.take_order_id();
        let order = Order::from_params(order_id, params, message.sequence_number);
        account.orders.push(order);

        let entry = SignedOrderEntry {
            uuid: message.uuid,
            hash,
            sequence_number: message.sequence_number,
            order_id,
        };
        match self.order_stores.get_mut(&taker_id).unwrap().insert(entry) {
            Ok(()) => {}
            Err(SignedOrderStoreError::Replay) => return Err(LedgerError::ReplayDetected(taker_id)),
            Err(SignedOrderStoreError::Full(_)) => return Err(LedgerError::ReplayStoreFull(taker_id)),
        }

        self.emit_event(EventPayload::OrderPlaced(OrderRecord {
            account_id: taker_id,
            order_id,
            market_index: params.market_index,
            direction: params.direction,
            base_asset_amount: params.base_asset_amount,
            price: params.price,
        }));

        Ok(order_id)
    }

    /// Atomically place the maker's resting limit order and cross it against
    /// the signed taker order, producing symmetric position deltas and one
    /// fill record per counterparty. Deliberately not replay-guarded (see
    /// module docs).
    pub fn place_and_make_signed_order(
        &mut self,
        maker_id: AccountId,
        taker_id: AccountId,
        message: &SignedOrderMessage,
        signature: &Signature,
        maker_params: &OrderParams,
    ) -> Result<SettlementOutcome, LedgerError> {
        // -- check --------------------------------------------------------

        let hash = self.verify_signed_message(taker_id, message, signature)?;
        if !self.accounts.contains_key(&maker_id) {
            return Err(AccountError::NotFound(maker_id).into());
        }

        let taker_params = &message.order_params;
        if taker_params.order_type != OrderType::Market {
            return Err(LedgerError::UnsupportedOrderType);
        }
        if taker_params.has_partial_auction() {
            return Err(LedgerError::AuctionParamsRequired);
        }
        if maker_params.order_type != OrderType::Limit {
            return Err(LedgerError::UnsupportedOrderType);
        }
        if maker_params.direction != taker_params.direction.opposite() {
            return Err(LedgerError::OrdersDoNotCross);
        }
        self.check_order_market(taker_params)?;

        // a message previously persisted through the taker-order path is
        // settled against its resting order; otherwise the taker order is
        // materialized fresh from the message
        let existing_order_id = self
            .order_stores
            .get(&taker_id)
            .and_then(|store| store.find_by_uuid(&message.uuid))
            .map(|entry| entry.order_id);

        let taker_order_preview = match existing_order_id {
            Some(order_id) => {
                let taker = self.accounts.get(&taker_id).unwrap();
                let order = taker
                    .order(order_id)
                    .filter(|o| o.is_open())
                    .ok_or(LedgerError::OrderNotFound(order_id))?;
                order.clone()
            }
            None => Order::from_params(OrderId(0), taker_params, message.sequence_number),
        };

        let maker_price = Price::new(maker_params.price).ok_or(LedgerError::OrdersDoNotCross)?;
        if let Some(bound) = taker_order_preview.limit_price_at(self.current_tick) {
            if !crosses(taker_order_preview.direction, bound, maker_price) {
                return Err(LedgerError::OrdersDoNotCross);
            }
        }

        let fill_base = taker_order_preview
            .remaining()
            .min(maker_params.base_asset_amount);
        if fill_base <= Decimal::ZERO {
            return Err(LedgerError::OrdersDoNotCross);
        }

        // -- commit -------------------------------------------------------

        let market_index = taker_params.market_index;

        // taker order: reuse the resting one or materialize it
        let taker_account = self.accounts.get_mut(&taker_id).unwrap();
        let taker_order_id = match existing_order_id {
            Some(order_id) => order_id,
            None => {
                let order_id = taker_account.take_order_id();
                let order = Order::from_params(order_id, taker_params, message.sequence_number);
                taker_account.orders.push(order);
                order_id
            }
        };
        let taker_order = taker_account.order_mut(taker_order_id).unwrap();
        let first_fill = taker_order.base_asset_amount_filled.is_zero();
        taker_order.fill(fill_base);
        let taker_direction = taker_order.direction;

        // maker order: placed and crossed in the same step; any remainder is
        // canceled rather than left resting
        let maker_account = self.accounts.get_mut(&maker_id).unwrap();
        let maker_order_id = maker_account.take_order_id();
        let mut maker_order = Order::from_params(maker_order_id, maker_params, self.current_tick);
        maker_order.fill(fill_base);
        let maker_remainder_canceled = if maker_order.remaining() > Decimal::ZERO {
            maker_order.status = OrderStatus::Canceled;
            true
        } else {
            false
        };
        maker_account.orders.push(maker_order);

        // symmetric position deltas
        let quote_delta = fill_base * maker_price.value() / BASE_PRECISION;
        self.settle_perp_fill(taker_id, market_index, taker_direction, fill_base, quote_delta);
        self.settle_perp_fill(
            maker_id,
            market_index,
            taker_direction.opposite(),
            fill_base,
            quote_delta,
        );

        // trigger sub-orders arm on the parent's first fill and survive it
        if first_fill {
            let take_profit = message.take_profit_params;
            let stop_loss = message.stop_loss_params;
            if let Some(params) = take_profit {
                self.attach_trigger_order(taker_id, message, &params, true);
            }
            if let Some(params) = stop_loss {
                self.attach_trigger_order(taker_id, message, &params, false);
            }
        }

        // events: one fill per counterparty plus the correlation record
        self.emit_event(EventPayload::OrderPlaced(OrderRecord {
            account_id: maker_id,
            order_id: maker_order_id,
            market_index,
            direction: taker_direction.opposite(),
            base_asset_amount: maker_params.base_asset_amount,
            price: maker_params.price,
        }));
        if maker_remainder_canceled {
            self.emit_event(EventPayload::OrderCanceled(OrderCancelRecord {
                account_id: maker_id,
                order_id: maker_order_id,
                market_index,
                reason: CancelReason::MakerUnfilledRemainder,
            }));
        }
        self.emit_event(EventPayload::Fill(FillRecord {
            market_index,
            account_id: taker_id,
            order_id: taker_order_id,
            direction: taker_direction,
            base_asset_amount: fill_base,
            price: maker_price,
            is_maker: false,
        }));
        self.emit_event(EventPayload::Fill(FillRecord {
            market_index,
            account_id: maker_id,
            order_id: maker_order_id,
            direction: taker_direction.opposite(),
            base_asset_amount: fill_base,
            price: maker_price,
            is_maker: true,
        }));
        self.emit_event(EventPayload::SignedOrder(SignedOrderRecord {
            taker_account_id: taker_id,
            taker_order_id,
            uuid: message.uuid,
            hash,
        }));

        Ok(SettlementOutcome {
            taker_order_id,
            maker_order_id,
            fill_price: maker_price,
            base_filled: fill_base,
            hash,
        })
    }

    fn settle_perp_fill(
        &mut self,
        account_id: AccountId,
        market_index: crate::types::MarketIndex,
        direction: PositionDirection,
        base: Decimal,
        quote: Decimal,
    ) {
        let account = self.accounts.get_mut(&account_id).unwrap();
        let position = account.perp_position_mut_or_new(market_index);
        position.base_asset_amount += direction.sign() * base;
        // longs pay quote for base, shorts receive it
        position.quote_asset_amount -= direction.sign() * quote;
    }

    /// Materialize an embedded take-profit/stop-loss as a resting
    /// trigger-limit order: fresh id, opposite direction to the parent, and
    /// the condition implied by which side of the parent it protects.
    fn attach_trigger_order(
        &mut self,
        account_id: AccountId,
        message: &SignedOrderMessage,
        trigger: &TriggerOrderParams,
        is_take_profit: bool,
    ) {
        let parent = &message.order_params;
        let condition = match (parent.direction, is_take_profit) {
            (PositionDirection::Long, true) => TriggerCondition::Above,
            (PositionDirection::Long, false) => TriggerCondition::Below,
            (PositionDirection::Short, true) => TriggerCondition::Below,
            (PositionDirection::Short, false) => TriggerCondition::Above,
        };

        let params = OrderParams {
            market_index: parent.market_index,
            market_type: parent.market_type,
            order_type: OrderType::TriggerLimit,
            direction: parent.direction.opposite(),
            base_asset_amount: trigger.base_asset_amount,
            price: trigger.trigger_price,
            auction_start_price: None,
            auction_end_price: None,
            auction_duration: None,
            post_only: crate::order::PostOnlyParam::None,
            trigger_price: Some(trigger.trigger_price),
            trigger_condition: Some(condition),
        };

        let account = self.accounts.get_mut(&account_id).unwrap();
        let order_id = account.take_order_id();
        let order = Order::from_params(order_id, &params, self.current_tick);
        account.orders.push(order);

        self.emit_event(EventPayload::OrderPlaced(OrderRecord {
            account_id,
            order_id,
            market_index: params.market_index,
            direction: params.direction,
            base_asset_amount: params.base_asset_amount,
            price: params.price,
        }));
    }
}
