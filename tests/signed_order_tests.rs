//! Signed-order settlement: atomic place-and-make, the persisted taker-order
//! path, replay protection, trigger orders, and store lifecycle.

use clearing_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const PERP: MarketIndex = MarketIndex(0);
const ORACLE: OracleId = OracleId(1);

const MAKER_KEY: Authority = Authority([3u8; 32]);
const TAKER_KEY: Authority = Authority([4u8; 32]);

struct Venue {
    ledger: Clearinghouse,
    maker: AccountId,
    taker: AccountId,
}

fn setup() -> Venue {
    let mut ledger = Clearinghouse::new(EngineConfig::default());
    ledger.initialize_perp_market(PerpMarket::new(PERP, ORACLE, "SOL-PERP"));
    ledger.set_tick(Tick(100));
    ledger.publish_oracle_price(ORACLE, Price::new_unchecked(dec!(224.3)));

    let maker = ledger.initialize_account(MAKER_KEY, SubAccountId(0));
    let taker = ledger.initialize_account(TAKER_KEY, SubAccountId(0));
    Venue {
        ledger,
        maker,
        taker,
    }
}

fn market_message(base_amount: Decimal, sequence: Tick, uuid: [u8; 8]) -> SignedOrderMessage {
    SignedOrderMessage {
        sub_account_id: SubAccountId(0),
        order_params: OrderParams::market(PERP, PositionDirection::Long, base_amount)
            .with_auction(dec!(223), dec!(224), 10)
            .with_limit_price(dec!(224)),
        sequence_number: sequence,
        uuid,
        take_profit_params: None,
        stop_loss_params: None,
    }
}

fn sign(message: &SignedOrderMessage) -> Signature {
    Sha256Signer::new(TAKER_KEY).sign(&message.to_signing_bytes())
}

fn maker_short(base_amount: Decimal, price: Decimal) -> OrderParams {
    OrderParams::limit(PERP, PositionDirection::Short, base_amount, price).post_only()
}

fn base_position(ledger: &Clearinghouse, account: AccountId) -> Decimal {
    ledger
        .account(account)
        .unwrap()
        .perp_position(PERP)
        .map(|p| p.base_asset_amount)
        .unwrap_or(Decimal::ZERO)
}

#[test]
fn place_and_make_fills_both_sides_and_doubles_on_replay() {
    let Venue {
        mut ledger,
        maker,
        taker,
    } = setup();

    let message = market_message(BASE_PRECISION * dec!(2), Tick(100), *b"uuid0001");
    let signature = sign(&message);
    let maker_params = maker_short(BASE_PRECISION, dec!(223));

    let outcome = ledger
        .place_and_make_signed_order(maker, taker, &message, &signature, &maker_params)
        .unwrap();

    assert_eq!(outcome.base_filled, BASE_PRECISION);
    assert_eq!(outcome.fill_price.value(), dec!(223));
    assert_eq!(base_position(&ledger, taker), BASE_PRECISION);
    assert_eq!(base_position(&ledger, maker), -BASE_PRECISION);

    // the correlation record's hash is the digest of the signature
    let record = ledger
        .events()
        .iter()
        .find_map(|e| e.as_signed_order())
        .unwrap();
    assert_eq!(record.hash, digest(&signature.0));
    assert_eq!(record.uuid, *b"uuid0001");

    // one fill record per counterparty
    let fills: Vec<_> = ledger.events().iter().filter_map(|e| e.as_fill()).collect();
    assert_eq!(fills.len(), 2);
    assert!(fills.iter().any(|f| f.account_id == taker && !f.is_maker));
    assert!(fills.iter().any(|f| f.account_id == maker && f.is_maker));

    // the atomic path carries no replay guard: an identical message fills
    // again, additively
    ledger
        .place_and_make_signed_order(maker, taker, &message, &signature, &maker_params)
        .unwrap();
    assert_eq!(base_position(&ledger, taker), BASE_PRECISION * dec!(2));
    assert_eq!(base_position(&ledger, maker), -BASE_PRECISION * dec!(2));
}

#[test]
fn quote_deltas_are_symmetric() {
    let Venue {
        mut ledger,
        maker,
        taker,
    } = setup();

    let message = market_message(BASE_PRECISION, Tick(100), *b"uuid0002");
    let signature = sign(&message);
    ledger
        .place_and_make_signed_order(maker, taker, &message, &signature, &maker_short(BASE_PRECISION, dec!(223)))
        .unwrap();

    let taker_quote = ledger
        .account(taker)
        .unwrap()
        .perp_position(PERP)
        .unwrap()
        .quote_asset_amount;
    let maker_quote = ledger
        .account(maker)
        .unwrap()
        .perp_position(PERP)
        .unwrap()
        .quote_asset_amount;
    // long pays 223, short receives 223
    assert_eq!(taker_quote, dec!(-223));
    assert_eq!(maker_quote, dec!(223));
}

#[test]
fn limit_taker_is_rejected_with_no_position_change() {
    let Venue {
        mut ledger,
        maker,
        taker,
    } = setup();

    let mut message = market_message(BASE_PRECISION, Tick(100), *b"uuid0003");
    message.order_params.order_type = OrderType::Limit;
    let signature = sign(&message);

    let result = ledger.place_and_make_signed_order(
        maker,
        taker,
        &message,
        &signature,
        &maker_short(BASE_PRECISION, dec!(223)),
    );
    assert!(matches!(result, Err(LedgerError::UnsupportedOrderType)));

    assert!(ledger.account(taker).unwrap().perp_position(PERP).is_none());
    assert!(ledger.account(maker).unwrap().perp_position(PERP).is_none());
    assert!(ledger.account(taker).unwrap().orders.is_empty());
}

#[test]
fn bad_signature_is_rejected() {
    let Venue {
        mut ledger,
        maker,
        taker,
    } = setup();

    let message = market_message(BASE_PRECISION, Tick(100), *b"uuid0004");
    let forged = Sha256Signer::new(Authority([9u8; 32])).sign(&message.to_signing_bytes());

    let result = ledger.place_and_make_signed_order(
        maker,
        taker,
        &message,
        &forged,
        &maker_short(BASE_PRECISION, dec!(223)),
    );
    assert!(matches!(result, Err(LedgerError::SignatureInvalid)));
}

#[test]
fn trigger_orders_rest_after_parent_fill() {
    let Venue {
        mut ledger,
        maker,
        taker,
    } = setup();

    let mut message = market_message(BASE_PRECISION, Tick(100), *b"uuid0005");
    message.take_profit_params = Some(TriggerOrderParams {
        trigger_price: dec!(240),
        base_asset_amount: BASE_PRECISION,
    });
    message.stop_loss_params = Some(TriggerOrderParams {
        trigger_price: dec!(220),
        base_asset_amount: BASE_PRECISION,
    });
    let signature = sign(&message);

    let outcome = ledger
        .place_and_make_signed_order(
            maker,
            taker,
            &message,
            &signature,
            &maker_short(BASE_PRECISION, dec!(223)),
        )
        .unwrap();

    // parent filled fully, position opened
    assert_eq!(base_position(&ledger, taker), BASE_PRECISION);
    let taker_account = ledger.account(taker).unwrap();
    let parent = taker_account.order(outcome.taker_order_id).unwrap();
    assert_eq!(parent.status, OrderStatus::Filled);

    // both triggers rest independently with fresh ids, opposite direction
    let open: Vec<_> = taker_account.open_orders().collect();
    assert_eq!(open.len(), 2);
    assert!(open.iter().all(|o| o.order_type == OrderType::TriggerLimit));
    assert!(open.iter().all(|o| o.direction == PositionDirection::Short));
    assert!(open.iter().any(|o| o.order_id == OrderId(2)
        && o.trigger_condition == Some(TriggerCondition::Above)
        && o.trigger_price == Some(dec!(240))));
    assert!(open.iter().any(|o| o.order_id == OrderId(3)
        && o.trigger_condition == Some(TriggerCondition::Below)
        && o.trigger_price == Some(dec!(220))));

    // trigger evaluation against oracle prints
    let take_profit = taker_account.order(OrderId(2)).unwrap();
    assert!(take_profit.should_trigger(Price::new_unchecked(dec!(241))));
    assert!(!take_profit.should_trigger(Price::new_unchecked(dec!(230))));
}

#[test]
fn taker_path_requires_complete_auction_params() {
    let Venue {
        mut ledger, taker, ..
    } = setup();
    ledger.initialize_order_store(taker, 32).unwrap();

    // market order with no auction at all
    let mut message = market_message(BASE_PRECISION, Tick(100), *b"uuid0006");
    message.order_params.auction_start_price = None;
    message.order_params.auction_end_price = None;
    message.order_params.auction_duration = None;
    let signature = sign(&message);
    let result = ledger.place_signed_taker_order(taker, &message, &signature);
    assert!(matches!(result, Err(LedgerError::AuctionParamsRequired)));

    // partially supplied bounds are just as invalid
    let mut message = market_message(BASE_PRECISION, Tick(100), *b"uuid0007");
    message.order_params.auction_duration = None;
    let signature = sign(&message);
    let result = ledger.place_signed_taker_order(taker, &message, &signature);
    assert!(matches!(result, Err(LedgerError::AuctionParamsRequired)));
}

#[test]
fn auction_bounds_are_not_sanitized() {
    let Venue {
        mut ledger, taker, ..
    } = setup();
    ledger.initialize_order_store(taker, 32).unwrap();

    let mut message = market_message(BASE_PRECISION * dec!(2), Tick(100), *b"uuid0008");
    message.order_params = message
        .order_params
        .clone()
        .with_auction(dec!(223), dec!(10_000), 50);
    let signature = sign(&message);

    let order_id = ledger
        .place_signed_taker_order(taker, &message, &signature)
        .unwrap();

    // the absurd end price is recorded exactly as the client signed it
    let order = ledger.account(taker).unwrap().order(order_id).unwrap();
    assert_eq!(order.auction_end_price, Some(dec!(10_000)));
    assert_eq!(order.auction_duration, Some(50));
}

#[test]
fn off_chain_auction_path_fills_once() {
    let Venue {
        mut ledger,
        maker,
        taker,
    } = setup();
    ledger.initialize_order_store(taker, 32).unwrap();

    // signed five ticks before the ledger processes it
    let message = SignedOrderMessage {
        sub_account_id: SubAccountId(0),
        order_params: OrderParams::market(PERP, PositionDirection::Long, BASE_PRECISION)
            .with_auction(dec!(223), dec!(227), 10),
        sequence_number: Tick(95),
        uuid: *b"uuid0009",
        take_profit_params: None,
        stop_loss_params: None,
    };
    let signature = sign(&message);

    let order_id = ledger
        .place_signed_taker_order(taker, &message, &signature)
        .unwrap();

    // the resting order carries the message's tick, not the ledger's
    let order = ledger.account(taker).unwrap().order(order_id).unwrap();
    assert_eq!(order.tick, Tick(95));
    assert!(order.is_open());

    // five ticks into the 223->227 ramp the auction price is 225
    let maker_params = maker_short(BASE_PRECISION, dec!(225));
    let outcome = ledger
        .place_and_make_signed_order(maker, taker, &message, &signature, &maker_params)
        .unwrap();

    // the resting order was filled: no second order materialized
    assert_eq!(outcome.taker_order_id, order_id);
    assert_eq!(outcome.fill_price.value(), dec!(225));
    assert_eq!(base_position(&ledger, taker), BASE_PRECISION);
    let order = ledger.account(taker).unwrap().order(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Filled);
}

#[test]
fn persisted_path_rejects_replay() {
    let Venue {
        mut ledger, taker, ..
    } = setup();
    ledger.initialize_order_store(taker, 32).unwrap();

    let message = market_message(BASE_PRECISION, Tick(100), *b"uuid0010");
    let signature = sign(&message);

    ledger
        .place_signed_taker_order(taker, &message, &signature)
        .unwrap();
    let replay = ledger.place_signed_taker_order(taker, &message, &signature);
    assert!(matches!(replay, Err(LedgerError::ReplayDetected(_))));
}

#[test]
fn store_must_be_initialized_and_has_fixed_capacity() {
    let Venue {
        mut ledger, taker, ..
    } = setup();

    let message = market_message(BASE_PRECISION, Tick(100), *b"uuid0011");
    let signature = sign(&message);
    let result = ledger.place_signed_taker_order(taker, &message, &signature);
    assert!(matches!(
        result,
        Err(LedgerError::ReplayStoreNotInitialized(_))
    ));

    ledger.initialize_order_store(taker, 2).unwrap();
    for (i, uuid) in [*b"cap00001", *b"cap00002"].iter().enumerate() {
        let message = market_message(BASE_PRECISION, Tick(100), *uuid);
        let signature = sign(&message);
        ledger
            .place_signed_taker_order(taker, &message, &signature)
            .unwrap_or_else(|e| panic!("order {i} rejected: {e}"));
    }

    let overflow = market_message(BASE_PRECISION, Tick(100), *b"cap00003");
    let signature = sign(&overflow);
    let result = ledger.place_signed_taker_order(taker, &overflow, &signature);
    assert!(matches!(result, Err(LedgerError::ReplayStoreFull(_))));
}

#[test]
fn deleting_the_store_cancels_resting_orders() {
    let Venue {
        mut ledger, taker, ..
    } = setup();
    ledger.initialize_order_store(taker, 32).unwrap();

    let message = market_message(BASE_PRECISION, Tick(100), *b"uuid0012");
    let signature = sign(&message);
    let order_id = ledger
        .place_signed_taker_order(taker, &message, &signature)
        .unwrap();

    ledger.delete_order_store(taker).unwrap();

    assert!(ledger.order_store(taker).is_none());
    let order = ledger.account(taker).unwrap().order(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Canceled);

    // placing again requires re-initialization
    let message = market_message(BASE_PRECISION, Tick(100), *b"uuid0013");
    let signature = sign(&message);
    assert!(matches!(
        ledger.place_signed_taker_order(taker, &message, &signature),
        Err(LedgerError::ReplayStoreNotInitialized(_))
    ));
}

#[test]
fn maker_price_outside_the_auction_does_not_cross() {
    let Venue {
        mut ledger,
        maker,
        taker,
    } = setup();

    let message = market_message(BASE_PRECISION, Tick(100), *b"uuid0014");
    let signature = sign(&message);

    // at tick 100 the auction just started at 223; a 230 ask is above the
    // taker's bound
    let result = ledger.place_and_make_signed_order(
        maker,
        taker,
        &message,
        &signature,
        &maker_short(BASE_PRECISION, dec!(230)),
    );
    assert!(matches!(result, Err(LedgerError::OrdersDoNotCross)));
    assert!(ledger.account(taker).unwrap().perp_position(PERP).is_none());
}
