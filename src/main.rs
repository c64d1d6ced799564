//! Clearinghouse Core Simulation.
//!
//! Demonstrates the full ledger lifecycle: market bootstrap, interest-bearing
//! deposits and borrows, a price shock, liquidation, bankruptcy resolution
//! with social loss, and signed-order settlement with trigger orders.

use clearing_core::*;
use rust_decimal_macros::dec;

fn main() {
    println!("Margin Clearinghouse Core Simulation");
    println!("Spot Ledger, Liquidation, Social Loss, Signed Orders\n");

    scenario_1_liquidation_and_social_loss();
    scenario_2_signed_order_settlement();
    scenario_3_replay_protection();

    println!("\nAll simulations completed successfully.");
}

/// Price shock drives a borrower under water; a liquidator steps in, the
/// residual debt goes bankrupt and is socialized across depositors.
fn scenario_1_liquidation_and_social_loss() {
    println!("Scenario 1: Liquidation and Social Loss\n");

    let mut ledger = Clearinghouse::new(EngineConfig::default());
    ledger.set_time(Timestamp::now());
    ledger.initialize_spot_market(SpotMarketConfig::quote(MarketIndex(0), OracleId(0)));
    ledger.initialize_spot_market(SpotMarketConfig::base(MarketIndex(1), OracleId(1), "SOL"));
    ledger.publish_oracle_price(OracleId(0), Price::new_unchecked(dec!(1)));
    ledger.publish_oracle_price(OracleId(1), Price::new_unchecked(dec!(100)));

    let borrower = ledger.initialize_account(Authority([1u8; 32]), SubAccountId(0));
    let liquidator = ledger.initialize_account(Authority([2u8; 32]), SubAccountId(0));

    ledger
        .deposit(borrower, MarketIndex(0), TokenAmount::new(dec!(100_000_000)))
        .unwrap();
    ledger
        .deposit(liquidator, MarketIndex(1), TokenAmount::new(dec!(1_000_000_000)))
        .unwrap();
    println!("  Borrower deposits 100 USDC, liquidator deposits 1 SOL");

    ledger
        .withdraw(borrower, MarketIndex(1), TokenAmount::new(dec!(500_000_000)))
        .unwrap();
    println!("  Borrower borrows 0.5 SOL at $100\n");

    // interest accrues, then the price doubles
    ledger.advance_tick(10_000);
    ledger.publish_oracle_price(OracleId(0), Price::new_unchecked(dec!(1)));
    ledger.publish_oracle_price(OracleId(1), Price::new_unchecked(dec!(200)));
    println!("  SOL doubles to $200; margin ratio: {:.4}", ledger.margin_ratio(borrower).unwrap());

    let outcome = ledger
        .liquidate_spot(
            liquidator,
            borrower,
            MarketIndex(0),
            MarketIndex(1),
            TokenAmount::new(dec!(600_000_000)),
        )
        .unwrap();
    println!(
        "  Liquidated: liability {} assumed for asset {}, insurance fee {}",
        outcome.liability_transfer, outcome.asset_transfer, outcome.if_fee
    );
    println!("  Borrower bankrupt: {}", outcome.victim_bankrupt);

    let market_before = ledger.spot_market(MarketIndex(1)).unwrap().clone();
    let resolution = ledger
        .resolve_spot_bankruptcy(liquidator, borrower, MarketIndex(1))
        .unwrap();
    let market_after = ledger.spot_market(MarketIndex(1)).unwrap();
    println!(
        "  Bankruptcy forgave {} base units, deposit index {} -> {}",
        resolution.borrow_amount,
        market_before.cumulative_deposit_interest,
        market_after.cumulative_deposit_interest
    );
    println!(
        "  Net market balance: {} -> {}\n",
        market_before.net_token_balance(),
        market_after.net_token_balance()
    );
}

/// A maker crosses a signed market-order message with attached take-profit
/// and stop-loss triggers.
fn scenario_2_signed_order_settlement() {
    println!("Scenario 2: Signed-Order Settlement\n");

    let mut ledger = Clearinghouse::new(EngineConfig::default());
    ledger.set_time(Timestamp::now());
    ledger.initialize_perp_market(PerpMarket::new(MarketIndex(0), OracleId(1), "SOL-PERP"));
    ledger.set_tick(Tick(100));
    ledger.publish_oracle_price(OracleId(1), Price::new_unchecked(dec!(224.3)));

    let maker_authority = Authority([3u8; 32]);
    let taker_authority = Authority([4u8; 32]);
    let maker = ledger.initialize_account(maker_authority, SubAccountId(0));
    let taker = ledger.initialize_account(taker_authority, SubAccountId(0));

    let message = SignedOrderMessage {
        sub_account_id: SubAccountId(0),
        order_params: OrderParams::market(MarketIndex(0), PositionDirection::Long, BASE_PRECISION)
            .with_auction(dec!(223), dec!(224), 10),
        sequence_number: Tick(100),
        uuid: *b"sim-0001",
        take_profit_params: Some(TriggerOrderParams {
            trigger_price: dec!(240),
            base_asset_amount: BASE_PRECISION,
        }),
        stop_loss_params: Some(TriggerOrderParams {
            trigger_price: dec!(220),
            base_asset_amount: BASE_PRECISION,
        }),
    };
    let signature = Sha256Signer::new(taker_authority).sign(&message.to_signing_bytes());

    let maker_params =
        OrderParams::limit(MarketIndex(0), PositionDirection::Short, BASE_PRECISION, dec!(223))
            .post_only();

    let outcome = ledger
        .place_and_make_signed_order(maker, taker, &message, &signature, &maker_params)
        .unwrap();
    println!(
        "  Filled {} base at {} (taker order {:?})",
        outcome.base_filled, outcome.fill_price, outcome.taker_order_id
    );

    let taker_account = ledger.account(taker).unwrap();
    let position = taker_account.perp_position(MarketIndex(0)).unwrap();
    println!("  Taker position: {} base units", position.base_asset_amount);
    println!(
        "  Open trigger orders: {}\n",
        taker_account.open_orders().count()
    );
}

/// The persisted taker-order path rejects replays; the atomic path does not.
fn scenario_3_replay_protection() {
    println!("Scenario 3: Replay Protection\n");

    let mut ledger = Clearinghouse::new(EngineConfig::default());
    ledger.initialize_perp_market(PerpMarket::new(MarketIndex(0), OracleId(1), "SOL-PERP"));
    ledger.publish_oracle_price(OracleId(1), Price::new_unchecked(dec!(224)));

    let taker_authority = Authority([5u8; 32]);
    let taker = ledger.initialize_account(taker_authority, SubAccountId(0));
    ledger.initialize_order_store(taker, 32).unwrap();

    let message = SignedOrderMessage {
        sub_account_id: SubAccountId(0),
        order_params: OrderParams::market(MarketIndex(0), PositionDirection::Long, BASE_PRECISION)
            .with_auction(dec!(223), dec!(227), 10),
        sequence_number: Tick(0),
        uuid: *b"sim-0002",
        take_profit_params: None,
        stop_loss_params: None,
    };
    let signature = Sha256Signer::new(taker_authority).sign(&message.to_signing_bytes());

    let order_id = ledger
        .place_signed_taker_order(taker, &message, &signature)
        .unwrap();
    println!("  Signed taker order placed as {:?}", order_id);

    let replay = ledger.place_signed_taker_order(taker, &message, &signature);
    println!("  Replay rejected: {}", replay.unwrap_err());

    ledger.delete_order_store(taker).unwrap();
    let order = ledger.account(taker).unwrap().order(order_id).unwrap();
    println!("  Store deleted, resting order now {:?}", order.status);
}
