/// End-to-end engine scenarios
///
/// Every test drives a fresh engine with a ManualClock, so expiry and oracle
/// timing are deterministic.

use std::sync::Arc;

use unified_markets::market_resolve::fixed::mul_div_floor;
use unified_markets::{
    Engine, EngineConfig, ManualClock, MarketError, MarketStatus, OracleResult, Side, COLLATERAL_UNIT, RAY,
};

// ============================================================================
// HELPERS
// ============================================================================

const START: u64 = 1_750_000_000;
const HOUR: u64 = 3_600;
const UNIT: u128 = COLLATERAL_UNIT;

fn setup() -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let config = EngineConfig {
        genesis_pool_liquidity: 100_000 * UNIT,
        ..EngineConfig::default()
    };
    let engine = Engine::new(config, clock.clone()).unwrap();
    for trader in ["bob", "carol", "dave"] {
        engine.mint("admin", trader, 1_000 * UNIT).unwrap();
    }
    (engine, clock)
}

fn assert_reserve_identity(engine: &Engine, market_id: &str) {
    let reserve = engine.reserve_of(market_id).unwrap();
    let info = engine.get_market_info(market_id).unwrap();
    assert_eq!(reserve.reserve_yes + info.total_yes, reserve.collateral_locked);
    assert_eq!(reserve.reserve_no + info.total_no, reserve.collateral_locked);
}

fn assert_prices_sum_to_one(engine: &Engine, market_id: &str) {
    let yes = engine.get_price_yes(market_id).unwrap();
    let no = engine.get_price_no(market_id).unwrap();
    assert_eq!(yes + no, RAY);
}

// ============================================================================
// FULL LIFECYCLE
// ============================================================================

#[test]
fn test_market_lifecycle_yes_wins() {
    let (engine, clock) = setup();
    let id = engine.create_market("alice", "Will ETH close above 5k?", START + HOUR).unwrap();
    assert_eq!(engine.get_price_yes(&id).unwrap(), RAY / 2);

    let bought = engine.buy_yes(&id, "bob", 100 * UNIT, 0, "bob").unwrap();
    assert_eq!(bought.amount_out, 190_909_090_909_090_909_090);
    assert!(engine.get_price_yes(&id).unwrap() > RAY / 2);
    assert_prices_sum_to_one(&engine, &id);

    let hedge = engine.buy_no(&id, "carol", 50 * UNIT, 0, "carol").unwrap();
    assert!(hedge.amount_out > 0);
    assert_reserve_identity(&engine, &id);

    clock.advance(HOUR);
    assert_eq!(engine.get_market_info(&id).unwrap().status, MarketStatus::Expired);
    assert_eq!(
        engine.buy_yes(&id, "dave", UNIT, 0, "dave"),
        Err(MarketError::MarketExpired(id.clone()))
    );

    assert_eq!(engine.settle(&id), Err(MarketError::ResultNotAvailable(id.clone())));
    engine.publish_result("admin", &id, OracleResult::Yes).unwrap();
    let settlement = engine.settle(&id).unwrap();
    assert_eq!(settlement.result, OracleResult::Yes);

    let bob_before = engine.balance_of("bob");
    let bob = engine.redeem(&id, "bob").unwrap();
    assert_eq!(bob.payout, bought.amount_out);
    assert_eq!(engine.balance_of("bob"), bob_before + bought.amount_out);

    let carol = engine.redeem(&id, "carol").unwrap();
    assert_eq!(carol.payout, 0);
    assert_eq!(carol.no_burned, hedge.amount_out);

    let info = engine.get_market_info(&id).unwrap();
    assert_eq!(info.total_yes, 0);
    assert_eq!(info.total_no, 0);
    assert!(info.settled);
    assert_eq!(info.result, Some(OracleResult::Yes));
}

#[test]
fn test_settle_twice_leaves_state_identical() {
    let (engine, clock) = setup();
    let id = engine.create_market("alice", "Q", START + HOUR).unwrap();
    engine.buy_no(&id, "bob", 10 * UNIT, 0, "bob").unwrap();

    clock.advance(HOUR + 1);
    engine.publish_result("admin", &id, OracleResult::No).unwrap();
    engine.settle(&id).unwrap();

    let info = engine.get_market_info(&id).unwrap();
    let reserve = engine.reserve_of(&id).unwrap();

    clock.advance(HOUR);
    assert_eq!(engine.settle(&id), Err(MarketError::AlreadySettled(id.clone())));
    assert_eq!(engine.get_market_info(&id).unwrap(), info);
    assert_eq!(engine.reserve_of(&id).unwrap(), reserve);
}

#[test]
fn test_settle_before_deadline() {
    let (engine, clock) = setup();
    let id = engine.create_market("alice", "Q", START + HOUR).unwrap();

    assert_eq!(engine.settle(&id), Err(MarketError::MarketNotExpired(id.clone())));
    assert!(matches!(
        engine.publish_result("admin", &id, OracleResult::Yes),
        Err(MarketError::TooEarly { .. })
    ));
    assert!(matches!(engine.redeem(&id, "bob"), Err(MarketError::MarketNotSettled(_))));

    clock.set(START + HOUR);
    engine.publish_result("admin", &id, OracleResult::Yes).unwrap();
    assert!(matches!(
        engine.publish_result("admin", &id, OracleResult::No),
        Err(MarketError::AlreadyPublished(_))
    ));
    assert_eq!(engine.get_result(&id).unwrap().result, OracleResult::Yes);
}

#[test]
fn test_invalid_result_refunds_at_settlement_price() {
    let (engine, clock) = setup();
    let id = engine.create_market("alice", "Q", START + HOUR).unwrap();
    let yes = engine.buy_yes(&id, "bob", 200 * UNIT, 0, "bob").unwrap();
    let no = engine.buy_no(&id, "carol", 80 * UNIT, 0, "carol").unwrap();
    let price_yes = engine.get_price_yes(&id).unwrap();

    clock.advance(HOUR);
    engine.publish_result("admin", &id, OracleResult::Invalid).unwrap();
    engine.settle(&id).unwrap();
    assert_eq!(engine.get_price_yes(&id).unwrap(), price_yes);

    let bob = engine.redeem(&id, "bob").unwrap();
    let carol = engine.redeem(&id, "carol").unwrap();

    assert_eq!(bob.payout, mul_div_floor(yes.amount_out, price_yes, RAY).unwrap());
    assert_eq!(carol.payout, mul_div_floor(no.amount_out, RAY - price_yes, RAY).unwrap());
    assert!(bob.payout > 0 && carol.payout > 0);
    assert!(carol.payout <= no.amount_out);

    let solvency = engine.solvency(&id).unwrap();
    assert!(solvency.solvent);
}

// ============================================================================
// ALL-OR-NOTHING TRADES
// ============================================================================

#[test]
fn test_slippage_leaves_balances_unchanged() {
    let (engine, _) = setup();
    let id = engine.create_market("alice", "Q", START + HOUR).unwrap();
    let quote = engine.quote(&id, Side::Yes, 100 * UNIT).unwrap();
    let reserve = engine.reserve_of(&id).unwrap();

    let err = engine
        .buy_yes(&id, "bob", 100 * UNIT, quote.amount_out + 1, "bob")
        .unwrap_err();
    assert_eq!(
        err,
        MarketError::SlippageExceeded { quoted: quote.amount_out, min_out: quote.amount_out + 1 }
    );
    assert_eq!(engine.balance_of("bob"), 1_000 * UNIT);
    assert_eq!(engine.reserve_of(&id).unwrap(), reserve);
    assert!(engine.position(&id, "bob").unwrap().is_empty());

    let filled = engine.buy_yes(&id, "bob", 100 * UNIT, quote.amount_out, "bob").unwrap();
    assert_eq!(filled.amount_out, quote.amount_out);
}

#[test]
fn test_recipient_receives_shares() {
    let (engine, _) = setup();
    let id = engine.create_market("alice", "Q", START + HOUR).unwrap();
    let quote = engine.buy_no(&id, "bob", 5 * UNIT, 0, "dave").unwrap();

    assert_eq!(engine.position(&id, "dave").unwrap().no, quote.amount_out);
    assert!(engine.position(&id, "bob").unwrap().is_empty());
    assert_eq!(engine.balance_of("bob"), 995 * UNIT);
}

// ============================================================================
// INVARIANTS
// ============================================================================

#[test]
fn test_invariants_hold_across_trade_sequence() {
    let (engine, _) = setup();
    let id = engine.create_market("alice", "Q", START + HOUR).unwrap();

    let mut seed: u64 = 0x5eed;
    let mut last_yes = 0;
    let mut last_no = 0;
    for _ in 0..60 {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let amount = ((seed >> 33) % 20 + 1) as u128 * UNIT / 4;
        let trader = ["bob", "carol", "dave"][(seed % 3) as usize];
        let side = if seed & 0x10 == 0 { Side::Yes } else { Side::No };

        engine.trade(&id, unified_markets::TradeRequest {
            side,
            amount_in: amount,
            min_out: 0,
            payer: trader.to_string(),
            recipient: trader.to_string(),
        })
        .unwrap();

        assert_prices_sum_to_one(&engine, &id);
        assert_reserve_identity(&engine, &id);

        let info = engine.get_market_info(&id).unwrap();
        assert!(info.total_yes >= last_yes && info.total_no >= last_no);
        last_yes = info.total_yes;
        last_no = info.total_no;

        let solvency = engine.solvency(&id).unwrap();
        assert!(solvency.collateral_locked >= solvency.owed_to_best_guess);
        assert!(solvency.solvent);
    }
}

#[test]
fn test_mint_burn() {
    let (engine, _) = setup();
    engine.mint("admin", "owner", 1_000).unwrap();
    engine.burn("admin", "owner", 500).unwrap();
    assert_eq!(engine.balance_of("owner"), 500);

    let before = engine.balance_of("bob");
    engine.mint("admin", "bob", 42).unwrap();
    engine.burn("admin", "bob", 42).unwrap();
    assert_eq!(engine.balance_of("bob"), before);

    assert!(matches!(engine.mint("bob", "bob", 1), Err(MarketError::Unauthorized(_))));
}

#[test]
fn test_markets_cannot_drain_each_other() {
    let (engine, clock) = setup();
    let a = engine.create_market("alice", "A", START + HOUR).unwrap();
    let b = engine.create_market("alice", "B", START + HOUR).unwrap();
    let bought = engine.buy_yes(&a, "bob", 300 * UNIT, 0, "bob").unwrap();

    clock.advance(HOUR);
    engine.publish_result("admin", &a, OracleResult::Yes).unwrap();
    engine.publish_result("admin", &b, OracleResult::Yes).unwrap();
    engine.settle(&a).unwrap();
    engine.settle(&b).unwrap();

    let locked_b = engine.reserve_of(&b).unwrap().collateral_locked;
    assert_eq!(engine.redeem(&a, "bob").unwrap().payout, bought.amount_out);
    assert_eq!(engine.reserve_of(&b).unwrap().collateral_locked, locked_b);
}

// ============================================================================
// FACTORY & CURSOR
// ============================================================================

#[test]
fn test_list_markets_is_lazy() {
    let (engine, _) = setup();
    assert!(matches!(
        engine.create_market("alice", "Q", START),
        Err(MarketError::InvalidResolveTime { .. })
    ));

    let first = engine.create_market("alice", "First", START + HOUR).unwrap();
    let mut cursor = engine.list_markets();
    assert_eq!(cursor.next().as_deref(), Some(first.as_str()));

    let second = engine.create_market("alice", "Second", START + HOUR).unwrap();
    assert_eq!(cursor.next().as_deref(), Some(second.as_str()));
    assert_eq!(cursor.next(), None);

    cursor.restart();
    assert_eq!(cursor.count(), 2);
}

#[test]
fn test_liquidity_provision_funds_new_markets() {
    let clock = Arc::new(ManualClock::new(START));
    let config = EngineConfig { seed_liquidity: 500 * UNIT, ..EngineConfig::default() };
    let engine = Engine::new(config, clock).unwrap();

    assert!(matches!(
        engine.create_market("alice", "Q", START + HOUR),
        Err(MarketError::PoolUnderfunded(_))
    ));

    engine.mint("admin", "lp", 600 * UNIT).unwrap();
    engine.deposit_liquidity("lp", 600 * UNIT).unwrap();
    engine.create_market("alice", "Q", START + HOUR).unwrap();
    assert_eq!(engine.free_liquidity(), 100 * UNIT);

    assert!(matches!(
        engine.withdraw_liquidity("lp", 200 * UNIT),
        Err(MarketError::PoolUnderfunded(_))
    ));
    engine.withdraw_liquidity("lp", 100 * UNIT).unwrap();
    assert_eq!(engine.balance_of("lp"), 100 * UNIT);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_concurrent_buys_preserve_solvency() {
    let (engine, _) = setup();
    let id = engine.create_market("alice", "Q", START + HOUR).unwrap();
    let traders: Vec<String> = (0..8).map(|i| format!("trader{}", i)).collect();
    for trader in &traders {
        engine.mint("admin", trader, 100 * UNIT).unwrap();
    }

    std::thread::scope(|scope| {
        for (i, trader) in traders.iter().enumerate() {
            let engine = &engine;
            let id = &id;
            scope.spawn(move || {
                for round in 0..10 {
                    let result = if (i + round) % 2 == 0 {
                        engine.buy_yes(id, trader, UNIT, 0, trader)
                    } else {
                        engine.buy_no(id, trader, UNIT, 0, trader)
                    };
                    result.unwrap();
                    let _ = engine.get_price_yes(id).unwrap();
                }
            });
        }
    });

    let reserve = engine.reserve_of(&id).unwrap();
    assert_eq!(reserve.collateral_locked, 1_000 * UNIT + 80 * UNIT);
    assert_reserve_identity(&engine, &id);
    assert_prices_sum_to_one(&engine, &id);
    for trader in &traders {
        assert_eq!(engine.balance_of(trader), 90 * UNIT);
    }
    assert_eq!(engine.get_market_info(&id).unwrap().trade_count, 80);
}
