//! Pricing, tick, and market-model tests.

use approx::assert_relative_eq;
use citrine_process::{ConstantProcess, ProcessTracer};
use citrine_reactor::{CollectSink, Reactor, SimEvent};
use citrine_types::{SimDuration, Timestamp};
use test_case::test_case;

use crate::{
    Callput, MarketError, MarketModelConfig, OptionStrikeSet, Price, PricingContext, Px2, Pxtick,
    Side, StrikePair, StrikeSetMarketModel, pricing,
};

fn t0() -> Timestamp {
    Timestamp::ymd_midnight(20220909).expect("valid date")
}

// ============================================================================
// Black-Scholes
// ============================================================================

// Reference values for at-the-money options (K = S = 1, r = 0, σ = 0.3).
#[test_case(Callput::Call, 1.0 / 365.25, 6.26227e-3, 0.503131, 25.413850, 0.0208738, -1.1436235, 0.001360353 ; "call 1 day")]
#[test_case(Callput::Call, 31.0 / 365.25, 0.0348561, 0.517428, 4.560247, 0.1161131, -0.2052111, 0.040957509 ; "call 1 month")]
#[test_case(Callput::Call, 92.0 / 365.25, 0.0600095, 0.530005, 2.642162, 0.1996541, -0.1188973, 0.118383471 ; "call 3 months")]
#[test_case(Callput::Call, 1.0, 0.1192354, 0.5596177, 1.314931, 0.3944793, -0.0591719, 0.440382308 ; "call 1 year")]
#[test_case(Callput::Call, 2.0, 0.1679960, 0.583998, 0.919395, 0.5516371, -0.0413728, 0.832004029 ; "call 2 years")]
fn black_scholes_reference_values(
    cp: Callput,
    ttx: f64,
    tv: f64,
    delta: f64,
    gamma: f64,
    vega: f64,
    theta: f64,
    rho: f64,
) {
    let g = pricing::greeks(cp, 1.0, 1.0, 0.3, 0.0, ttx);

    assert_relative_eq!(g.tv, tv, max_relative = 1e-5);
    assert_relative_eq!(g.delta, delta, max_relative = 1e-5);
    assert_relative_eq!(g.gamma, gamma, max_relative = 1e-5);
    assert_relative_eq!(g.vega, vega, max_relative = 1e-5);
    assert_relative_eq!(g.theta, theta, max_relative = 1e-5);
    assert_relative_eq!(g.rho, rho, max_relative = 1e-5);
}

#[test]
fn put_call_parity_holds() {
    // C − P = S − K·e^{−rt}
    let (k, s, sigma, r, t) = (95.0, 100.0, 0.25, 0.03, 0.5);
    let call = pricing::greeks(Callput::Call, k, s, sigma, r, t);
    let put = pricing::greeks(Callput::Put, k, s, sigma, r, t);

    assert_relative_eq!(
        call.tv - put.tv,
        s - k * (-r * t).exp(),
        max_relative = 1e-12
    );
    assert_relative_eq!(call.delta - put.delta, 1.0, max_relative = 1e-12);
    assert_relative_eq!(call.gamma, put.gamma, max_relative = 1e-12);
    assert_relative_eq!(call.vega, put.vega, max_relative = 1e-12);
}

#[test]
fn expired_option_degenerates_to_intrinsic() {
    let call = pricing::greeks(Callput::Call, 90.0, 100.0, 0.3, 0.01, 0.0);
    assert_eq!(call.tv, 10.0);
    assert_eq!(call.delta, 1.0);
    assert_eq!(call.gamma, 0.0);

    let put = pricing::greeks(Callput::Put, 90.0, 100.0, 0.3, 0.01, 0.0);
    assert_eq!(put.tv, 0.0);
    assert_eq!(put.delta, 0.0);
}

// ============================================================================
// Prices, sides, ticks
// ============================================================================

#[test]
fn side_comparators_are_mirror_images() {
    let lo = Price::from_f64(1.00);
    let hi = Price::from_f64(1.05);

    assert!(Side::Bid.matches_or_improves(hi, lo));
    assert!(Side::Bid.fades(lo, hi));
    assert!(Side::Ask.matches_or_improves(lo, hi));
    assert!(Side::Ask.fades(hi, lo));

    for side in Side::BOTH {
        assert!(side.matches_or_improves(lo, lo));
        assert!(!side.fades(lo, lo));
        assert_eq!(side.other().other(), side);
    }
}

#[test_case(Pxtick::AllPenny, 1.234, 1.23, 1.24)]
#[test_case(Pxtick::AllPenny, 5.0, 5.0, 5.0 ; "on tick is fixed")]
#[test_case(Pxtick::PennyNickel, 1.234, 1.23, 1.24 ; "fine band")]
#[test_case(Pxtick::PennyNickel, 4.52, 4.50, 4.55 ; "coarse band")]
#[test_case(Pxtick::NickelDime, 1.23, 1.20, 1.25)]
#[test_case(Pxtick::NickelDime, 4.52, 4.50, 4.60)]
fn tick_snapping(pxtick: Pxtick, px: f64, glb: f64, lub: f64) {
    assert_eq!(pxtick.glb_tick(px), Price::from_f64(glb));
    assert_eq!(pxtick.lub_tick(px), Price::from_f64(lub));
}

#[test]
fn px2_side_access_and_spread() {
    let mut px2 = Px2::new(Price::from_f64(1.00), Price::from_f64(1.10));

    assert_eq!(px2.px(Side::Bid), Price::from_f64(1.00));
    assert_eq!(px2.px(Side::Ask), Price::from_f64(1.10));
    assert_eq!(px2.spread(), Price::from_f64(0.10));

    px2.set_px(Side::Ask, Price::from_f64(1.05));
    assert_eq!(px2.spread(), Price::from_f64(0.05));

    let better_bid = Px2::new(Price::from_f64(1.02), Price::from_f64(1.05));
    assert!(px2.fades(Side::Bid, &better_bid));
    assert!(!px2.fades(Side::Ask, &better_bid));
}

// ============================================================================
// Strike sets
// ============================================================================

#[test]
fn regular_strike_set_builds_pairs_in_order() {
    let set = OptionStrikeSet::regular(4, 90.0, 5.0, t0(), Pxtick::PennyNickel)
        .expect("valid grid");

    assert_eq!(set.n_strike(), 4);
    set.verify_ok().expect("coherent set");

    let strikes: Vec<f64> = set.pairs().iter().map(StrikePair::strike).collect();
    assert_eq!(strikes, vec![90.0, 95.0, 100.0, 105.0]);

    // ids are sequential and unique across calls and puts
    let mut ids: Vec<u32> = set.options().map(|o| o.id().as_u32()).collect();
    assert_eq!(ids.len(), 8);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[test]
fn degenerate_strike_grids_are_rejected() {
    assert!(matches!(
        OptionStrikeSet::regular(0, 90.0, 5.0, t0(), Pxtick::AllPenny),
        Err(MarketError::InvalidStrikeGrid { .. })
    ));
    assert!(matches!(
        OptionStrikeSet::regular(2, -1.0, 5.0, t0(), Pxtick::AllPenny),
        Err(MarketError::InvalidStrikeGrid { .. })
    ));
    assert!(matches!(
        OptionStrikeSet::regular(2, 90.0, 0.0, t0(), Pxtick::AllPenny),
        Err(MarketError::InvalidStrikeGrid { .. })
    ));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn config_deserializes_with_defaults_for_missing_fields() {
    let config: MarketModelConfig =
        serde_json::from_str(r#"{ "half_spread": 0.05, "quote_size": 3 }"#).expect("parse");

    assert_eq!(config.half_spread, 0.05);
    assert_eq!(config.quote_size, 3);

    let defaults = MarketModelConfig::default();
    assert_eq!(config.compete_factor, defaults.compete_factor);
    assert_eq!(config.max_spread, defaults.max_spread);
    assert_eq!(config.quote_delay, SimDuration::from_micros(500));
}

// ============================================================================
// Market model end-to-end
// ============================================================================

fn test_model() -> (Reactor, std::rc::Rc<StrikeSetMarketModel>) {
    let reactor = Reactor::new(t0());

    // expiry three months out; strikes bracket the constant spot of 100
    let expiry = t0() + SimDuration::from_days(92);
    let option_set =
        OptionStrikeSet::regular(2, 97.5, 5.0, expiry, Pxtick::AllPenny).expect("grid");

    let tracer = ProcessTracer::new(ConstantProcess::new(t0(), 100.0));
    let model = StrikeSetMarketModel::new(
        option_set,
        tracer,
        PricingContext {
            volatility: 0.30,
            rate: 0.0,
        },
        SimDuration::from_secs(1),
        MarketModelConfig::default(),
    )
    .expect("model");

    model.bind_reactor(&reactor).expect("bind");
    (reactor, model)
}

#[test]
fn first_underlying_print_quotes_every_option() {
    let (reactor, model) = test_model();

    let quotes = CollectSink::new();
    model.omd_source().subscribe(quotes.handle());
    let greeks = CollectSink::new();
    model.greeks_source().subscribe(greeks.handle());

    reactor
        .run_until(t0() + SimDuration::from_millis(10))
        .expect("run");

    // 2 strikes × {call, put}
    let ticks = quotes.snapshot();
    assert_eq!(ticks.len(), 4, "every option published an opening quote");
    assert_eq!(greeks.snapshot().len(), 4);

    let quote_delay = MarketModelConfig::default().quote_delay;
    for tick in &ticks {
        assert_eq!(tick.tm(), t0() + quote_delay, "quotes lag the print");
        let px2 = tick.pxz.px2();
        assert!(px2.spread() > Price::ZERO, "two-sided market");
        assert!(px2.spread() <= Price::from_f64(2.0), "display rule");
    }

    assert_eq!(
        reactor.current_time(),
        t0() + quote_delay,
        "derived events delivered at their own timestamps"
    );
}

#[test]
fn constant_underlying_publishes_no_follow_up_quotes() {
    let (reactor, model) = test_model();

    let quotes = CollectSink::new();
    model.omd_source().subscribe(quotes.handle());

    reactor
        .run_until(t0() + SimDuration::from_secs(10))
        .expect("run");

    // hysteresis: the displayed market settles after the opening quote and
    // identical revaluations publish nothing new
    assert_eq!(quotes.snapshot().len(), 4);

    // greeks still flow on every print
    let greeks = CollectSink::new();
    model.greeks_source().subscribe(greeks.handle());
    reactor
        .run_until(t0() + SimDuration::from_secs(12))
        .expect("run");
    assert_eq!(greeks.snapshot().len(), 8, "4 options × 2 further prints");
}

#[test]
fn quote_stream_is_time_ordered_with_underlying() {
    let (reactor, model) = test_model();

    let quotes = CollectSink::new();
    model.omd_source().subscribe(quotes.handle());

    reactor
        .run_until(t0() + SimDuration::from_secs(5))
        .expect("run");

    let ticks = quotes.snapshot();
    for pair in ticks.windows(2) {
        assert!(pair[0].tm() <= pair[1].tm(), "delivery in timestamp order");
    }
}

// ============================================================================
// Strike-indexed book
// ============================================================================

#[test]
fn book_routes_ticks_and_answers_strike_queries() {
    use crate::{BboTick, PxSize2, Size, StrikeSetOmd};

    let expiry = t0() + SimDuration::from_days(30);
    let set = OptionStrikeSet::regular(4, 90.0, 5.0, expiry, Pxtick::AllPenny).expect("grid");
    let book = StrikeSetOmd::new(&set).expect("book");

    assert_eq!(book.n_strike(), 4);
    assert_eq!(book.nth_strike(0), Some(Price::from_f64(90.0)));
    assert_eq!(book.nth_strike(3), Some(Price::from_f64(105.0)));
    assert_eq!(book.nth_strike(4), None);

    // nearest-strike lookups
    assert_eq!(
        book.strike_at_or_below(Price::from_f64(97.0)),
        Some(Price::from_f64(95.0))
    );
    assert_eq!(
        book.strike_at_or_above(Price::from_f64(97.0)),
        Some(Price::from_f64(100.0))
    );
    assert_eq!(book.strike_at_or_below(Price::from_f64(80.0)), None);

    // [95, 105) covers strikes 95 and 100
    assert_eq!(
        book.strikes_in_range(Price::from_f64(95.0), Price::from_f64(105.0)),
        2
    );

    // quote the 95 call; the pair stays incomplete until the put arrives
    let call_95 = set.pairs()[1].call().id();
    let put_95 = set.pairs()[1].put().id();
    let px2 = Px2::new(Price::from_f64(4.10), Price::from_f64(4.20));
    let pxz = PxSize2::with_size(Size::new(1), px2);

    book.notify_bbo(&BboTick::new(t0(), call_95, pxz)).expect("tick");
    assert_eq!(book.lookup(call_95).expect("quoted").pxz, pxz);
    assert_eq!(book.lookup(put_95), None);
    assert!(book.complete_strikes().is_empty());

    book.notify_bbo(&BboTick::new(t0(), put_95, pxz)).expect("tick");
    assert_eq!(book.complete_strikes(), vec![Price::from_f64(95.0)]);
}

#[test]
fn book_rejects_ticks_for_unknown_options() {
    use crate::{BboTick, OptionId, PxSize2, Size, StrikeSetOmd};

    let expiry = t0() + SimDuration::from_days(30);
    let set = OptionStrikeSet::regular(1, 100.0, 5.0, expiry, Pxtick::AllPenny).expect("grid");
    let book = StrikeSetOmd::new(&set).expect("book");

    let stray = BboTick::new(
        t0(),
        OptionId::new(99),
        PxSize2::with_size(Size::new(1), Px2::default()),
    );

    assert!(matches!(
        book.notify_bbo(&stray),
        Err(MarketError::UnknownOption { .. })
    ));
}

#[test]
fn book_consumes_the_model_quote_stream_through_the_reactor() {
    use crate::StrikeSetOmd;

    let (reactor, model) = test_model();

    let book = StrikeSetOmd::new(model.option_set()).expect("book");
    model.omd_source().subscribe(book.bbo_sink());

    reactor
        .run_until(t0() + SimDuration::from_secs(5))
        .expect("run");

    // every option quoted on the opening print
    assert_eq!(book.complete_strikes().len(), 2);
    for option in model.option_set().options() {
        let omd = book.lookup(option.id()).expect("quoted");
        assert!(omd.pxz.px2().spread() > Price::ZERO);
    }
}
