//! Tests for processes, tracers, and the realization source.
//!
//! Stochastic assertions use seeded generators and generous tolerances, so
//! they are deterministic.

use approx::assert_relative_eq;
use citrine_reactor::{CollectSink, Reactor, SimEvent, TimedSample};
use citrine_stats::SampleStatistics;
use citrine_types::{SimDuration, Timestamp};

use crate::{
    BrownianMotion, ConstantProcess, ExpProcess, ProcessError, ProcessTracer, RealizationSource,
    StochasticProcess, Tracer,
};

fn t0() -> Timestamp {
    Timestamp::from_ymd_hms_usec(20220610, 162905, 123_456).expect("valid time")
}

// ============================================================================
// Construction errors
// ============================================================================

#[test]
fn negative_volatility_is_rejected() {
    let err = BrownianMotion::new(t0(), -0.1, 1).expect_err("negative vol");
    assert!(matches!(err, ProcessError::NegativeVolatility { .. }));
}

#[test]
fn non_positive_interval_is_rejected() {
    let tracer = ProcessTracer::new(ConstantProcess::new(t0(), 0.0));
    let err = RealizationSource::new("s", tracer, SimDuration::ZERO).expect_err("zero interval");
    assert!(matches!(err, ProcessError::NonPositiveInterval { .. }));
}

#[test]
fn non_positive_scale_is_rejected() {
    let bm = BrownianMotion::new(t0(), 0.3, 1).expect("bm");
    let err = ExpProcess::with_scale(bm, 0.0).expect_err("zero scale");
    assert!(matches!(err, ProcessError::NonPositiveScale { .. }));
}

// ============================================================================
// Sampling statistics
// ============================================================================

#[test]
fn brownian_variance_scales_linearly_in_time() {
    let bm = BrownianMotion::new(t0(), 0.30, 7).expect("bm");

    let one_day = bm.variance_over(SimDuration::from_days(1));
    let four_days = bm.variance_over(SimDuration::from_days(4));

    assert_relative_eq!(four_days, 4.0 * one_day, max_relative = 1e-12);
    assert_relative_eq!(
        bm.variance_over(SimDuration::from_days(365)) + bm.variance_over(SimDuration::from_hours(6)),
        0.30 * 0.30,
        max_relative = 1e-9
    );
}

#[test]
fn exterior_samples_match_declared_variance() {
    // many independent one-day increments; sample variance should approach
    // the declared per-day variance
    let mut bm = BrownianMotion::new(t0(), 0.20, 42).expect("bm");
    let dt = SimDuration::from_days(1);
    let expected_var = bm.variance_over(dt);

    let mut stats = SampleStatistics::new();
    for _ in 0..20_000 {
        let x = bm.exterior_sample(t0() + dt, (t0(), 0.0));
        stats.include_sample(x);
    }

    assert!(stats.mean().abs() < 0.05 * expected_var.sqrt() * 3.0);
    assert_relative_eq!(stats.sample_variance(), expected_var, max_relative = 0.05);
}

#[test]
fn bridge_sample_variance_is_halved_at_midpoint() {
    // conditioning on both endpoints halves the midpoint variance relative
    // to an unconditioned increment over the half-span
    let mut bm = BrownianMotion::new(t0(), 0.20, 43).expect("bm");
    let half = SimDuration::from_days(1);
    let lo = (t0(), 0.0);
    let hi = (t0() + half * 2, 0.0);
    let unconditioned_var = bm.variance_over(half);

    let mut stats = SampleStatistics::new();
    for _ in 0..20_000 {
        let x = bm.interior_sample(t0() + half, lo, hi);
        stats.include_sample(x);
    }

    assert_relative_eq!(
        stats.sample_variance(),
        0.5 * unconditioned_var,
        max_relative = 0.05
    );
}

#[test]
fn exp_process_exponentiates_and_scales() {
    let bm = BrownianMotion::new(t0(), 0.30, 11).expect("bm");
    let mut gbm = ExpProcess::with_scale(bm, 100.0).expect("scale");

    assert_relative_eq!(gbm.t0_value(), 100.0);

    // samples stay positive and start from the scaled origin
    let mut last = (t0(), gbm.t0_value());
    for step in 1..=200 {
        let t = t0() + SimDuration::from_days(step);
        let x = gbm.exterior_sample(t, last);
        assert!(x > 0.0, "log-normal values are positive");
        last = (t, x);
    }
}

// ============================================================================
// Tracer
// ============================================================================

#[test]
fn tracer_advances_monotonically() {
    let mut tracer = ProcessTracer::new(BrownianMotion::new(t0(), 0.30, 5).expect("bm"));

    assert_eq!(tracer.current_time(), t0());
    assert_eq!(tracer.current_value(), 0.0);

    tracer.advance(SimDuration::from_secs(10));
    assert_eq!(tracer.current_time(), t0() + SimDuration::from_secs(10));

    tracer.advance_until(t0() + SimDuration::from_secs(5));
    assert_eq!(
        tracer.current_time(),
        t0() + SimDuration::from_secs(10),
        "advance_until never moves backwards"
    );

    tracer.advance_until(t0() + SimDuration::from_secs(30));
    assert_eq!(tracer.current_time(), t0() + SimDuration::from_secs(30));
}

// ============================================================================
// Realization source scheduling
// ============================================================================

#[test]
fn sixty_seconds_of_one_second_samples_yields_61_events() {
    let reactor = Reactor::new(t0());
    let tracer = ProcessTracer::new(ConstantProcess::new(t0(), 0.0));
    let src =
        RealizationSource::new("const", tracer, SimDuration::from_secs(1)).expect("source");

    let collect = CollectSink::<TimedSample<f64>>::new();
    src.subscribe(collect.handle());
    reactor.add_source(src).expect("add");

    let n = reactor.run_until(t0() + SimDuration::from_secs(60)).expect("run");
    assert_eq!(n, 61, "t0 through t0+60s inclusive");

    let events = collect.snapshot();
    assert_eq!(events.len(), 61);
    for (i, ev) in events.iter().enumerate() {
        assert_eq!(ev.tm(), t0() + SimDuration::from_secs(i as i64));
        assert_eq!(ev.value, 0.0);
    }

    assert_eq!(reactor.current_time(), t0() + SimDuration::from_secs(60));
    assert_eq!(reactor.next_time(), t0() + SimDuration::from_secs(61));
}

#[test]
fn realization_source_samples_follow_the_tracer_path() {
    let reactor = Reactor::new(t0());
    let tracer = ProcessTracer::new(BrownianMotion::new(t0(), 0.30, 99).expect("bm"));
    let src = RealizationSource::new("bm", tracer, SimDuration::from_secs(10)).expect("source");

    let collect = CollectSink::<TimedSample<f64>>::new();
    src.subscribe(collect.handle());
    reactor.add_source(src).expect("add");

    reactor
        .run_until(t0() + SimDuration::from_minutes(10))
        .expect("run");

    let events = collect.snapshot();
    assert_eq!(events.len(), 61);
    assert_eq!(events[0].value, 0.0, "path starts at the process origin");

    // strictly increasing timestamps at the sampling interval
    for pair in events.windows(2) {
        assert_eq!(pair[1].tm() - pair[0].tm(), SimDuration::from_secs(10));
    }
}
