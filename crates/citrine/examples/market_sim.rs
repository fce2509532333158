//! Simulated option market with Kalman smoothing of the underlying.
//!
//! A geometric-Brownian underlying drives a strike-set market model; the
//! model's quote stream and the smoothed underlying estimate print as the
//! reactor advances virtual time.
//!
//! ```sh
//! cargo run --example market_sim
//! ```

use std::rc::Rc;

use citrine::{
    BboTick, BrownianMotion, ExpProcess, KalmanFilterSpec, KalmanFilterSvc, KalmanInput,
    KalmanObservable, KalmanStateExt, KalmanTransition, MarketModelConfig, OptionStrikeSet,
    PricingContext, ProcessTracer, Pxtick, Reactor, SecondarySource, SimDuration,
    StrikeSetMarketModel, TimedSample, Timestamp, TypedSink,
};
use nalgebra::{DMatrix, dvector};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let t0 = Timestamp::from_ymd_hms(20240102, 93000)?;
    let reactor = Reactor::new(t0);

    // underlying: geometric Brownian motion, spot 100, 30% vol, 1 s prints
    let gbm = ExpProcess::with_scale(BrownianMotion::new(t0, 0.30, 0xC17A1DE)?, 100.0)?;
    let tracer = ProcessTracer::new(gbm);

    // options: 5 strikes straddling spot, expiring in 30 days
    let expiry = t0 + SimDuration::from_days(30);
    let option_set = OptionStrikeSet::regular(5, 90.0, 5.0, expiry, Pxtick::PennyNickel)?;

    let model = StrikeSetMarketModel::new(
        option_set,
        tracer,
        PricingContext {
            volatility: 0.30,
            rate: 0.01,
        },
        SimDuration::from_secs(1),
        MarketModelConfig::default(),
    )?;
    model.bind_reactor(&reactor)?;

    // print the quote stream
    model.omd_source().subscribe(TypedSink::from_fn(|tick: &BboTick| {
        println!("{}  {}  {}", tick.tm, tick.id, tick.pxz);
    }));

    // smooth the underlying with a near-random-walk filter
    let observations = SecondarySource::<KalmanInput>::new("ul-observations");
    {
        let observations = Rc::clone(&observations);
        model
            .underlying_source()
            .subscribe(TypedSink::from_fn(move |ev: &TimedSample<f64>| {
                observations
                    .publish(KalmanInput::new(ev.tm, dvector![ev.value]))
                    .expect("observation publish");
            }));
    }

    let s0 = KalmanStateExt::initial(t0, dvector![100.0], DMatrix::identity(1, 1) * 25.0)?;
    let spec = KalmanFilterSpec::new(
        s0,
        Box::new(|_sk, _input| {
            let transition =
                KalmanTransition::new(DMatrix::identity(1, 1), DMatrix::identity(1, 1) * 1e-3)
                    .expect("transition");
            let observable =
                KalmanObservable::new(DMatrix::identity(1, 1), DMatrix::identity(1, 1) * 0.25)
                    .expect("observable");
            (transition, observable)
        }),
    );
    let svc = KalmanFilterSvc::new(spec);
    observations.subscribe(svc.input_sink());
    svc.add_filter_callback(TypedSink::from_fn(|state: &KalmanStateExt| {
        println!(
            "{}  filter x={:.4} p={:.6}",
            state.tm(),
            state.state().state()[0],
            state.state().state_cov()[(0, 0)]
        );
    }));
    reactor.add_source(observations)?;

    // one minute of market
    reactor.run_until(t0 + SimDuration::from_secs(60))?;

    println!("final virtual time: {}", reactor.current_time());
    Ok(())
}
