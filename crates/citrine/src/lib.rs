//! # Citrine
//!
//! Discrete-event simulation substrate for financial market models.
//!
//! Heterogeneous event producers — stochastic price processes, option
//! market models, derived streams — are coordinated by a central reactor
//! that advances one logical clock, delivers events in timestamp order
//! across sources, and fans them out to typed subscribers. A linear Kalman
//! filter engine consumes observation streams produced by the same
//! substrate.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Citrine                              │
//! │  ┌───────────┐   ┌───────────┐   ┌──────────┐   ┌─────────────┐  │
//! │  │ Processes │ → │  Reactor  │ → │  Models  │ → │   Filter    │  │
//! │  │ (paths)   │   │ (v-time)  │   │ (quotes) │   │ (Kalman)    │  │
//! │  └───────────┘   └───────────┘   └──────────┘   └─────────────┘  │
//! │        ordered containers: red-black tree with reductions        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use citrine::{
//!     ConstantProcess, ProcessTracer, Reactor, RealizationSource, CollectSink, TimedSample,
//!     SimDuration, Timestamp,
//! };
//!
//! let t0 = Timestamp::ymd_midnight(20240102).unwrap();
//! let reactor = Reactor::new(t0);
//!
//! // a source sampling a (here: constant) process once per second
//! let tracer = ProcessTracer::new(ConstantProcess::new(t0, 42.0));
//! let src = RealizationSource::new("demo", tracer, SimDuration::from_secs(1)).unwrap();
//!
//! let sink = CollectSink::<TimedSample<f64>>::new();
//! src.subscribe(sink.handle());
//!
//! reactor.add_source(src).unwrap();
//! reactor.run_until(t0 + SimDuration::from_secs(10)).unwrap();
//!
//! assert_eq!(sink.len(), 11);
//! ```
//!
//! # Crates
//!
//! - **Foundation**: [`citrine_types`] (virtual time), [`citrine_tree`]
//!   (ordered containers)
//! - **Substrate**: [`citrine_reactor`] (scheduling), [`citrine_process`]
//!   (stochastic sources)
//! - **Models**: [`citrine_market`] (option quotes), [`citrine_filter`]
//!   (Kalman), [`citrine_stats`] (accumulators)

pub use citrine_types::{SimDuration, SourceId, TimeError, Timestamp};

pub use citrine_tree::{NullReduce, OrdinalReduce, RedBlackTree, Reduce, SumReduce, TreeError};

pub use citrine_reactor::{
    AnySink, CallbackSet, CollectSink, EventSink, PayloadType, PrimeNotifier, Reactor,
    ReactorError, ReactorSource, SecondarySource, SimEvent, SinkError, SinkHandle, TimedSample,
    TypedSink,
};

pub use citrine_process::{
    BrownianMotion, ConstantProcess, ExpProcess, ProcessError, ProcessTracer, RealizationSource,
    StochasticProcess, Tracer,
};

pub use citrine_filter::{
    FilterError, KalmanFilter, KalmanFilterSpec, KalmanFilterSvc, KalmanInput, KalmanObservable,
    KalmanState, KalmanStateExt, KalmanStep, KalmanTransition, MkStepFn, ObservedMarker, engine,
};

pub use citrine_market::{
    BboTick, Callput, Greeks, GreeksEvent, MarketError, MarketModelConfig, Omd, OmdPair,
    OptionId, OptionMarketModel, OptionStrikeSet, Price, PricingContext, Px2, PxSize2, Pxtick,
    Side, Size, StrikePair, StrikeSetMarketModel, StrikeSetOmd, VanillaOption, pricing,
};

pub use citrine_stats::{Bucket, EmpiricalDistribution, Histogram, SampleStatistics};
