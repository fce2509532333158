//! Per-option quote engines and the strike-set market model.

use std::{cell::RefCell, rc::Rc};

use citrine_process::{RealizationSource, Tracer};
use citrine_reactor::{
    Reactor, ReactorError, ReactorSource, SecondarySource, SinkError, TimedSample, TypedSink,
};
use citrine_types::Timestamp;

use crate::config::MarketModelConfig;
use crate::error::MarketError;
use crate::events::{BboTick, GreeksEvent};
use crate::option::{OptionStrikeSet, VanillaOption};
use crate::price::{Price, Px2, PxSize2, Size};
use crate::pricing::{self, Greeks, PricingContext};
use crate::side::Side;

/// Quote engine for a single option.
///
/// On every underlying print it revalues the option, builds an inside
/// market at the model spread widened to whole ticks, and applies
/// hysteresis and display rules before deciding whether to publish:
///
/// - fades always publish (a stale aggressive quote invites opportunistic
///   trades at a no-longer-desirable price)
/// - improvements publish only for `|delta|` below the update cutoff, and
///   only out to the competitiveness cutoff
/// - quotes wider than the max displayed spread refresh to the inside
///   market
#[derive(Debug, Clone)]
pub struct OptionMarketModel {
    option: VanillaOption,
    /// Greeks as of the last underlying print.
    last_greeks: Greeks,
    /// Displayed market as of the last publish decision.
    last_bbo: Px2,
}

impl OptionMarketModel {
    pub fn new(option: VanillaOption) -> Self {
        Self {
            option,
            last_greeks: Greeks::default(),
            last_bbo: Px2::default(),
        }
    }

    pub fn option(&self) -> &VanillaOption {
        &self.option
    }

    pub fn last_greeks(&self) -> Greeks {
        self.last_greeks
    }

    pub fn last_bbo(&self) -> Px2 {
        self.last_bbo
    }

    /// Time to expiry in 365.25-day years.
    fn years_to_expiry(&self, tm: Timestamp) -> f64 {
        (self.option.expiry() - tm).as_days_f64() / 365.25
    }

    /// Revalues against an underlying print; pushes a tick onto `out` when
    /// the displayed market changes.
    fn notify_ul(
        &mut self,
        ul_ev: &TimedSample<f64>,
        cx: &PricingContext,
        config: &MarketModelConfig,
        out: &mut Vec<BboTick>,
    ) {
        self.last_greeks = pricing::greeks(
            self.option.callput(),
            self.option.strike(),
            ul_ev.value,
            cx.volatility,
            cx.rate,
            self.years_to_expiry(ul_ev.tm),
        );
        let tv = self.last_greeks.tv;

        let pxtick = self.option.pxtick();
        let inside = Px2::new(
            pxtick.glb_tick(tv - config.half_spread),
            pxtick.lub_tick(tv + config.half_spread),
        );

        let old_bbo = self.last_bbo;
        let mut new_bbo = old_bbo;

        for side in Side::BOTH {
            // competitive as long as it does not fade past this level
            let cutoff = Price::from_f64(
                side.fade_by(tv, config.compete_factor * config.half_spread),
            );

            if inside.fades(side, &old_bbo) {
                new_bbo.set_px(side, inside.px(side));
            } else if self.last_greeks.delta.abs() < config.delta_update_cutoff
                && side.matches_or_improves(inside.px(side), cutoff)
            {
                new_bbo.set_px(side, cutoff);
            }
        }

        // hysteresis must not leave super-wide quotes on display
        if new_bbo.spread() > Price::from_f64(config.max_spread) {
            new_bbo = inside;
        }

        let publish = new_bbo != self.last_bbo;
        self.last_bbo = new_bbo;

        tracing::trace!(
            option = %self.option.id(),
            tv,
            delta = self.last_greeks.delta,
            %new_bbo,
            publish,
            "quote update"
        );

        if publish {
            out.push(BboTick::new(
                ul_ev.tm + config.quote_delay,
                self.option.id(),
                PxSize2::with_size(Size::new(config.quote_size), new_bbo),
            ));
        }
    }
}

/// Model market for a set of related options sharing an expiry.
///
/// Consumes underlying prints from its realization source and fans derived
/// quote and greeks events into two [`SecondarySource`]s, so a reactor
/// interleaves underlying, quotes, and greeks in global timestamp order.
pub struct StrikeSetMarketModel {
    option_set: OptionStrikeSet,
    pricing: PricingContext,
    config: MarketModelConfig,
    markets: RefCell<Vec<OptionMarketModel>>,
    ul_source: Rc<RealizationSource<f64>>,
    omd_publisher: Rc<SecondarySource<BboTick>>,
    greeks_publisher: Rc<SecondarySource<GreeksEvent>>,
}

impl StrikeSetMarketModel {
    /// Builds the model and wires it to a fresh underlying realization
    /// source sampling `tracer` every `ul_interval`.
    pub fn new(
        option_set: OptionStrikeSet,
        tracer: impl Tracer<f64> + 'static,
        pricing: PricingContext,
        ul_interval: citrine_types::SimDuration,
        config: MarketModelConfig,
    ) -> Result<Rc<Self>, MarketError> {
        option_set.verify_ok()?;

        let ul_source = RealizationSource::new("ul-prices", tracer, ul_interval)?;
        let markets = option_set
            .options()
            .map(|opt| OptionMarketModel::new(opt.clone()))
            .collect();

        let model = Rc::new(Self {
            option_set,
            pricing,
            config,
            markets: RefCell::new(markets),
            ul_source,
            omd_publisher: SecondarySource::new("omd-ticks"),
            greeks_publisher: SecondarySource::new("model-greeks"),
        });

        // the underlying source's sink must not keep the model alive
        let weak = Rc::downgrade(&model);
        model
            .ul_source
            .subscribe(TypedSink::new(move |ev: &TimedSample<f64>| {
                match weak.upgrade() {
                    Some(model) => model.notify_ul(ev),
                    None => Ok(()),
                }
            }));

        Ok(model)
    }

    pub fn option_set(&self) -> &OptionStrikeSet {
        &self.option_set
    }

    pub fn underlying_source(&self) -> &Rc<RealizationSource<f64>> {
        &self.ul_source
    }

    /// Quote stream (one [`BboTick`] per displayed-market change).
    pub fn omd_source(&self) -> &Rc<SecondarySource<BboTick>> {
        &self.omd_publisher
    }

    /// Greeks stream (one [`GreeksEvent`] per option per underlying
    /// print).
    pub fn greeks_source(&self) -> &Rc<SecondarySource<GreeksEvent>> {
        &self.greeks_publisher
    }

    /// Adds this model's three sources to `reactor`.
    pub fn bind_reactor(&self, reactor: &Reactor) -> Result<(), ReactorError> {
        reactor.add_source(self.ul_source.clone())?;
        reactor.add_source(self.omd_publisher.clone())?;
        reactor.add_source(self.greeks_publisher.clone())?;
        Ok(())
    }

    /// Reverses [`Self::bind_reactor`].
    pub fn detach_reactor(&self, reactor: &Reactor) {
        for src in [
            Rc::clone(&self.ul_source) as Rc<dyn ReactorSource>,
            Rc::clone(&self.omd_publisher) as Rc<dyn ReactorSource>,
            Rc::clone(&self.greeks_publisher) as Rc<dyn ReactorSource>,
        ] {
            reactor.remove_source(&src);
        }
    }

    /// Revalues every option for one underlying print and publishes the
    /// derived events.
    fn notify_ul(&self, ul_ev: &TimedSample<f64>) -> Result<(), SinkError> {
        let mut ticks = Vec::new();
        let mut greeks_events = Vec::new();

        {
            let mut markets = self.markets.borrow_mut();
            for market in markets.iter_mut() {
                market.notify_ul(ul_ev, &self.pricing, &self.config, &mut ticks);
                greeks_events.push(GreeksEvent {
                    tm: ul_ev.tm + self.config.quote_delay,
                    id: market.option().id(),
                    greeks: market.last_greeks(),
                });
            }
        }

        tracing::debug!(
            tm = %ul_ev.tm,
            ul = ul_ev.value,
            ticks = ticks.len(),
            "underlying print processed"
        );

        self.omd_publisher
            .publish_all(ticks)
            .map_err(|e| SinkError::new(e.to_string()))?;
        self.greeks_publisher
            .publish_all(greeks_events)
            .map_err(|e| SinkError::new(e.to_string()))?;

        Ok(())
    }
}

impl std::fmt::Debug for StrikeSetMarketModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrikeSetMarketModel")
            .field("n_strike", &self.option_set.n_strike())
            .field("pricing", &self.pricing)
            .finish()
    }
}
