//! Stochastic process models.

use citrine_types::{SimDuration, Timestamp};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use rand_distr::StandardNormal;

use crate::error::ProcessError;

/// Days per year used to convert annualized volatility to per-day variance.
const DAYS_PER_YEAR: f64 = 365.25;

/// A continuous-time stochastic process over `f64` values, sampled lazily.
///
/// A known point of the realization is a `(timestamp, value)` pair. Sampling
/// consumes randomness, so both operations take `&mut self`.
pub trait StochasticProcess {
    /// Starting time of the process.
    fn t0(&self) -> Timestamp;

    /// Value at [`Self::t0`].
    fn t0_value(&self) -> f64;

    /// Samples the process at `t`, given the greatest known point `lo` with
    /// `lo.0 < t` (extends the realization rightward).
    fn exterior_sample(&mut self, t: Timestamp, lo: (Timestamp, f64)) -> f64;

    /// Samples the process at `t`, conditioned on the surrounding known
    /// points `lo` and `hi` with `lo.0 < t < hi.0` (bridge sampling).
    fn interior_sample(&mut self, t: Timestamp, lo: (Timestamp, f64), hi: (Timestamp, f64))
    -> f64;
}

// ============================================================================
// Brownian motion
// ============================================================================

/// Brownian motion with constant annualized volatility, starting at zero.
///
/// For volatility `σ` (units 1/√year), the variance accumulated over a
/// horizon `dt` is `σ²·dt` with `dt` in years of 365.25 days.
pub struct BrownianMotion {
    t0: Timestamp,
    volatility: f64,
    /// Variance accumulated per 86 400-second day.
    vol2_day: f64,
    rng: SmallRng,
}

impl BrownianMotion {
    /// `volatility` is the annualized standard deviation; `seed` fixes the
    /// realization.
    pub fn new(t0: Timestamp, volatility: f64, seed: u64) -> Result<Self, ProcessError> {
        if volatility < 0.0 {
            return Err(ProcessError::NegativeVolatility { volatility });
        }

        Ok(Self {
            t0,
            volatility,
            vol2_day: volatility * volatility / DAYS_PER_YEAR,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Variance accumulated across the span `dt`.
    pub fn variance_over(&self, dt: SimDuration) -> f64 {
        self.vol2_day * dt.as_days_f64()
    }

    fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}

impl StochasticProcess for BrownianMotion {
    fn t0(&self) -> Timestamp {
        self.t0
    }

    fn t0_value(&self) -> f64 {
        0.0
    }

    fn exterior_sample(&mut self, t: Timestamp, lo: (Timestamp, f64)) -> f64 {
        let var = self.variance_over(t - lo.0);
        let z = self.standard_normal();

        lo.1 + var.sqrt() * z
    }

    fn interior_sample(
        &mut self,
        t: Timestamp,
        lo: (Timestamp, f64),
        hi: (Timestamp, f64),
    ) -> f64 {
        // Brownian bridge: conditioned on both endpoints, B(t) is normal
        // around the linear interpolation, with variance
        // v1·v2/(v1 + v2) where v1, v2 are the unconditioned variances of
        // the two sub-spans.
        let span = hi.0 - lo.0;
        debug_assert!(span.is_positive(), "bridge endpoints out of order");

        let t_frac = (t - lo.0).as_secs_f64() / span.as_secs_f64();
        let mean_dx = (hi.1 - lo.1) * t_frac;

        let v1 = self.variance_over(t - lo.0);
        let v2 = self.variance_over(hi.0 - t);
        let var = v1 * v2 / (v1 + v2);

        let z = self.standard_normal();

        lo.1 + mean_dx + var.sqrt() * z
    }
}

impl std::fmt::Debug for BrownianMotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrownianMotion")
            .field("t0", &self.t0)
            .field("volatility", &self.volatility)
            .finish()
    }
}

// ============================================================================
// Exponentiated process
// ============================================================================

/// The pointwise exponential `P(t) = m·exp(S(t))` of an inner process `S`.
///
/// With Brownian motion as the exponent this is a log-normal (geometric)
/// process; `scale` sets the value at the inner process's zero (e.g. an
/// initial price).
#[derive(Debug)]
pub struct ExpProcess<P> {
    exponent: P,
    scale: f64,
}

impl<P: StochasticProcess> ExpProcess<P> {
    /// Log-normal process with initial value `exp(exponent.t0_value())`.
    pub fn new(exponent: P) -> Self {
        Self {
            exponent,
            scale: 1.0,
        }
    }

    /// Log-normal process scaled so its value at the exponent's zero is
    /// `scale`.
    pub fn with_scale(exponent: P, scale: f64) -> Result<Self, ProcessError> {
        if scale <= 0.0 {
            return Err(ProcessError::NonPositiveScale { scale });
        }
        Ok(Self { exponent, scale })
    }

    pub fn exponent(&self) -> &P {
        &self.exponent
    }

    /// Known points arrive in the exponentiated domain; map them back into
    /// the exponent's domain.
    fn to_log(&self, point: (Timestamp, f64)) -> (Timestamp, f64) {
        (point.0, (point.1 / self.scale).ln())
    }
}

impl<P: StochasticProcess> StochasticProcess for ExpProcess<P> {
    fn t0(&self) -> Timestamp {
        self.exponent.t0()
    }

    fn t0_value(&self) -> f64 {
        self.scale * self.exponent.t0_value().exp()
    }

    fn exterior_sample(&mut self, t: Timestamp, lo: (Timestamp, f64)) -> f64 {
        let log_lo = self.to_log(lo);
        let e = self.exponent.exterior_sample(t, log_lo);

        self.scale * e.exp()
    }

    fn interior_sample(
        &mut self,
        t: Timestamp,
        lo: (Timestamp, f64),
        hi: (Timestamp, f64),
    ) -> f64 {
        let log_lo = self.to_log(lo);
        let log_hi = self.to_log(hi);
        let e = self.exponent.interior_sample(t, log_lo, log_hi);

        self.scale * e.exp()
    }
}

// ============================================================================
// Constant process
// ============================================================================

/// A degenerate process pinned at a constant value. Useful as a test
/// scaffold and as a deterministic underlying.
#[derive(Debug, Clone, Copy)]
pub struct ConstantProcess {
    t0: Timestamp,
    value: f64,
}

impl ConstantProcess {
    pub fn new(t0: Timestamp, value: f64) -> Self {
        Self { t0, value }
    }
}

impl StochasticProcess for ConstantProcess {
    fn t0(&self) -> Timestamp {
        self.t0
    }

    fn t0_value(&self) -> f64 {
        self.value
    }

    fn exterior_sample(&mut self, _t: Timestamp, _lo: (Timestamp, f64)) -> f64 {
        self.value
    }

    fn interior_sample(
        &mut self,
        _t: Timestamp,
        _lo: (Timestamp, f64),
        _hi: (Timestamp, f64),
    ) -> f64 {
        self.value
    }
}
