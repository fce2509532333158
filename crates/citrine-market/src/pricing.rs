//! Black-Scholes valuation.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::option::Callput;

/// Non-terms inputs to the pricing model for one underlying: flat
/// volatility and risk-free rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingContext {
    /// Annualized volatility of the underlying (1/√year).
    pub volatility: f64,
    /// Continuously-compounded risk-free rate.
    pub rate: f64,
}

/// Model value and sensitivities for one option, in per-share units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    /// Theory value.
    pub tv: f64,
    /// ∂tv/∂spot.
    pub delta: f64,
    /// ∂²tv/∂spot².
    pub gamma: f64,
    /// ∂tv/∂volatility.
    pub vega: f64,
    /// −∂tv/∂time-to-expiry (decay as expiry approaches).
    pub theta: f64,
    /// ∂tv/∂rate.
    pub rho: f64,
}

/// Black-Scholes greeks for a European option.
///
/// With `N` the standard normal CDF and `N'` its density:
///
/// ```text
///   d1 = (ln(S/K) + (r + s²/2)·t) / (s·√t)
///   d2 = d1 − s·√t
///   D  = exp(−r·t)                     (discount factor to expiry)
///
///   call: tv = N(d1)·S − N(d2)·K·D         delta = N(d1)
///   put:  tv = N(−d2)·K·D − N(−d1)·S       delta = −N(−d1)
///
///   gamma = N'(d1)/(S·s·√t)        vega = S·N'(d1)·√t
///   call theta = −S·N'(d1)·s/(2√t) − r·K·D·N(d2)     rho =  K·t·D·N(d2)
///   put  theta = −S·N'(d1)·s/(2√t) + r·K·D·N(−d2)    rho = −K·t·D·N(−d2)
/// ```
///
/// - `k`: strike, `s_spot`: underlying spot, `sigma`: volatility,
///   `r`: risk-free rate, `t`: time to expiry in years.
///
/// An expired or valueless-vol option (`t ≤ 0` or `sigma ≤ 0` at the
/// limit) degenerates to intrinsic value with a step delta.
pub fn greeks(cp: Callput, k: f64, s_spot: f64, sigma: f64, r: f64, t: f64) -> Greeks {
    if t <= 0.0 || sigma <= 0.0 {
        return intrinsic_greeks(cp, k, s_spot);
    }

    let unit_normal = Normal::new(0.0, 1.0).expect("unit normal parameters are valid");
    let cdf = |x: f64| unit_normal.cdf(x);

    let root_t = t.sqrt();
    let s_root_t = sigma * root_t;
    let half_s2 = 0.5 * sigma * sigma;
    let log_sk = (s_spot / k).ln();

    let d1 = (log_sk + (r + half_s2) * t) / s_root_t;
    let d2 = d1 - s_root_t;

    // discount factor to expiry
    let disc = (-r * t).exp();

    let n_d1 = cdf(d1);
    let n_md1 = 1.0 - n_d1;
    let dens_d1 = unit_normal.pdf(d1);
    let n_d2 = cdf(d2);
    let n_md2 = 1.0 - n_d2;

    let (tv, delta) = match cp {
        Callput::Call => (n_d1 * s_spot - n_d2 * k * disc, n_d1),
        Callput::Put => (n_md2 * k * disc - n_md1 * s_spot, -n_md1),
    };

    let gamma = dens_d1 / (s_spot * s_root_t);
    let vega = s_spot * dens_d1 * root_t;

    let common_theta = -0.5 * s_spot * dens_d1 * sigma / root_t;
    let (theta, rho) = match cp {
        Callput::Call => (common_theta - r * k * disc * n_d2, k * t * disc * n_d2),
        Callput::Put => (common_theta + r * k * disc * n_md2, -k * t * disc * n_md2),
    };

    tracing::trace!(?cp, k, s_spot, sigma, r, t, tv, delta, "black-scholes greeks");

    Greeks {
        tv,
        delta,
        gamma,
        vega,
        theta,
        rho,
    }
}

fn intrinsic_greeks(cp: Callput, k: f64, s_spot: f64) -> Greeks {
    let (tv, delta) = match cp {
        Callput::Call => ((s_spot - k).max(0.0), f64::from(u8::from(s_spot > k))),
        Callput::Put => ((k - s_spot).max(0.0), -f64::from(u8::from(s_spot < k))),
    };

    Greeks {
        tv,
        delta,
        ..Greeks::default()
    }
}
