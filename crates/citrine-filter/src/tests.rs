//! Engine and service tests.
//!
//! Convergence assertions follow the closed-form posterior of the
//! linear-Gaussian filter, with seeded noise so every run is identical.

use approx::assert_relative_eq;
use citrine_stats::SampleStatistics;
use citrine_types::{SimDuration, Timestamp};
use nalgebra::{DMatrix, DVector, dvector};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use rand_distr::StandardNormal;

use crate::{
    FilterError, KalmanFilter, KalmanFilterSpec, KalmanInput, KalmanObservable, KalmanState,
    KalmanStateExt, KalmanTransition, ObservedMarker, engine,
};

fn t0() -> Timestamp {
    Timestamp::ymd_midnight(20220707).expect("valid date")
}

fn secs(s: i64) -> SimDuration {
    SimDuration::from_secs(s)
}

/// `F = I`, `Q = 0`, `H = 1ₘₓ₁`, `R = Iₘ`: repeated direct observation of a
/// constant scalar through `m` independent unit-noise channels.
fn identity_spec(m: usize, x0: f64, p0: f64) -> KalmanFilterSpec {
    let s0 = KalmanStateExt::initial(t0(), dvector![x0], DMatrix::identity(1, 1) * p0)
        .expect("initial state");

    KalmanFilterSpec::new(
        s0,
        Box::new(move |_sk, _input| {
            let f = DMatrix::identity(1, 1);
            let q = DMatrix::zeros(1, 1);
            let h = DMatrix::from_element(m, 1, 1.0);
            let r = DMatrix::identity(m, m);
            (
                KalmanTransition::new(f, q).expect("transition"),
                KalmanObservable::new(h, r).expect("observable"),
            )
        }),
    )
}

// ============================================================================
// Construction guards
// ============================================================================

#[test]
fn transition_requires_square_matching_shapes() {
    let err = KalmanTransition::new(DMatrix::zeros(2, 3), DMatrix::zeros(2, 2))
        .expect_err("F not square");
    assert!(matches!(err, FilterError::DimMismatch { ctx, .. } if ctx.contains("F")));

    let err = KalmanTransition::new(DMatrix::zeros(2, 2), DMatrix::zeros(3, 3))
        .expect_err("Q wrong size");
    assert!(matches!(err, FilterError::DimMismatch { ctx, .. } if ctx.contains("Q")));
}

#[test]
fn observable_requires_r_matching_h_rows() {
    let err = KalmanObservable::new(DMatrix::zeros(2, 4), DMatrix::zeros(3, 3))
        .expect_err("R wrong size");
    assert!(matches!(err, FilterError::DimMismatch { .. }));
}

#[test]
fn state_ext_validates_both_gain_dimensions() {
    let state = KalmanState::new(0, t0(), dvector![0.0, 0.0], DMatrix::identity(2, 2))
        .expect("state");

    // gain with wrong row count is rejected even when columns look fine
    let err = KalmanStateExt::new(
        state.clone(),
        DMatrix::zeros(3, 2),
        ObservedMarker::Full,
    )
    .expect_err("gain rows");
    assert!(matches!(err, FilterError::DimMismatch { .. }));

    // scalar marker requires a column gain
    let err = KalmanStateExt::new(state, DMatrix::zeros(2, 2), ObservedMarker::Scalar(0))
        .expect_err("gain cols");
    assert!(matches!(err, FilterError::DimMismatch { .. }));
}

#[test]
fn extrapolate_rejects_mismatched_state() {
    let sk = KalmanState::new(0, t0(), dvector![0.0, 0.0], DMatrix::identity(2, 2))
        .expect("state");
    let model = KalmanTransition::new(DMatrix::identity(3, 3), DMatrix::zeros(3, 3))
        .expect("transition");

    let err = engine::extrapolate(t0() + secs(1), &sk, &model).expect_err("dims differ");
    assert!(matches!(err, FilterError::DimMismatch { .. }));
}

#[test]
fn gain1_rejects_out_of_range_observable() {
    let sk = KalmanState::new(0, t0(), dvector![0.0], DMatrix::identity(1, 1)).expect("state");
    let obs = KalmanObservable::new(DMatrix::identity(1, 1), DMatrix::identity(1, 1))
        .expect("observable");

    let err = engine::kalman_gain1(&sk, &obs, 1).expect_err("j out of range");
    assert!(matches!(err, FilterError::ObservableOutOfRange { j: 1, m: 1 }));
}

// ============================================================================
// Engine laws
// ============================================================================

#[test]
fn extrapolate_applies_transition_and_noise() {
    let sk = KalmanState::new(3, t0(), dvector![1.0, 2.0], DMatrix::identity(2, 2))
        .expect("state");
    let f = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0]);
    let q = DMatrix::identity(2, 2) * 0.5;
    let model = KalmanTransition::new(f.clone(), q.clone()).expect("transition");

    let next = engine::extrapolate(t0() + secs(1), &sk, &model).expect("extrapolate");

    assert_eq!(next.step_no(), 4);
    assert_eq!(next.tm(), t0() + secs(1));
    assert_relative_eq!(next.state()[0], 3.0);
    assert_relative_eq!(next.state()[1], 2.0);

    let expected_p = &f * DMatrix::identity(2, 2) * f.transpose() + q;
    assert_relative_eq!(next.state_cov(), &expected_p, max_relative = 1e-12);
}

#[test]
fn correct_with_zero_coupling_is_identity() {
    // H = 0 with huge R: the observation carries no information, so the
    // corrected state equals the extrapolated state
    let skp1 = KalmanState::new(1, t0(), dvector![4.0, -2.0], DMatrix::identity(2, 2) * 3.0)
        .expect("state");
    let obs = KalmanObservable::new(DMatrix::zeros(1, 2), DMatrix::identity(1, 1) * 1e12)
        .expect("observable");
    let input = KalmanInput::new(t0(), dvector![123.0]);

    let corrected = engine::correct(&skp1, &obs, &input).expect("correct");

    assert_relative_eq!(corrected.state().state(), skp1.state(), epsilon = 1e-9);
    assert_relative_eq!(
        corrected.state().state_cov(),
        skp1.state_cov(),
        epsilon = 1e-9
    );
    assert_eq!(corrected.observed(), ObservedMarker::Full);
}

#[test]
fn corrected_covariance_is_symmetric() {
    let p = DMatrix::from_row_slice(2, 2, &[2.0, 0.3, 0.3, 1.0]);
    let skp1 = KalmanState::new(1, t0(), dvector![0.0, 0.0], p).expect("state");
    let h = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]);
    let r = DMatrix::identity(2, 2) * 0.1;
    let obs = KalmanObservable::new(h, r).expect("observable");
    let input = KalmanInput::new(t0(), dvector![1.0, -1.0]);

    let corrected = engine::correct(&skp1, &obs, &input).expect("correct");
    let p1 = corrected.state().state_cov();

    assert_relative_eq!(p1, &p1.transpose(), epsilon = 1e-12);
}

#[test]
fn correct_rejects_mismatched_observation_vector() {
    let skp1 = KalmanState::new(1, t0(), dvector![0.0], DMatrix::identity(1, 1)).expect("state");
    let obs = KalmanObservable::new(DMatrix::identity(1, 1), DMatrix::identity(1, 1))
        .expect("observable");
    let input = KalmanInput::new(t0(), dvector![1.0, 2.0]);

    let err = engine::correct(&skp1, &obs, &input).expect_err("z too long");
    assert!(matches!(err, FilterError::DimMismatch { .. }));
}

#[test]
fn full_correct_equals_sequenced_scalar_corrections_for_diagonal_r() {
    let p = DMatrix::from_row_slice(2, 2, &[2.0, 0.4, 0.4, 1.5]);
    let skp1 = KalmanState::new(1, t0(), dvector![1.0, -0.5], p).expect("state");
    let h = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    let r = DMatrix::from_diagonal(&dvector![0.5, 0.8, 1.2]);
    let obs = KalmanObservable::new(h, r).expect("observable");
    let input = KalmanInput::new(t0(), dvector![1.2, -0.4, 0.9]);

    let full = engine::correct(&skp1, &obs, &input).expect("full correct");

    let mut seq = skp1;
    for j in 0..3 {
        let ext = engine::correct1(&seq, &obs, &input, j).expect("scalar correct");
        assert_eq!(ext.observed(), ObservedMarker::Scalar(j));
        assert_eq!(ext.gain().ncols(), 1);
        seq = ext.state().clone();
    }

    assert_relative_eq!(full.state().state(), seq.state(), epsilon = 1e-9);
    assert_relative_eq!(full.state().state_cov(), seq.state_cov(), epsilon = 1e-9);
}

#[test]
fn posterior_variance_follows_information_sum() {
    // repeated scalar observation of a constant with Q = 0, H = I, R = σ²:
    // after k observations, P = (1/P₀ + k/σ²)⁻¹
    let sigma2 = 4.0;
    let p0 = 2.5;

    let s0 = KalmanStateExt::initial(t0(), dvector![0.0], DMatrix::identity(1, 1) * p0)
        .expect("initial");
    let spec = KalmanFilterSpec::new(
        s0,
        Box::new(move |_sk, _input| {
            (
                KalmanTransition::new(DMatrix::identity(1, 1), DMatrix::zeros(1, 1))
                    .expect("transition"),
                KalmanObservable::new(
                    DMatrix::identity(1, 1),
                    DMatrix::identity(1, 1) * sigma2,
                )
                .expect("observable"),
            )
        }),
    );
    let mut filter = KalmanFilter::new(spec);

    for k in 1..=50u32 {
        let input = KalmanInput::new(t0() + secs(i64::from(k)), dvector![1.0]);
        let state = filter.notify_input(&input).expect("step");

        let expected = 1.0 / (1.0 / p0 + f64::from(k) / sigma2);
        assert_relative_eq!(state.state().state_cov()[(0, 0)], expected, max_relative = 1e-6);
    }
}

// ============================================================================
// Identity-filter scenarios
// ============================================================================

#[test]
fn scalar_identity_filter_tracks_the_sample_mean() {
    // measure an unknown constant (10) through N(0,1) noise; the filter's
    // estimate must match the running sample mean and P(k) = 1/(k+1)
    let mut rng = SmallRng::seed_from_u64(0xCF0F_1DE5);
    let mut draw = move || -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        10.0 + z
    };

    let x0 = draw();
    let mut z_stats = SampleStatistics::new();
    z_stats.include_sample(x0);

    let mut filter = KalmanFilter::new(identity_spec(1, x0, 1.0));

    for k in 1..=100u32 {
        let z = draw();
        z_stats.include_sample(z);

        let input = KalmanInput::new(t0() + secs(i64::from(k)), dvector![z]);
        let state = filter.notify_input(&input).expect("step");

        assert_eq!(state.step_no(), k);
        assert_relative_eq!(state.state().state()[0], z_stats.mean(), max_relative = 1e-6);
        assert_relative_eq!(
            state.state().state_cov()[(0, 0)],
            1.0 / f64::from(k + 1),
            max_relative = 1e-6
        );
        assert_eq!(state.gain().shape(), (1, 1));
    }

    // after 100 noisy observations the estimate is close to the true value
    let final_x = filter.state().state().state()[0];
    assert!((final_x - 10.0).abs() < 0.5, "estimate {final_x} near 10");
}

#[test]
fn two_observations_per_step_double_the_information() {
    // two independent unit-noise observations per step: P(k) = 1/(2k+1)
    let mut rng = SmallRng::seed_from_u64(0xCF0F_1DE6);
    let mut draw = move || -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        10.0 + z
    };

    let x0 = draw();
    let mut filter = KalmanFilter::new(identity_spec(2, x0, 1.0));

    for k in 1..=50u32 {
        let input = KalmanInput::new(t0() + secs(i64::from(k)), dvector![draw(), draw()]);
        let state = filter.notify_input(&input).expect("step");

        assert_relative_eq!(
            state.state().state_cov()[(0, 0)],
            1.0 / f64::from(2 * k + 1),
            max_relative = 1e-3
        );
        assert_eq!(state.gain().shape(), (1, 2));
    }
}

// ============================================================================
// Service wiring
// ============================================================================

#[test]
fn filter_svc_publishes_one_state_per_input() {
    use citrine_reactor::{CollectSink, Reactor, SecondarySource};

    use crate::KalmanFilterSvc;

    let reactor = Reactor::new(t0());
    let observations = SecondarySource::<KalmanInput>::new("observations");

    let svc = KalmanFilterSvc::new(identity_spec(1, 0.0, 1.0));
    observations.subscribe(svc.input_sink());

    let outputs = CollectSink::<KalmanStateExt>::new();
    svc.add_filter_callback(outputs.handle());

    reactor.add_source(observations.clone()).expect("add source");

    for k in 1..=5i64 {
        observations
            .publish(KalmanInput::new(t0() + secs(k), dvector![1.0]))
            .expect("publish observation");
    }

    reactor.run_until(t0() + secs(10)).expect("run");

    let states = outputs.snapshot();
    assert_eq!(states.len(), 5);
    for (i, state) in states.iter().enumerate() {
        assert_eq!(state.step_no(), i as u32 + 1);
        assert_eq!(state.tm(), t0() + secs(i as i64 + 1));
    }

    assert_eq!(svc.state().step_no(), 5);
}
