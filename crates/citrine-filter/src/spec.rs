//! Filter specification: step construction and the stateful driver.

use crate::engine;
use crate::error::FilterError;
use crate::model::{KalmanInput, KalmanObservable, KalmanTransition};
use crate::state::{KalmanState, KalmanStateExt};

/// Everything needed for one filter step `t(k) → t(k+1)`: the prior state,
/// the step's transition/observation models, and the observation.
#[derive(Debug, Clone)]
pub struct KalmanStep {
    state: KalmanState,
    model: KalmanTransition,
    obs: KalmanObservable,
    input: KalmanInput,
}

impl KalmanStep {
    pub fn new(
        state: KalmanState,
        model: KalmanTransition,
        obs: KalmanObservable,
        input: KalmanInput,
    ) -> Self {
        Self {
            state,
            model,
            obs,
            input,
        }
    }

    pub fn state(&self) -> &KalmanState {
        &self.state
    }

    pub fn model(&self) -> &KalmanTransition {
        &self.model
    }

    pub fn obs(&self) -> &KalmanObservable {
        &self.obs
    }

    pub fn input(&self) -> &KalmanInput {
        &self.input
    }

    /// Time `t(k+1)` this step lands on.
    pub fn tkp1(&self) -> citrine_types::Timestamp {
        self.input.tm()
    }
}

/// Produces the step matrices for one filter step.
///
/// Receiving the previous state and the incoming observation lets `F`, `Q`,
/// `H`, `R` depend on the elapsed `Δt = t(k+1) − t(k)` and on the
/// observation cardinality — the hook that makes event-driven (irregularly
/// timed) filtering work with a textbook linear filter.
pub type MkStepFn = Box<dyn Fn(&KalmanState, &KalmanInput) -> (KalmanTransition, KalmanObservable)>;

/// Full specification of a filter: a starting extended state and the step
/// constructor.
pub struct KalmanFilterSpec {
    s0: KalmanStateExt,
    mk_step: MkStepFn,
}

impl KalmanFilterSpec {
    pub fn new(s0: KalmanStateExt, mk_step: MkStepFn) -> Self {
        Self { s0, mk_step }
    }

    pub fn start(&self) -> &KalmanStateExt {
        &self.s0
    }

    /// Builds the step object for `sk → input.tm()`.
    pub fn make_step(&self, sk: &KalmanState, input: &KalmanInput) -> KalmanStep {
        let (model, obs) = (self.mk_step)(sk, input);
        KalmanStep::new(sk.clone(), model, obs, input.clone())
    }
}

impl std::fmt::Debug for KalmanFilterSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KalmanFilterSpec")
            .field("s0", &self.s0)
            .finish()
    }
}

/// The stateful driver: a spec plus the current extended state. Each
/// observation advances the filter one step.
pub struct KalmanFilter {
    spec: KalmanFilterSpec,
    state: KalmanStateExt,
}

impl KalmanFilter {
    pub fn new(spec: KalmanFilterSpec) -> Self {
        let state = spec.start().clone();
        Self { spec, state }
    }

    pub fn state(&self) -> &KalmanStateExt {
        &self.state
    }

    /// Consumes one observation: builds the step via the spec and runs
    /// extrapolate + correct. Returns the new state (also retained).
    pub fn notify_input(&mut self, input: &KalmanInput) -> Result<&KalmanStateExt, FilterError> {
        let step_spec = self.spec.make_step(self.state.state(), input);
        self.state = engine::run_step(&step_spec)?;
        Ok(&self.state)
    }
}

impl std::fmt::Debug for KalmanFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KalmanFilter")
            .field("state", &self.state)
            .finish()
    }
}
