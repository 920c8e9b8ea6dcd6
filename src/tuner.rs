// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! The common contract of every tuning strategy, and the relay-feedback tuner.

use log::debug;

use crate::autotune::{AutotuneConfig, AutotuneStatus, RelayAutotuner};
use crate::gains::PidGains;
use crate::real::Real;
use crate::time::InstantLike;

/// A strategy that drives a control loop while it tunes a borrowed set of gains.
///
/// A tuner is called once per control-loop tick in place of the PID controller. It suggests an
/// actuator command through [`Tuner::output`] and writes to the gains it borrows. Because the
/// borrow is exclusive, at most one tuner can work on a given set of gains at any time; the gains
/// are usable again once the tuner is dropped.
///
/// The trait is object safe, so the strategy can be chosen at runtime:
///
/// ```rust
/// use discrete_autotune::gains::PidGains;
/// use discrete_autotune::sgd::GradientDescentTuner;
/// use discrete_autotune::time::Millis;
/// use discrete_autotune::tuner::{Tuner, ZieglerNicholsTuner};
///
/// let mut gains = PidGains::<f64>::default();
/// let online = true;
/// let mut tuner: Box<dyn Tuner<Millis, f64> + '_> = if online {
///     Box::new(GradientDescentTuner::<Millis, f64>::new(&mut gains, Default::default()))
/// } else {
///     Box::new(ZieglerNicholsTuner::<Millis, f64>::with_default_config(&mut gains))
/// };
/// assert!(tuner.initialize(0.0, 0.0));
/// assert!(!tuner.initialize(0.0, 0.0));
/// ```
pub trait Tuner<I: InstantLike, F: Real> {
    /// Starts a session from the current process value and actuator output.
    ///
    /// Returns `false`, doing nothing, if a session is already running.
    fn initialize(&mut self, input: F, output: F) -> bool;

    /// Consumes one sample.
    ///
    /// Returns `true` if a new output was produced or the session just ended, and `false` if the
    /// sample was dropped because the tuner is not initialized, already ended, or the sample came
    /// too early.
    fn update(&mut self, input: F, setpoint: F, timestamp: I) -> bool;

    /// Stops the session. [`Tuner::initialize`] may start a new one afterwards.
    fn interrupt(&mut self);

    /// Returns the suggested actuator command.
    fn output(&self) -> F;

    /// Returns whether the session has finished on its own.
    fn ended(&self) -> bool;

    /// Returns the gains being tuned.
    fn gains(&self) -> &PidGains<F>;
}

/// Relay-feedback tuning with a classical rule, as a [`Tuner`].
///
/// The relay switches around the process value seen on the first update, so the `setpoint`
/// passed to [`Tuner::update`] is not used. The gains are written only if the relay autotuner
/// converges.
#[derive(Debug)]
pub struct ZieglerNicholsTuner<'a, I: InstantLike, F: Real> {
    gains: &'a mut PidGains<F>,
    config: AutotuneConfig<F>,
    autotuner: Option<RelayAutotuner<I, F>>,
    output: F,
}

impl<'a, I: InstantLike, F: Real> ZieglerNicholsTuner<'a, I, F> {
    /// Creates a tuner writing to `gains` on convergence, using [`AutotuneConfig::low_noise`].
    pub fn with_default_config(gains: &'a mut PidGains<F>) -> Self {
        Self::new(gains, AutotuneConfig::low_noise())
    }

    /// Creates a tuner writing to `gains` on convergence.
    pub fn new(gains: &'a mut PidGains<F>, config: AutotuneConfig<F>) -> Self {
        Self {
            gains,
            config,
            autotuner: None,
            output: F::zero(),
        }
    }

    /// Returns the configuration applied to each session.
    pub fn config(&self) -> &AutotuneConfig<F> {
        &self.config
    }

    /// Returns the relay autotuner of the running session.
    pub fn autotuner(&self) -> Option<&RelayAutotuner<I, F>> {
        self.autotuner.as_ref()
    }
}

impl<I: InstantLike, F: Real> Tuner<I, F> for ZieglerNicholsTuner<'_, I, F> {
    fn initialize(&mut self, _input: F, output: F) -> bool {
        if self.autotuner.is_some() {
            return false;
        }
        self.autotuner = Some(RelayAutotuner::new(self.config, output));
        self.output = output;
        true
    }

    fn update(&mut self, input: F, _setpoint: F, timestamp: I) -> bool {
        let Some(autotuner) = self.autotuner.as_mut() else {
            return false;
        };
        if autotuner.state().is_terminal() {
            return false;
        }

        let status = autotuner.update(input, timestamp);
        if status == AutotuneStatus::NotReady {
            return false;
        }
        if status == AutotuneStatus::Converged {
            if let Some(result) = autotuner.result() {
                *self.gains = result.gains;
            }
        }
        self.output = autotuner.output();
        true
    }

    fn interrupt(&mut self) {
        if let Some(mut autotuner) = self.autotuner.take() {
            autotuner.cancel();
            self.output = autotuner.output();
            debug!("relay tuning interrupted");
        }
    }

    fn output(&self) -> F {
        self.output
    }

    fn ended(&self) -> bool {
        self.autotuner
            .as_ref()
            .map_or(false, |autotuner| autotuner.state().is_terminal())
    }

    fn gains(&self) -> &PidGains<F> {
        self.gains
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autotune::AutotuneState;
    use crate::rules::{ControlRule, TuningRule};
    use crate::time::Millis;
    use core::time::Duration;

    #[test]
    fn test_update_before_initialize_is_ignored() {
        let mut gains = PidGains::<f64>::default();
        let mut tuner = ZieglerNicholsTuner::<Millis, f64>::new(&mut gains, Default::default());
        assert!(!tuner.update(0.0, 0.0, Millis(0)));
        assert!(!tuner.ended());
    }

    #[test]
    fn test_default_config_is_low_noise_ziegler_nichols_pid() {
        let mut gains = PidGains::<f64>::default();
        let mut tuner = ZieglerNicholsTuner::<Millis, f64>::with_default_config(&mut gains);
        assert_eq!(
            tuner.config().control_rule(),
            ControlRule::Classic(TuningRule::ZieglerNicholsPid)
        );
        assert_eq!(tuner.config().lookback(), Duration::from_secs(5));
        assert_eq!(tuner.config().noise_band(), 0.002);
        assert_eq!(tuner.config().output_step(), 10.0);

        assert!(tuner.initialize(1.0, 0.0));
        assert!(tuner.update(1.0, 1.0, Millis(0)));
        // Anything past the narrow band flips the relay
        assert!(tuner.update(1.003, 1.0, Millis(250)));
        assert_eq!(tuner.output(), -10.0);
    }

    #[test]
    fn test_interrupt_allows_new_session() {
        let mut gains = PidGains::<f64>::default();
        let mut tuner = ZieglerNicholsTuner::<Millis, f64>::new(&mut gains, Default::default());
        assert!(tuner.initialize(0.0, 2.0));
        assert!(tuner.update(0.0, 0.0, Millis(0)));
        assert_eq!(tuner.output(), 12.0);

        tuner.interrupt();
        assert!(tuner.autotuner().is_none());
        assert_eq!(tuner.output(), 2.0);

        assert!(tuner.initialize(0.0, 2.0));
        assert!(tuner.update(0.0, 0.0, Millis(10)));
        assert_eq!(
            tuner.autotuner().map(RelayAutotuner::state),
            Some(AutotuneState::RelayStepUp)
        );
    }
}
