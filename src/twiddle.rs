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

//! Coordinate descent ("Twiddle") over the parallel gains.
//!
//! The search visits `Kp`, `Ki` and `Kd` in turn. For each it tries `+dp`; if the error improves,
//! the step grows by 5%. Otherwise it tries `−dp` from the original value, and if that fails too,
//! reverts and shrinks the step by 5%. Each trial is judged on the error one controller sample
//! after it was applied. The search ends once the steps sum to no more than the threshold.

use core::time::Duration;

use log::{debug, info};

use crate::error::ConfigError;
use crate::gains::PidGains;
use crate::pid::{PidConfig, PidController};
use crate::real::Real;
use crate::time::InstantLike;
use crate::tuner::Tuner;

const PARAMS: usize = 3;

/// Configuration of the [`CoordinateDescentTuner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateDescentConfig<F> {
    steps: [F; PARAMS],
    threshold: F,
    sample_time: Duration,
    output_min: F,
    output_max: F,
}

impl<F: Real> Default for CoordinateDescentConfig<F> {
    fn default() -> Self {
        Self {
            steps: [F::lit(0.1), F::lit(0.05), F::lit(0.01)],
            threshold: F::lit(0.005),
            sample_time: Duration::from_millis(10),
            output_min: -F::one(),
            output_max: F::one(),
        }
    }
}

impl<F: Real> CoordinateDescentConfig<F> {
    /// Returns the initial `[Kp, Ki, Kd]` step sizes.
    pub fn steps(&self) -> [F; PARAMS] {
        self.steps
    }

    /// Returns the step-sum at which the search ends.
    pub fn threshold(&self) -> F {
        self.threshold
    }

    /// Returns the controller sample time.
    pub fn sample_time(&self) -> Duration {
        self.sample_time
    }

    /// Returns `(output_min, output_max)`.
    pub fn output_limits(&self) -> (F, F) {
        (self.output_min, self.output_max)
    }

    /// Sets the initial `[Kp, Ki, Kd]` step sizes. Each must be positive and finite.
    pub fn set_steps(&mut self, steps: [F; PARAMS]) -> Result<(), ConfigError> {
        if steps.iter().any(|step| *step <= F::zero() || !step.is_finite()) {
            return Err(ConfigError::InvalidStepSize);
        }
        self.steps = steps;
        Ok(())
    }

    /// Sets the termination threshold. Must be positive and finite.
    pub fn set_threshold(&mut self, threshold: F) -> Result<(), ConfigError> {
        if threshold <= F::zero() || !threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold);
        }
        self.threshold = threshold;
        Ok(())
    }

    /// Sets the controller sample time, which must be non-zero.
    pub fn set_sample_time(&mut self, sample_time: Duration) -> Result<(), ConfigError> {
        if sample_time.is_zero() {
            return Err(ConfigError::InvalidSampleTime);
        }
        self.sample_time = sample_time;
        Ok(())
    }

    /// Sets the output limits, which also bound the integral term.
    pub fn set_output_limits(&mut self, output_min: F, output_max: F) -> Result<(), ConfigError> {
        if output_min.is_nan() || output_max.is_nan() || output_min >= output_max {
            return Err(ConfigError::InvalidOutputLimits);
        }
        self.output_min = output_min;
        self.output_max = output_max;
        Ok(())
    }

    fn pid_config(&self, gains: PidGains<F>) -> Result<PidConfig<F>, ConfigError> {
        let mut config = PidConfig::default();
        config.set_gains(gains);
        config.set_sample_time(self.sample_time)?;
        config.set_output_limits(self.output_min, self.output_max)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    TryIncrease(usize),
    TryDecrease(usize),
    Done,
}

/// Coordinate-descent tuner driving its own PID controller.
#[derive(Debug)]
pub struct CoordinateDescentTuner<'a, I: InstantLike, F: Real> {
    gains: &'a mut PidGains<F>,
    config: CoordinateDescentConfig<F>,
    pid: Option<PidController<I, F>>,
    params: [F; PARAMS],
    steps: [F; PARAMS],
    best_error: F,
    phase: Phase,
    trials: usize,
}

impl<'a, I: InstantLike, F: Real> CoordinateDescentTuner<'a, I, F> {
    /// Creates a tuner searching from the current value of `gains`.
    pub fn new(gains: &'a mut PidGains<F>, config: CoordinateDescentConfig<F>) -> Self {
        let (kp, ki, kd) = gains.parallel();
        Self {
            gains,
            config,
            pid: None,
            params: [kp, ki, kd],
            steps: config.steps,
            best_error: F::infinity(),
            phase: Phase::Idle,
            trials: 0,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CoordinateDescentConfig<F> {
        &self.config
    }

    /// Returns the current `[Kp, Ki, Kd]` step sizes.
    pub fn steps(&self) -> [F; PARAMS] {
        self.steps
    }

    /// Returns the smallest absolute error seen so far.
    pub fn best_error(&self) -> F {
        self.best_error
    }

    /// Returns the number of trials evaluated.
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// `[Kp, Ki, Kd]` with any pending trial reverted.
    pub fn best_params(&self) -> [F; PARAMS] {
        let mut params = self.params;
        match self.phase {
            Phase::TryIncrease(i) => params[i] = params[i] - self.steps[i],
            Phase::TryDecrease(i) => params[i] = params[i] + self.steps[i],
            Phase::Idle | Phase::Done => {}
        }
        params
    }

    fn step_sum(&self) -> F {
        self.steps.iter().fold(F::zero(), |sum, step| sum + *step)
    }

    fn improved(&mut self, error: F) -> bool {
        if error < self.best_error {
            self.best_error = error;
            true
        } else {
            false
        }
    }

    /// Judges the running trial on `error` and starts the next one.
    fn advance(&mut self, error: F) {
        let grow = F::lit(1.05);
        match self.phase {
            Phase::Idle => {
                self.best_error = error;
                self.try_increase(0);
            }
            Phase::TryIncrease(i) => {
                self.trials += 1;
                if self.improved(error) {
                    self.steps[i] = self.steps[i] * grow;
                    self.next_param(i);
                } else {
                    self.params[i] = self.params[i] - F::lit(2.0) * self.steps[i];
                    self.phase = Phase::TryDecrease(i);
                }
            }
            Phase::TryDecrease(i) => {
                self.trials += 1;
                if self.improved(error) {
                    self.steps[i] = self.steps[i] * grow;
                } else {
                    self.params[i] = self.params[i] + self.steps[i];
                    self.steps[i] = self.steps[i] * F::lit(0.95);
                }
                self.next_param(i);
            }
            Phase::Done => {}
        }
    }

    fn next_param(&mut self, i: usize) {
        let next = (i + 1) % PARAMS;
        if next == 0 {
            debug!(
                "coordinate descent round done: params {:?}, steps {:?}, best error {:?}",
                self.params, self.steps, self.best_error
            );
        }
        self.try_increase(next);
    }

    fn try_increase(&mut self, i: usize) {
        if i == 0 && self.step_sum() <= self.config.threshold {
            self.phase = Phase::Done;
            info!(
                "coordinate descent finished after {} trials with gains {:?}",
                self.trials, self.params
            );
            return;
        }
        self.params[i] = self.params[i] + self.steps[i];
        self.phase = Phase::TryIncrease(i);
    }

    /// Writes `params` to the borrowed gains and the controller.
    ///
    /// The search may wander outside the valid range, so the applied gains are clamped: `Kp` to at
    /// least machine epsilon, `Ki` and `Kd` to at least zero.
    fn apply(&mut self, params: [F; PARAMS]) {
        let [kp, ki, kd] = params;
        let clamped = PidGains::from_parallel(
            kp.max(F::epsilon()),
            ki.max(F::zero()),
            kd.max(F::zero()),
        );
        match clamped {
            Ok(gains) => {
                *self.gains = gains;
                if let Some(pid) = self.pid.as_mut() {
                    pid.config_mut().set_gains(gains);
                }
            }
            Err(err) => debug!("skipping gains {:?}: {:?}", params, err),
        }
    }
}

impl<I: InstantLike, F: Real> Tuner<I, F> for CoordinateDescentTuner<'_, I, F> {
    fn initialize(&mut self, _input: F, output: F) -> bool {
        if self.pid.is_some() {
            return false;
        }
        let (kp, ki, kd) = self.gains.parallel();
        let config = match self.config.pid_config(*self.gains) {
            Ok(config) => config,
            Err(err) => {
                debug!("cannot start coordinate descent: {:?}", err);
                return false;
            }
        };
        let mut pid = PidController::new(config);
        pid.reset(output);
        self.pid = Some(pid);
        self.params = [kp, ki, kd];
        self.steps = self.config.steps;
        self.best_error = F::infinity();
        self.phase = Phase::Idle;
        self.trials = 0;
        true
    }

    fn update(&mut self, input: F, setpoint: F, timestamp: I) -> bool {
        if self.phase == Phase::Done {
            return false;
        }
        let Some(pid) = self.pid.as_ref() else {
            return false;
        };
        if !timestamp.has_elapsed(pid.last_time(), self.config.sample_time) {
            return false;
        }

        self.advance((setpoint - input).abs());
        let params = if self.phase == Phase::Done {
            self.best_params()
        } else {
            self.params
        };
        self.apply(params);

        if let Some(pid) = self.pid.as_mut() {
            pid.compute(input, setpoint, timestamp, None);
        }
        true
    }

    fn interrupt(&mut self) {
        if self.pid.take().is_some() {
            self.params = self.best_params();
            self.apply(self.params);
            self.phase = Phase::Idle;
            debug!("coordinate descent interrupted, gains {:?}", self.gains.parallel());
        }
    }

    fn output(&self) -> F {
        self.pid
            .as_ref()
            .map_or_else(F::zero, |pid| pid.output())
    }

    fn ended(&self) -> bool {
        self.phase == Phase::Done
    }

    fn gains(&self) -> &PidGains<F> {
        self.gains
    }
}
