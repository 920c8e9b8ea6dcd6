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

//! Online gain adaptation by a sign-only gradient step.
//!
//! Each gain θ is treated as the slope of a one-parameter model `h(x) = θ·x` that should predict
//! the next feedback from the previous one. When the prediction misses by more than the loss
//! tolerance, θ moves by a fixed fraction of itself:
//!
//! ```text
//! step = θ · learning_rate
//! θ ← θ − step    if (θ·prev − new)·prev ≥ 0
//! θ ← θ + step    otherwise
//! ```
//!
//! A true gradient step `lr·(θ·prev − new)·prev` grows with the square of the feedback and
//! diverges on large signals; scaling by θ keeps every step bounded and, with a learning rate in
//! `(0, 1)`, never flips the sign of a gain.

use core::time::Duration;

use log::{debug, warn};

use crate::error::ConfigError;
use crate::gains::PidGains;
use crate::real::Real;
use crate::time::InstantLike;
use crate::tuner::Tuner;

/// Which term carries the proportional action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProportionalMode {
    /// `Kp · error` in the output, with `Kp` adapted online.
    #[default]
    OnError,
    /// `−Kp · input` folded into the integral sum, with `Kp` held fixed.
    OnMeasurement,
}

/// Configuration of the [`GradientDescentTuner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientDescentConfig<F> {
    learning_rate: F,
    max_loss: F,
    output_min: F,
    output_max: F,
    sample_time: Duration,
    proportional_mode: ProportionalMode,
}

impl<F: Real> Default for GradientDescentConfig<F> {
    fn default() -> Self {
        Self {
            learning_rate: F::lit(0.01),
            max_loss: F::lit(0.01),
            output_min: -F::one(),
            output_max: F::one(),
            sample_time: Duration::from_millis(100),
            proportional_mode: ProportionalMode::OnError,
        }
    }
}

impl<F: Real> GradientDescentConfig<F> {
    /// Returns the fraction of a gain moved per step.
    pub fn learning_rate(&self) -> F {
        self.learning_rate
    }

    /// Returns the loss tolerance below which neither gains nor outputs change.
    pub fn max_loss(&self) -> F {
        self.max_loss
    }

    /// Returns `(output_min, output_max)`.
    pub fn output_limits(&self) -> (F, F) {
        (self.output_min, self.output_max)
    }

    /// Returns the sample time.
    pub fn sample_time(&self) -> Duration {
        self.sample_time
    }

    /// Returns the proportional mode.
    pub fn proportional_mode(&self) -> ProportionalMode {
        self.proportional_mode
    }

    /// Sets the learning rate, which must lie strictly between 0 and 1.
    pub fn set_learning_rate(&mut self, learning_rate: F) -> Result<(), ConfigError> {
        if !(learning_rate > F::zero() && learning_rate < F::one()) {
            return Err(ConfigError::InvalidLearningRate);
        }
        self.learning_rate = learning_rate;
        Ok(())
    }

    /// Sets the loss tolerance, which must be non-negative and finite.
    pub fn set_max_loss(&mut self, max_loss: F) -> Result<(), ConfigError> {
        if max_loss < F::zero() || !max_loss.is_finite() {
            return Err(ConfigError::InvalidMaxLoss);
        }
        self.max_loss = max_loss;
        Ok(())
    }

    /// Sets the output limits.
    pub fn set_output_limits(&mut self, output_min: F, output_max: F) -> Result<(), ConfigError> {
        if output_min.is_nan() || output_max.is_nan() || output_min >= output_max {
            return Err(ConfigError::InvalidOutputLimits);
        }
        self.output_min = output_min;
        self.output_max = output_max;
        Ok(())
    }

    /// Sets the sample time, which must be non-zero.
    pub fn set_sample_time(&mut self, sample_time: Duration) -> Result<(), ConfigError> {
        if sample_time.is_zero() {
            return Err(ConfigError::InvalidSampleTime);
        }
        self.sample_time = sample_time;
        Ok(())
    }

    /// Sets the proportional mode.
    pub fn set_proportional_mode(&mut self, proportional_mode: ProportionalMode) {
        self.proportional_mode = proportional_mode;
    }

    fn clamp(&self, value: F) -> F {
        value.max(self.output_min).min(self.output_max)
    }
}

/// A PID controller that adapts its own gains while it runs.
///
/// The tuner never ends by itself; interrupt it once the loop behaves.
#[derive(Debug)]
pub struct GradientDescentTuner<'a, I: InstantLike, F: Real> {
    gains: &'a mut PidGains<F>,
    config: GradientDescentConfig<F>,
    active: bool,
    learning: bool,
    last_input: F,
    last_error: F,
    last_d_input: F,
    last_time: Option<I>,
    output_sum: F,
    total_error: F,
    output: F,
}

impl<'a, I: InstantLike, F: Real> GradientDescentTuner<'a, I, F> {
    /// Creates a tuner adapting `gains` in place.
    pub fn new(gains: &'a mut PidGains<F>, config: GradientDescentConfig<F>) -> Self {
        Self {
            gains,
            config,
            active: false,
            learning: true,
            last_input: F::zero(),
            last_error: F::zero(),
            last_d_input: F::zero(),
            last_time: None,
            output_sum: F::zero(),
            total_error: F::zero(),
            output: F::zero(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GradientDescentConfig<F> {
        &self.config
    }

    /// Returns the error accumulated since the last reset of the integral sum.
    pub fn total_error(&self) -> F {
        self.total_error
    }

    /// Returns whether the tuner is running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns whether gains are being adapted.
    pub fn is_learning(&self) -> bool {
        self.learning
    }

    /// Freezes or unfreezes the gains. Outputs keep being computed either way.
    pub fn set_learning_enabled(&mut self, learning: bool) {
        self.learning = learning;
    }

    /// Changes the output limits and clamps the current output and integral sum to them.
    pub fn set_output_limits(&mut self, output_min: F, output_max: F) -> Result<(), ConfigError> {
        self.config.set_output_limits(output_min, output_max)?;
        self.output = self.config.clamp(self.output);
        self.output_sum = self.config.clamp(self.output_sum);
        Ok(())
    }

    fn reset_total(&mut self) {
        self.output_sum = F::zero();
        self.total_error = F::zero();
    }

    fn learn(&self, prev_feedback: F, new_feedback: F, theta: F) -> F {
        if !self.learning {
            return theta;
        }
        let loss = theta * prev_feedback - new_feedback;
        if loss.abs() < self.config.max_loss {
            return theta;
        }
        let step = theta * self.config.learning_rate;
        if loss * prev_feedback < F::zero() {
            theta + step
        } else {
            theta - step
        }
    }
}

impl<I: InstantLike, F: Real> Tuner<I, F> for GradientDescentTuner<'_, I, F> {
    fn initialize(&mut self, input: F, output: F) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.output = self.config.clamp(output);
        self.output_sum = self.output;
        self.total_error = F::zero();
        self.last_input = input;
        self.last_error = F::zero();
        self.last_d_input = F::zero();
        self.last_time = None;
        debug!("gradient descent tuner started at output {:?}", self.output);
        true
    }

    fn update(&mut self, input: F, setpoint: F, timestamp: I) -> bool {
        if !self.active || !timestamp.has_elapsed(self.last_time, self.config.sample_time) {
            return false;
        }
        let delta_t = match self.last_time {
            Some(last_time) => timestamp.duration_since(last_time),
            None => self.config.sample_time,
        };
        let delta_t = F::lit(delta_t.as_secs_f64());
        self.last_time = Some(timestamp);

        let error = setpoint - input;
        if error.abs() < self.config.max_loss {
            // On target: hold the output and start integrating afresh
            self.reset_total();
            return true;
        }

        let d_input = input - self.last_input;
        let (kp, ki, kd) = self.gains.parallel();

        let ki = self.learn(self.total_error, self.total_error + error, ki);
        self.total_error = self.total_error + error;
        if self.last_error * error < F::zero() {
            // The error changed sign, so the accumulated error no longer applies
            self.reset_total();
        } else {
            self.output_sum = ki * delta_t * self.total_error;
        }
        if self.config.proportional_mode == ProportionalMode::OnMeasurement {
            self.output_sum = self.output_sum - kp * input;
        }
        self.output_sum = self.config.clamp(self.output_sum);

        let (kp, mut output) = match self.config.proportional_mode {
            ProportionalMode::OnError => {
                let kp = self.learn(setpoint - self.last_input, error, kp);
                (kp, kp * error)
            }
            ProportionalMode::OnMeasurement => (kp, F::zero()),
        };

        let kd = self.learn(self.last_d_input, d_input, kd);
        output = output + self.output_sum - kd * d_input / delta_t;
        self.output = self.config.clamp(output);

        match PidGains::from_parallel(kp, ki, kd) {
            Ok(gains) => *self.gains = gains,
            Err(err) => warn!(
                "rejected adapted gains ({:?}, {:?}, {:?}): {:?}",
                kp, ki, kd, err
            ),
        }

        self.last_d_input = d_input;
        self.last_input = input;
        self.last_error = error;
        true
    }

    fn interrupt(&mut self) {
        if self.active {
            debug!(
                "gradient descent tuner stopped with gains {:?}",
                self.gains.parallel()
            );
        }
        self.active = false;
    }

    fn output(&self) -> F {
        self.output
    }

    fn ended(&self) -> bool {
        false
    }

    fn gains(&self) -> &PidGains<F> {
        self.gains
    }
}
