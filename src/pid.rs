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

//! A discrete PID controller driven by [`PidGains`].
//!
//! This is the controller the coordinate-descent tuner drives while it searches, and the one a
//! caller can resume normal operation with once a tuner has written its gains.
//!
//! - It's a no-op if called before one sample period has elapsed.
//! - The first computation after construction or [`PidController::reset`] is bumpless: the
//!   integral term is seeded with the last output.
//! - Anti reset-windup: the integral term and the output are both clamped to the output limits.
//! - Optional derivative-on-measurement to mitigate derivative kick.

use core::time::Duration;

use crate::error::ConfigError;
use crate::gains::PidGains;
use crate::real::Real;
use crate::time::InstantLike;

/// Gains, timing and limits of a [`PidController`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PidConfig<F> {
    /// Controller gains.
    /// Defaults to a unit proportional controller.
    gains: PidGains<F>,

    /// Sampling time for the PID controller.
    /// Defaults to 10ms.
    sample_time: Duration,

    /// Minimum output value of the PID controller.
    /// Defaults to negative infinity, i.e. no limit.
    output_min: F,

    /// Maximum output value of the PID controller.
    /// Defaults to positive infinity, i.e. no limit.
    output_max: F,

    /// Whether to apply the derivative on the measurement.
    /// If true, the derivative term is computed using the NEGATIVE backward difference between the
    /// current and previous input.
    /// Defaults to false.
    use_derivative_on_measurement: bool,
}

impl<F: Real> Default for PidConfig<F> {
    fn default() -> Self {
        PidConfig {
            gains: PidGains::default(),
            sample_time: Duration::from_millis(10),
            output_min: F::neg_infinity(),
            output_max: F::infinity(),
            use_derivative_on_measurement: false,
        }
    }
}

impl<F: Real> PidConfig<F> {
    /// Returns the gains.
    pub fn gains(&self) -> &PidGains<F> {
        &self.gains
    }

    /// Returns the proportional gain.
    pub fn kp(&self) -> F {
        self.gains.kp()
    }

    /// Returns the integral gain.
    pub fn ki(&self) -> F {
        self.gains.ki()
    }

    /// Returns the derivative gain.
    pub fn kd(&self) -> F {
        self.gains.kd()
    }

    /// Returns the sampling time for the PID controller.
    pub fn sample_time(&self) -> Duration {
        self.sample_time
    }

    /// Returns the minimum output limit.
    pub fn output_min(&self) -> F {
        self.output_min
    }

    /// Returns the maximum output limit.
    pub fn output_max(&self) -> F {
        self.output_max
    }

    /// Returns the flag indicating whether to apply the derivative on the measurement.
    pub fn use_derivative_on_measurement(&self) -> bool {
        self.use_derivative_on_measurement
    }

    /// Replaces the gains wholesale.
    pub fn set_gains(&mut self, gains: PidGains<F>) {
        self.gains = gains;
    }

    /// Sets the proportional gain, keeping the integral and derivative gains.
    pub fn set_kp(&mut self, kp: F) -> Result<(), ConfigError> {
        self.gains.set_kp(kp)
    }

    /// Sets the integral gain.
    pub fn set_ki(&mut self, ki: F) -> Result<(), ConfigError> {
        self.gains.set_ki(ki)
    }

    /// Sets the derivative gain.
    pub fn set_kd(&mut self, kd: F) -> Result<(), ConfigError> {
        self.gains.set_kd(kd)
    }

    /// Sets the sample time for the PID controller.
    ///
    /// # Errors
    /// - `InvalidSampleTime` if the sample time is zero.
    pub fn set_sample_time(&mut self, sample_time: Duration) -> Result<(), ConfigError> {
        if sample_time.is_zero() {
            return Err(ConfigError::InvalidSampleTime);
        }
        self.sample_time = sample_time;
        Ok(())
    }

    /// Sets the minimum and maximum output limits for the PID controller.
    ///
    /// These limits may be set to infinity to disable clamping.
    ///
    /// # Errors
    /// - `InvalidOutputLimits` if the minimum limit is greater than or equal to the maximum
    ///   limit, or either limit is NaN.
    pub fn set_output_limits(&mut self, output_min: F, output_max: F) -> Result<(), ConfigError> {
        if output_min.is_nan() || output_max.is_nan() || output_min >= output_max {
            return Err(ConfigError::InvalidOutputLimits);
        }
        self.output_min = output_min;
        self.output_max = output_max;
        Ok(())
    }

    /// Sets whether to apply the derivative on the measurement.
    pub fn set_use_derivative_on_measurement(&mut self, use_derivative_on_measurement: bool) {
        self.use_derivative_on_measurement = use_derivative_on_measurement;
    }

    pub(crate) fn clamp(&self, value: F) -> F {
        value.max(self.output_min).min(self.output_max)
    }
}

/// Builder for [`PidConfig`]. Values are validated in [`PidConfigBuilder::build`].
#[derive(Copy, Clone, Debug)]
pub struct PidConfigBuilder<F> {
    kp: Option<F>,
    ki: Option<F>,
    kd: Option<F>,
    sample_time: Option<Duration>,
    output_limits: Option<(F, F)>,
    use_derivative_on_measurement: bool,
}

impl<F> Default for PidConfigBuilder<F> {
    fn default() -> Self {
        Self {
            kp: None,
            ki: None,
            kd: None,
            sample_time: None,
            output_limits: None,
            use_derivative_on_measurement: false,
        }
    }
}

impl<F: Real> PidConfigBuilder<F> {
    pub fn kp(mut self, kp: F) -> Self {
        self.kp = Some(kp);
        self
    }

    pub fn ki(mut self, ki: F) -> Self {
        self.ki = Some(ki);
        self
    }

    pub fn kd(mut self, kd: F) -> Self {
        self.kd = Some(kd);
        self
    }

    pub fn sample_time(mut self, sample_time: Duration) -> Self {
        self.sample_time = Some(sample_time);
        self
    }

    pub fn output_limits(mut self, output_min: F, output_max: F) -> Self {
        self.output_limits = Some((output_min, output_max));
        self
    }

    pub fn use_derivative_on_measurement(mut self, use_derivative_on_measurement: bool) -> Self {
        self.use_derivative_on_measurement = use_derivative_on_measurement;
        self
    }

    /// Validates the collected values on top of the defaults.
    pub fn build(self) -> Result<PidConfig<F>, ConfigError> {
        let mut config = PidConfig::default();
        if let Some(kp) = self.kp {
            config.set_kp(kp)?;
        }
        if let Some(ki) = self.ki {
            config.set_ki(ki)?;
        }
        if let Some(kd) = self.kd {
            config.set_kd(kd)?;
        }
        if let Some(sample_time) = self.sample_time {
            config.set_sample_time(sample_time)?;
        }
        if let Some((output_min, output_max)) = self.output_limits {
            config.set_output_limits(output_min, output_max)?;
        }
        config.set_use_derivative_on_measurement(self.use_derivative_on_measurement);
        Ok(config)
    }
}

/// A stateful PID controller.
///
/// ```rust
/// use discrete_autotune::pid::{PidConfigBuilder, PidController};
/// use discrete_autotune::time::Millis;
///
/// let config = PidConfigBuilder::default()
///     .kp(2.0)
///     .ki(1.0)
///     .build()
///     .expect("Invalid PID config");
/// let mut pid = PidController::<Millis, f64>::new(config);
///
/// let output = pid.compute(1.0, 2.0, Millis(0), None);
/// assert_eq!(output, 2.0);
/// // Called again within the 10 ms sample time: the previous output is held
/// assert_eq!(pid.compute(5.0, 2.0, Millis(5), None), output);
/// ```
#[derive(Clone, Debug)]
pub struct PidController<I: InstantLike, F: Real> {
    config: PidConfig<F>,
    i_term: F,
    last_input: F,
    last_err: F,
    last_output: F,
    last_time: Option<I>,
    need_initialize: bool,
}

impl<I: InstantLike, F: Real> PidController<I, F> {
    /// Creates a controller whose first computation starts bumplessly from a zero output.
    pub fn new(config: PidConfig<F>) -> Self {
        Self {
            config,
            i_term: F::zero(),
            last_input: F::zero(),
            last_err: F::zero(),
            last_output: F::zero(),
            last_time: None,
            need_initialize: true,
        }
    }

    pub fn config(&self) -> &PidConfig<F> {
        &self.config
    }

    /// Gives access to the configuration, e.g. to swap in tuned gains.
    pub fn config_mut(&mut self) -> &mut PidConfig<F> {
        &mut self.config
    }

    /// Returns the last computed output.
    pub fn output(&self) -> F {
        self.last_output
    }

    /// Returns the error seen by the last computation.
    pub fn error(&self) -> F {
        self.last_err
    }

    /// Returns the timestamp of the last computation.
    pub fn last_time(&self) -> Option<I> {
        self.last_time
    }

    /// Forgets all state. The next computation starts bumplessly from `output`.
    pub fn reset(&mut self, output: F) {
        self.i_term = F::zero();
        self.last_output = output;
        self.last_time = None;
        self.need_initialize = true;
    }

    /// Computes the control output for one sample.
    ///
    /// Returns the previous output unchanged if less than one sample time has elapsed since the
    /// last computation.
    pub fn compute(&mut self, input: F, setpoint: F, timestamp: I, feedforward: Option<F>) -> F {
        // Do not compute if the time delta is less than the sample time
        if !timestamp.has_elapsed(self.last_time, self.config.sample_time) {
            return self.last_output;
        }
        let delta_t = match self.last_time {
            Some(last_time) => timestamp.duration_since(last_time),
            None => self.config.sample_time,
        };
        let delta_t = F::lit(delta_t.as_secs_f64());

        let error = setpoint - input;

        if self.need_initialize {
            self.last_input = input;
            self.last_err = error;
            self.i_term = self.config.clamp(self.last_output);
            self.need_initialize = false;
        }

        // Optional derivative on measurement to mitigate derivative kick
        let raw_derivative = if self.config.use_derivative_on_measurement {
            self.last_input - input // Note reversed order of operands
        } else {
            error - self.last_err
        };
        let derivative = raw_derivative / delta_t;

        let (kp, ki, kd) = self.config.gains.parallel();
        let output = kp * error
            + self.i_term
            + kd * derivative
            + feedforward.unwrap_or_else(F::zero);
        let clamped_output = self.config.clamp(output);

        // Strictly causal integrator: the integral picks up this error on the next computation
        self.i_term = self.config.clamp(self.i_term + ki * delta_t * error);

        self.last_input = input;
        self.last_err = error;
        self.last_time = Some(timestamp);
        self.last_output = clamped_output;
        clamped_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Millis;
    use approx::assert_relative_eq;

    #[test]
    fn test_builder_rejects_invalid_values() {
        assert_eq!(
            PidConfigBuilder::<f64>::default().kp(0.0).build().map(|_| ()),
            Err(ConfigError::InvalidProportionalGain)
        );
        assert_eq!(
            PidConfigBuilder::<f64>::default()
                .sample_time(Duration::ZERO)
                .build()
                .map(|_| ()),
            Err(ConfigError::InvalidSampleTime)
        );
        assert_eq!(
            PidConfigBuilder::<f64>::default()
                .output_limits(1.0, -1.0)
                .build()
                .map(|_| ()),
            Err(ConfigError::InvalidOutputLimits)
        );
    }

    #[test]
    fn test_integral_accumulates_after_output() {
        let config = PidConfigBuilder::default()
            .kp(1.0)
            .ki(10.0)
            .sample_time(Duration::from_millis(100))
            .build()
            .unwrap();
        let mut pid = PidController::<Millis, f64>::new(config);

        // First output is purely proportional
        assert_relative_eq!(pid.compute(0.0, 1.0, Millis(0), None), 1.0);
        // ki * dt * e = 10 * 0.1 * 1 from the previous sample
        assert_relative_eq!(pid.compute(0.0, 1.0, Millis(100), None), 2.0);
        assert_relative_eq!(pid.compute(0.0, 1.0, Millis(200), None), 3.0);
    }

    #[test]
    fn test_output_and_integral_are_clamped() {
        let config = PidConfigBuilder::default()
            .kp(1.0)
            .ki(100.0)
            .output_limits(-1.0, 1.0)
            .build()
            .unwrap();
        let mut pid = PidController::<Millis, f64>::new(config);
        for t in 0..100 {
            assert!(pid.compute(0.0, 10.0, Millis(t * 10), None) <= 1.0);
        }
        // The integral is held at the limit, so the output leaves saturation at once
        assert_relative_eq!(pid.compute(0.0, -0.5, Millis(1000), None), 0.5);
    }

    #[test]
    fn test_bumpless_start_from_previous_output() {
        let config = PidConfigBuilder::default().kp(1.0).build().unwrap();
        let mut pid = PidController::<Millis, f64>::new(config);
        pid.reset(4.0);
        assert_relative_eq!(pid.compute(1.0, 1.0, Millis(0), None), 4.0);
    }

    #[test]
    fn test_derivative_on_measurement_ignores_setpoint_steps() {
        let config = PidConfigBuilder::default()
            .kp(1.0)
            .kd(0.1)
            .use_derivative_on_measurement(true)
            .build()
            .unwrap();
        let mut pid = PidController::<Millis, f64>::new(config);
        pid.compute(0.0, 0.0, Millis(0), None);
        // A setpoint step with a constant measurement produces no derivative kick
        assert_relative_eq!(pid.compute(0.0, 1.0, Millis(10), None), 1.0);
    }
}
