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

//! The relay-feedback autotune state machine.
//!
//! The autotuner replaces the controller with an on/off relay around the starting process value.
//! A relay of amplitude `d` drives most processes into a limit cycle at their ultimate frequency;
//! describing-function analysis then gives the ultimate gain from the induced amplitude `a`:
//!
//! ```text
//! Ku = 4·d / (π·a)
//! ```
//!
//! The ultimate period `Pu` is measured directly from the peak times. Once the oscillation
//! amplitude has settled, `(Ku, Pu)` is mapped to PID gains by the configured [`ControlRule`].
//!
//! # State machine
//!
//! ```text
//!            first update                 input > setpoint + band
//!   Off ───────────────────► RelayStepUp ─────────────────────────► RelayStepDown
//!    │                            ▲                                      │
//!    │ (AMIGOf)                   └──────────────────────────────────────┘
//!    ▼                                    input < setpoint − band
//!   SteadyStateAtBaseline ──► SteadyStateAfterStepUp ──► RelayStepDown
//!
//!   any relay state ──► Converged | Failed(reason)   (terminal until cancel)
//! ```

use core::time::Duration;

use log::{debug, info, warn};

use crate::detector::{Oscillation, OscillationDetector};
use crate::error::ConfigError;
use crate::gains::PidGains;
use crate::real::Real;
use crate::relay_bias::RelayBias;
use crate::rules::{self, ControlRule, TuningRule};
use crate::time::InstantLike;

/// Largest relative excess of the half peak spread over the mean amplitude accepted as settled.
pub const PEAK_AMPLITUDE_TOLERANCE: f64 = 0.05;

/// Longest wait for a peak event (or, with relay bias, a relay step) before giving up.
pub const MAX_WAIT: Duration = Duration::from_secs(5 * 60);

/// Number of peak events after which an unconverged session fails.
pub const MAX_PEAKS: usize = 20;

/// Largest number of samples in the lookback window.
const MAX_LOOKBACK_SAMPLES: u64 = 100;

/// Lookbacks shorter than this are sampled at a fixed 4 Hz.
const FAST_LOOKBACK_SECS: u64 = 25;

/// Why a relay autotune session gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum FailureReason {
    /// The AMIGOf step test measured a zero or negative process gain.
    #[cfg_attr(feature = "std", error("step test yielded no usable process gain"))]
    BadProcessGainEstimate,

    /// Too long without a peak event.
    #[cfg_attr(feature = "std", error("timed out waiting for a peak"))]
    PeakTimeout,

    /// The oscillation did not settle within the peak budget.
    #[cfg_attr(feature = "std", error("oscillation did not converge"))]
    TooManyPeaks,

    /// Too long without a relay step while relay bias was enabled.
    #[cfg_attr(feature = "std", error("timed out waiting for a relay step"))]
    RelayStepTimeout,

    /// The measured oscillation mapped to gains that are not usable.
    #[cfg_attr(feature = "std", error("tuning rule produced invalid gains"))]
    DegenerateGains,
}

/// State of the relay autotuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutotuneState {
    /// Idle; the next update starts a new session.
    Off,
    /// Waiting for the process to settle before the AMIGOf step test.
    SteadyStateAtBaseline,
    /// Output stepped up; waiting for the process to settle again.
    SteadyStateAfterStepUp,
    /// Relay output high.
    RelayStepUp,
    /// Relay output low.
    RelayStepDown,
    /// The oscillation settled and gains were computed.
    Converged,
    /// The session gave up; no gains were computed.
    Failed(FailureReason),
}

impl AutotuneState {
    /// Whether the relay holds its high output in this state.
    pub fn is_output_high(&self) -> bool {
        matches!(
            self,
            AutotuneState::RelayStepUp | AutotuneState::SteadyStateAfterStepUp
        )
    }

    /// Whether this is one of the AMIGOf step-test states.
    pub fn is_steady_state_test(&self) -> bool {
        matches!(
            self,
            AutotuneState::SteadyStateAtBaseline | AutotuneState::SteadyStateAfterStepUp
        )
    }

    /// Whether the session has ended, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AutotuneState::Converged | AutotuneState::Failed(_))
    }
}

/// Outcome of a single [`RelayAutotuner::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutotuneStatus {
    /// The sample arrived before the sample time elapsed and was dropped.
    NotReady,
    /// The sample was consumed; tuning continues.
    Running,
    /// Tuning finished and gains are available.
    Converged,
    /// Tuning gave up.
    Failed(FailureReason),
}

/// What a converged session measured and the gains derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutotuneResult<F> {
    /// Ultimate gain `Ku`.
    pub ultimate_gain: F,
    /// Ultimate period `Pu` in seconds.
    pub ultimate_period: F,
    /// Static process gain from the step test (AMIGOf only).
    pub process_gain: Option<F>,
    /// Phase lag of the relay oscillation in radians (AMIGOf only).
    pub phase_lag: Option<F>,
    /// The tuned gains.
    pub gains: PidGains<F>,
}

/// Configuration of the relay autotuner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutotuneConfig<F> {
    /// Half-width of the hysteresis band around the setpoint.
    /// Defaults to 0.5.
    noise_band: F,

    /// Relay amplitude added to and subtracted from the starting output.
    /// Defaults to 10.
    output_step: F,

    /// Number of past samples a peak must dominate.
    /// Defaults to 40, i.e. a 10 s lookback at 4 Hz.
    lookback_samples: usize,

    /// Minimum spacing between accepted samples.
    /// Defaults to 250 ms.
    sample_time: Duration,

    /// Rule mapping the measured oscillation to gains.
    /// Defaults to Ziegler-Nichols PI.
    control_rule: ControlRule,

    /// Whether to bias the relay to correct asymmetric oscillations.
    /// Defaults to false.
    use_relay_bias: bool,
}

impl<F: Real> Default for AutotuneConfig<F> {
    fn default() -> Self {
        Self {
            noise_band: F::lit(0.5),
            output_step: F::lit(10.0),
            lookback_samples: 40,
            sample_time: Duration::from_millis(250),
            control_rule: ControlRule::default(),
            use_relay_bias: false,
        }
    }
}

impl<F: Real> AutotuneConfig<F> {
    /// Settings for a process value with little noise: Ziegler-Nichols PID, a 5 s lookback and a
    /// 0.002 noise band.
    ///
    /// ```rust
    /// use core::time::Duration;
    /// use discrete_autotune::autotune::AutotuneConfig;
    ///
    /// let config = AutotuneConfig::<f64>::low_noise();
    /// assert_eq!(config.lookback(), Duration::from_secs(5));
    /// assert_eq!(config.noise_band(), 0.002);
    /// ```
    pub fn low_noise() -> Self {
        Self {
            noise_band: F::lit(0.002),
            lookback_samples: 20,
            control_rule: ControlRule::Classic(TuningRule::ZieglerNicholsPid),
            ..Self::default()
        }
    }

    /// Returns the hysteresis half-width.
    pub fn noise_band(&self) -> F {
        self.noise_band
    }

    /// Returns the relay amplitude.
    pub fn output_step(&self) -> F {
        self.output_step
    }

    /// Returns the lookback window as a duration.
    pub fn lookback(&self) -> Duration {
        self.sample_time * self.lookback_samples as u32
    }

    /// Returns the number of samples in the lookback window.
    pub fn lookback_samples(&self) -> usize {
        self.lookback_samples
    }

    /// Returns the sample time implied by the lookback.
    pub fn sample_time(&self) -> Duration {
        self.sample_time
    }

    /// Returns the tuning rule applied on convergence.
    pub fn control_rule(&self) -> ControlRule {
        self.control_rule
    }

    /// Returns whether relay bias correction is enabled.
    pub fn use_relay_bias(&self) -> bool {
        self.use_relay_bias
    }

    /// Sets the hysteresis half-width. Must be non-negative and finite.
    ///
    /// The band should exceed the peak noise on the process value so that noise alone cannot flip
    /// the relay. Twice the band is also the noise margin of peak detection.
    pub fn set_noise_band(&mut self, noise_band: F) -> Result<(), ConfigError> {
        if noise_band < F::zero() || !noise_band.is_finite() {
            return Err(ConfigError::InvalidNoiseBand);
        }
        self.noise_band = noise_band;
        Ok(())
    }

    /// Sets the relay amplitude. Must be positive and finite.
    pub fn set_output_step(&mut self, output_step: F) -> Result<(), ConfigError> {
        if output_step <= F::zero() || !output_step.is_finite() {
            return Err(ConfigError::InvalidOutputStep);
        }
        self.output_step = output_step;
        Ok(())
    }

    /// Sets the lookback window, truncated to whole seconds, which also fixes the sample time.
    ///
    /// Below 25 s the window holds 4 samples per second at 250 ms. From 25 s on it holds 100
    /// samples spaced `10 · seconds` ms apart. Lookbacks shorter than one second are rejected.
    pub fn set_lookback(&mut self, lookback: Duration) -> Result<(), ConfigError> {
        let secs = lookback.as_secs();
        if secs < 1 {
            return Err(ConfigError::InvalidLookback);
        }
        let (samples, sample_time) = if secs < FAST_LOOKBACK_SECS {
            (secs * 4, Duration::from_millis(250))
        } else {
            (
                MAX_LOOKBACK_SAMPLES,
                Duration::from_millis(secs.saturating_mul(10)),
            )
        };
        self.lookback_samples = samples as usize;
        self.sample_time = sample_time;
        Ok(())
    }

    /// Sets the tuning rule applied on convergence.
    pub fn set_control_rule(&mut self, control_rule: impl Into<ControlRule>) {
        self.control_rule = control_rule.into();
    }

    /// Enables or disables relay bias correction.
    pub fn set_use_relay_bias(&mut self, use_relay_bias: bool) {
        self.use_relay_bias = use_relay_bias;
    }
}

/// Builder for [`AutotuneConfig`]. Values are validated in [`AutotuneConfigBuilder::build`].
#[derive(Debug, Clone, Copy)]
pub struct AutotuneConfigBuilder<F> {
    noise_band: Option<F>,
    output_step: Option<F>,
    lookback: Option<Duration>,
    control_rule: Option<ControlRule>,
    use_relay_bias: bool,
}

impl<F> Default for AutotuneConfigBuilder<F> {
    fn default() -> Self {
        Self {
            noise_band: None,
            output_step: None,
            lookback: None,
            control_rule: None,
            use_relay_bias: false,
        }
    }
}

impl<F: Real> AutotuneConfigBuilder<F> {
    /// Sets the hysteresis half-width.
    pub fn noise_band(mut self, noise_band: F) -> Self {
        self.noise_band = Some(noise_band);
        self
    }

    /// Sets the relay amplitude.
    pub fn output_step(mut self, output_step: F) -> Self {
        self.output_step = Some(output_step);
        self
    }

    /// Sets the lookback window.
    pub fn lookback(mut self, lookback: Duration) -> Self {
        self.lookback = Some(lookback);
        self
    }

    /// Sets the tuning rule.
    pub fn control_rule(mut self, control_rule: impl Into<ControlRule>) -> Self {
        self.control_rule = Some(control_rule.into());
        self
    }

    /// Enables relay bias correction.
    pub fn use_relay_bias(mut self, use_relay_bias: bool) -> Self {
        self.use_relay_bias = use_relay_bias;
        self
    }

    /// Validates the collected values on top of the defaults.
    pub fn build(self) -> Result<AutotuneConfig<F>, ConfigError> {
        let mut config = AutotuneConfig::default();
        if let Some(noise_band) = self.noise_band {
            config.set_noise_band(noise_band)?;
        }
        if let Some(output_step) = self.output_step {
            config.set_output_step(output_step)?;
        }
        if let Some(lookback) = self.lookback {
            config.set_lookback(lookback)?;
        }
        if let Some(control_rule) = self.control_rule {
            config.set_control_rule(control_rule);
        }
        config.set_use_relay_bias(self.use_relay_bias);
        Ok(config)
    }
}

/// Relay-feedback autotuner.
///
/// Feed it one process-value sample per call to [`RelayAutotuner::update`] and apply
/// [`RelayAutotuner::output`] to the actuator. The session starts on the first update, centering
/// the relay on the process value seen then and on the output the autotuner was created with.
/// When the status turns [`AutotuneStatus::Converged`], [`RelayAutotuner::result`] holds the tuned
/// gains and the output is back at its starting value.
///
/// ```rust
/// use discrete_autotune::autotune::{AutotuneConfig, AutotuneStatus, RelayAutotuner};
/// use discrete_autotune::time::Millis;
///
/// let mut autotuner = RelayAutotuner::<Millis, f64>::new(AutotuneConfig::default(), 0.0);
/// assert_eq!(autotuner.update(20.0, Millis(0)), AutotuneStatus::Running);
/// // The relay starts high
/// assert_eq!(autotuner.output(), 10.0);
/// // Too early; the default sample time is 250 ms
/// assert_eq!(autotuner.update(20.0, Millis(100)), AutotuneStatus::NotReady);
/// ```
#[derive(Debug, Clone)]
pub struct RelayAutotuner<I: InstantLike, F: Real> {
    config: AutotuneConfig<F>,
    state: AutotuneState,
    start: Option<I>,
    last_sample: Option<I>,
    setpoint: F,
    output: F,
    output_start: F,
    noise_band: F,
    next_noise_band: F,
    baseline: F,
    process_gain: Option<F>,
    relay_flips: usize,
    detector: OscillationDetector<F>,
    bias: RelayBias<F>,
    result: Option<AutotuneResult<F>>,
}

impl<I: InstantLike, F: Real> RelayAutotuner<I, F> {
    /// Creates an idle autotuner. `output` is the actuator command in effect before tuning.
    pub fn new(config: AutotuneConfig<F>, output: F) -> Self {
        Self {
            config,
            state: AutotuneState::Off,
            start: None,
            last_sample: None,
            setpoint: F::zero(),
            output,
            output_start: output,
            noise_band: config.noise_band,
            next_noise_band: config.noise_band,
            baseline: F::zero(),
            process_gain: None,
            relay_flips: 0,
            detector: OscillationDetector::new(config.lookback_samples),
            bias: RelayBias::new(),
            result: None,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AutotuneConfig<F> {
        &self.config
    }

    /// Returns the current state.
    pub fn state(&self) -> AutotuneState {
        self.state
    }

    /// Returns the suggested actuator command.
    pub fn output(&self) -> F {
        self.output
    }

    /// Returns the process value the relay switches around.
    pub fn setpoint(&self) -> F {
        self.setpoint
    }

    /// Returns the number of relay flips in this session.
    pub fn relay_flips(&self) -> usize {
        self.relay_flips
    }

    /// Returns the number of peak events in this session.
    pub fn peak_count(&self) -> usize {
        self.detector.peak_count()
    }

    /// Returns the outcome of a converged session.
    pub fn result(&self) -> Option<&AutotuneResult<F>> {
        self.result.as_ref()
    }

    /// Returns the tuned proportional gain.
    pub fn kp(&self) -> Option<F> {
        self.result.map(|result| result.gains.kp())
    }

    /// Returns the tuned integral gain.
    pub fn ki(&self) -> Option<F> {
        self.result.map(|result| result.gains.ki())
    }

    /// Returns the tuned derivative gain.
    pub fn kd(&self) -> Option<F> {
        self.result.map(|result| result.gains.kd())
    }

    /// Stops the session and restores the starting output. The next update starts afresh.
    ///
    /// Does nothing if the autotuner is already off.
    pub fn cancel(&mut self) {
        if self.state == AutotuneState::Off {
            return;
        }
        debug!("relay autotune cancelled in state {:?}", self.state);
        self.state = AutotuneState::Off;
        self.output = self.output_start;
        self.start = None;
        self.last_sample = None;
    }

    /// Consumes one process-value sample taken at `now`.
    ///
    /// Once terminal, every call returns the terminal status until [`RelayAutotuner::cancel`].
    pub fn update(&mut self, input: F, now: I) -> AutotuneStatus {
        if self.state.is_terminal() {
            return self.status();
        }

        let at = match self.start {
            Some(start) => {
                if !now.has_elapsed(self.last_sample, self.config.sample_time) {
                    return AutotuneStatus::NotReady;
                }
                now.duration_since(start)
            }
            None => {
                self.begin(input, now);
                Duration::ZERO
            }
        };
        self.last_sample = Some(now);

        if self.config.use_relay_bias {
            self.bias.accumulate(input);
        }
        self.switch_relay(input, at);
        self.drive_relay();

        let margin = F::lit(2.0) * self.config.noise_band;
        let Some(kind) = self.detector.push(input, margin) else {
            return AutotuneStatus::Running;
        };

        if self.state.is_steady_state_test() {
            return self.test_steady_state(at);
        }

        let peak_event = self.detector.record(kind, input, at);
        let settled = !self.config.use_relay_bias || self.bias.is_settled();
        if peak_event && self.detector.peak_count() > 4 && settled {
            let oscillation = self.detector.oscillation();
            if self.config.control_rule == ControlRule::AmigofPi
                && self.adapt_noise_band(oscillation.amplitude)
            {
                return AutotuneStatus::Running;
            }
            if oscillation.is_converged(F::lit(PEAK_AMPLITUDE_TOLERANCE)) {
                return self.finish(oscillation);
            }
        }

        if self.detector.since_last_peak(at) > MAX_WAIT {
            self.fail(FailureReason::PeakTimeout)
        } else if self.detector.peak_count() >= MAX_PEAKS {
            self.fail(FailureReason::TooManyPeaks)
        } else if self.config.use_relay_bias && self.bias.since_last_step(at) > MAX_WAIT {
            self.fail(FailureReason::RelayStepTimeout)
        } else {
            AutotuneStatus::Running
        }
    }

    fn status(&self) -> AutotuneStatus {
        match self.state {
            AutotuneState::Off => AutotuneStatus::NotReady,
            AutotuneState::Converged => AutotuneStatus::Converged,
            AutotuneState::Failed(reason) => AutotuneStatus::Failed(reason),
            _ => AutotuneStatus::Running,
        }
    }

    fn begin(&mut self, input: F, now: I) {
        self.start = Some(now);
        self.setpoint = input;
        self.output_start = self.output;
        self.noise_band = self.config.noise_band;
        self.next_noise_band = self.config.noise_band;
        self.baseline = F::zero();
        self.process_gain = None;
        self.relay_flips = 0;
        self.result = None;
        self.detector = OscillationDetector::new(self.config.lookback_samples);
        self.detector.reset(Duration::ZERO);
        self.bias.reset(Duration::ZERO);

        self.state = match self.config.control_rule {
            ControlRule::AmigofPi => AutotuneState::SteadyStateAtBaseline,
            ControlRule::Classic(_) => AutotuneState::RelayStepUp,
        };
        debug!(
            "relay autotune started around {:?} from output {:?}, entering {:?}",
            self.setpoint, self.output_start, self.state
        );
    }

    fn switch_relay(&mut self, input: F, at: Duration) {
        let next = match self.state {
            AutotuneState::RelayStepUp if input > self.setpoint + self.noise_band => {
                AutotuneState::RelayStepDown
            }
            AutotuneState::RelayStepDown if input < self.setpoint - self.noise_band => {
                AutotuneState::RelayStepUp
            }
            _ => return,
        };
        self.state = next;
        self.relay_flips += 1;
        self.noise_band = self.next_noise_band;
        if self.config.use_relay_bias {
            self.bias.on_step(
                next == AutotuneState::RelayStepDown,
                at,
                self.config.output_step,
            );
        }
    }

    fn drive_relay(&mut self) {
        let bias = if self.config.use_relay_bias {
            self.bias.bias()
        } else {
            F::zero()
        };
        if self.state.is_output_high() {
            self.output = self.output_start + self.config.output_step + bias;
        } else if self.state == AutotuneState::RelayStepDown {
            self.output = self.output_start - self.config.output_step + bias;
        }
    }

    fn test_steady_state(&mut self, at: Duration) -> AutotuneStatus {
        let stats = self.detector.window_stats();
        if stats.max - stats.min > F::lit(2.0) * self.noise_band {
            return AutotuneStatus::Running;
        }
        if self.config.use_relay_bias {
            self.bias.mark_step(at);
        }

        if self.state == AutotuneState::SteadyStateAtBaseline {
            self.baseline = stats.mean;
            self.state = AutotuneState::SteadyStateAfterStepUp;
            self.detector.restart_window();
            self.drive_relay();
            debug!("baseline settled at {:?}, stepping output up", stats.mean);
            return AutotuneStatus::Running;
        }

        let process_gain = (stats.mean - self.baseline) / self.config.output_step;
        if process_gain < F::lit(1e-10) {
            return self.fail(FailureReason::BadProcessGainEstimate);
        }
        self.process_gain = Some(process_gain);
        self.state = AutotuneState::RelayStepDown;
        self.detector.restart_timer(at);
        if self.config.use_relay_bias {
            self.bias.clear_sum();
        }
        self.drive_relay();
        debug!(
            "process gain estimated at {:?}, starting relay",
            process_gain
        );
        AutotuneStatus::Running
    }

    /// Retargets the noise band when the phase lag is outside 130° ± 15°.
    ///
    /// Returns `true` if the band was changed, in which case the oscillation is not yet usable.
    fn adapt_noise_band(&mut self, amplitude: F) -> bool {
        let lag = rules::phase_lag(self.noise_band, amplitude);
        let degrees = F::PI() / F::lit(180.0);
        if (lag - F::lit(130.0) * degrees).abs() <= F::lit(15.0) * degrees {
            return false;
        }
        // Aim for 135°, where sin(lag) = √2/2
        self.next_noise_band = F::lit(0.5) * amplitude * F::FRAC_1_SQRT_2();
        debug!(
            "phase lag {:?} rad out of range, noise band becomes {:?}",
            lag, self.next_noise_band
        );
        true
    }

    fn fail(&mut self, reason: FailureReason) -> AutotuneStatus {
        warn!(
            "relay autotune failed after {} peaks and {} relay flips: {:?}",
            self.detector.peak_count(),
            self.relay_flips,
            reason
        );
        self.state = AutotuneState::Failed(reason);
        self.output = self.output_start;
        AutotuneStatus::Failed(reason)
    }

    fn finish(&mut self, oscillation: Oscillation<F>) -> AutotuneStatus {
        let ku = F::lit(4.0) * self.config.output_step / (oscillation.amplitude * F::PI());
        let pu = oscillation.period;

        let tuned = match self.config.control_rule {
            ControlRule::Classic(rule) => rule.gains(ku, pu).map(|gains| (gains, None)),
            ControlRule::AmigofPi => {
                let Some(process_gain) = self.process_gain else {
                    return self.fail(FailureReason::BadProcessGainEstimate);
                };
                let lag = rules::phase_lag(self.noise_band, oscillation.amplitude);
                rules::amigof_pi(ku, pu, process_gain, lag).map(|gains| (gains, Some(lag)))
            }
        };
        let (gains, phase_lag) = match tuned {
            Ok(tuned) => tuned,
            Err(err) => {
                debug!("Ku = {:?}, Pu = {:?} rejected: {:?}", ku, pu, err);
                return self.fail(FailureReason::DegenerateGains);
            }
        };

        self.result = Some(AutotuneResult {
            ultimate_gain: ku,
            ultimate_period: pu,
            process_gain: self.process_gain,
            phase_lag,
            gains,
        });
        self.state = AutotuneState::Converged;
        self.output = self.output_start;
        info!(
            "relay autotune converged after {} peaks: Ku = {:?}, Pu = {:?} s, gains {:?}",
            self.detector.peak_count(),
            ku,
            pu,
            gains.standard()
        );
        AutotuneStatus::Converged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Millis;

    #[test]
    fn test_lookback_selects_sample_time() {
        let mut config = AutotuneConfig::<f64>::default();
        assert_eq!(config.lookback(), Duration::from_secs(10));
        assert_eq!(config.sample_time(), Duration::from_millis(250));

        assert!(config.set_lookback(Duration::from_secs(24)).is_ok());
        assert_eq!(config.lookback_samples(), 96);
        assert_eq!(config.sample_time(), Duration::from_millis(250));

        assert!(config.set_lookback(Duration::from_secs(30)).is_ok());
        assert_eq!(config.lookback_samples(), 100);
        assert_eq!(config.sample_time(), Duration::from_millis(300));
        assert_eq!(config.lookback(), Duration::from_secs(30));

        assert_eq!(
            config.set_lookback(Duration::from_millis(999)),
            Err(ConfigError::InvalidLookback)
        );
        assert_eq!(config.lookback(), Duration::from_secs(30));
    }

    #[test]
    fn test_builder_validates() {
        let config = AutotuneConfigBuilder::<f64>::default()
            .noise_band(0.2)
            .output_step(5.0)
            .control_rule(TuningRule::TyreusLuybenPid)
            .build()
            .unwrap();
        assert_eq!(config.noise_band(), 0.2);
        assert_eq!(config.output_step(), 5.0);
        assert_eq!(
            config.control_rule(),
            ControlRule::Classic(TuningRule::TyreusLuybenPid)
        );

        assert_eq!(
            AutotuneConfigBuilder::<f64>::default()
                .noise_band(-1.0)
                .build()
                .map(|_| ()),
            Err(ConfigError::InvalidNoiseBand)
        );
        assert_eq!(
            AutotuneConfigBuilder::<f64>::default()
                .output_step(0.0)
                .build()
                .map(|_| ()),
            Err(ConfigError::InvalidOutputStep)
        );
    }

    #[test]
    fn test_state_predicates() {
        assert!(AutotuneState::RelayStepUp.is_output_high());
        assert!(AutotuneState::SteadyStateAfterStepUp.is_output_high());
        assert!(!AutotuneState::SteadyStateAtBaseline.is_output_high());
        assert!(AutotuneState::SteadyStateAtBaseline.is_steady_state_test());
        assert!(AutotuneState::Failed(FailureReason::PeakTimeout).is_terminal());
        assert!(!AutotuneState::Off.is_terminal());
    }

    #[test]
    fn test_relay_flips_on_band_crossings() {
        let mut autotuner = RelayAutotuner::<Millis, f64>::new(AutotuneConfig::default(), 50.0);
        autotuner.update(0.0, Millis(0));
        assert_eq!(autotuner.state(), AutotuneState::RelayStepUp);
        assert_eq!(autotuner.output(), 60.0);

        // Inside the band: no flip
        autotuner.update(0.5, Millis(250));
        assert_eq!(autotuner.state(), AutotuneState::RelayStepUp);

        autotuner.update(0.6, Millis(500));
        assert_eq!(autotuner.state(), AutotuneState::RelayStepDown);
        assert_eq!(autotuner.output(), 40.0);

        autotuner.update(-0.6, Millis(750));
        assert_eq!(autotuner.state(), AutotuneState::RelayStepUp);
        assert_eq!(autotuner.relay_flips(), 2);
    }

    #[test]
    fn test_amigof_starts_with_step_test() {
        let config = AutotuneConfigBuilder::<f64>::default()
            .control_rule(ControlRule::AmigofPi)
            .build()
            .unwrap();
        let mut autotuner = RelayAutotuner::<Millis, f64>::new(config, 0.0);
        autotuner.update(1.0, Millis(0));
        assert_eq!(autotuner.state(), AutotuneState::SteadyStateAtBaseline);
        assert_eq!(autotuner.output(), 0.0);
    }

    #[test]
    fn test_cancel_restores_output() {
        let mut autotuner = RelayAutotuner::<Millis, f64>::new(AutotuneConfig::default(), 3.0);
        autotuner.cancel();
        assert_eq!(autotuner.state(), AutotuneState::Off);

        autotuner.update(0.0, Millis(0));
        assert_eq!(autotuner.output(), 13.0);
        autotuner.cancel();
        assert_eq!(autotuner.state(), AutotuneState::Off);
        assert_eq!(autotuner.output(), 3.0);
        assert_eq!(autotuner.update(0.0, Millis(1)), AutotuneStatus::Running);
    }
}
