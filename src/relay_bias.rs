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

//! Asymmetric-relay correction for the relay autotuner.
//!
//! Load disturbances and nonlinear processes can make the relay oscillation lopsided: the process
//! value spends longer on one side of the setpoint than the other. Shifting both relay levels by a
//! common bias recovers a symmetric oscillation. The bias is estimated from the ratio of successive
//! half-cycle durations and the ratio of the process value integrated over them, assuming a
//! trapezoidal waveform (C.-C. Yu, *Autotuning of PID Controllers*, eq. 7.39).

use core::time::Duration;

use log::debug;

use crate::real::Real;
use crate::ring::RingBuffer;

/// Largest relative difference between successive half-cycle durations left uncorrected. Also the
/// smallest bias change, relative to the output step, worth applying.
pub const STEP_ASYMMETRY_TOLERANCE: f64 = 0.20;

const STEP_HISTORY: usize = 5;

#[derive(Debug, Clone)]
pub(crate) struct RelayBias<F: Real> {
    bias: F,
    step_count: usize,
    step_times: RingBuffer<Duration, STEP_HISTORY>,
    sums: RingBuffer<F, STEP_HISTORY>,
}

impl<F: Real> RelayBias<F> {
    pub(crate) fn new() -> Self {
        Self {
            bias: F::zero(),
            step_count: 0,
            step_times: RingBuffer::new(Duration::ZERO),
            sums: RingBuffer::new(F::zero()),
        }
    }

    pub(crate) fn reset(&mut self, at: Duration) {
        self.bias = F::zero();
        self.step_count = 0;
        self.step_times.reset(at);
        self.sums.reset(F::zero());
    }

    pub(crate) fn bias(&self) -> F {
        self.bias
    }

    /// Whether the oscillation passed a symmetry check since the last bias change.
    ///
    /// The first check runs on the sixth relay step, once four full half cycles are on record.
    pub(crate) fn is_settled(&self) -> bool {
        self.step_count > 5
    }

    /// Integrates one process-value sample into the current half cycle.
    pub(crate) fn accumulate(&mut self, value: F) {
        *self.sums.newest_mut() = *self.sums.newest_mut() + value;
    }

    pub(crate) fn since_last_step(&self, at: Duration) -> Duration {
        at.saturating_sub(self.step_times.get(0))
    }

    /// Moves the reference of the step timeout to `at`.
    pub(crate) fn mark_step(&mut self, at: Duration) {
        *self.step_times.newest_mut() = at;
    }

    pub(crate) fn clear_sum(&mut self) {
        *self.sums.newest_mut() = F::zero();
    }

    /// Records a relay flip at `at` and re-estimates the bias from the completed half cycles.
    ///
    /// `stepping_down` is the direction of the relay after the flip.
    pub(crate) fn on_step(&mut self, stepping_down: bool, at: Duration, output_step: F) {
        if self.step_count > 4 {
            self.correct(stepping_down, output_step);
        }
        self.step_count += 1;
        self.step_times.push(at);
        self.sums.push(F::zero());
    }

    fn correct(&mut self, stepping_down: bool, output_step: F) {
        let secs = |age: usize| F::lit(self.step_times.get(age).as_secs_f64());
        let half = F::lit(0.5);
        let avg_step1 = half * ((secs(0) - secs(1)) + (secs(2) - secs(3)));
        let avg_step2 = half * ((secs(1) - secs(2)) + (secs(3) - secs(4)));

        let tiny = F::lit(1e-10);
        if avg_step1 <= tiny || avg_step2 <= tiny {
            return;
        }
        let asymmetry = (avg_step1 - avg_step2).abs() / avg_step1.max(avg_step2);
        let tolerance = F::lit(STEP_ASYMMETRY_TOLERANCE);
        if asymmetry <= tolerance {
            return;
        }

        let mut delta = -self.process_value_offset(avg_step1, avg_step2) * output_step;
        if stepping_down {
            delta = -delta;
        }
        if delta.abs() > output_step * tolerance {
            self.bias = self.bias + delta;
            // Let the oscillation settle around the new relay levels
            self.step_count = 0;
            debug!(
                "relay asymmetry {:?} corrected, bias now {:?}",
                asymmetry, self.bias
            );
        }
    }

    /// Offset of the process-value oscillation as a proportion of its amplitude, from the ratio of
    /// half-cycle durations and the ratio of the process value integrated over them.
    ///
    /// Solves `(r1·r2 + 3r1 + 3r2 + 1)·d² − 2(1 + r1)(1 − r2)·d + (1 − r1)(1 − r2) = 0` for `d`.
    fn process_value_offset(&self, avg_step1: F, avg_step2: F) -> F {
        let tiny = F::lit(1e-10);
        let one = F::one();
        if avg_step1 < tiny {
            return one;
        }
        if avg_step2 < tiny {
            return -one;
        }
        let r1 = avg_step1 / avg_step2;

        let s1 = self.sums.get(1) + self.sums.get(3);
        let s2 = self.sums.get(2) + self.sums.get(4);
        if s1 < tiny {
            return one;
        }
        if s2 < tiny {
            return -one;
        }
        let r2 = s1 / s2;

        let mut discriminant = (one - r2) * (r1 * r1 - r2);
        if discriminant < tiny {
            discriminant = F::zero();
        }
        let sign = if r1 > one { one } else { -one };
        let root = sign * discriminant.sqrt();
        let three = F::lit(3.0);
        ((one + r1) * (one - r2) + root) / (r1 * r2 + three * r1 + three * r2 + one)
    }
}
