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

//! Plant models for closed-loop demos and tests.

use std::collections::VecDeque;

use nalgebra as na;

/// A first-order lag `τ·y' + y = K·u`, discretized exactly for piecewise-constant input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstOrderLag {
    pub gain: f64,
    pub time_constant: f64,
    output: f64,
}

impl FirstOrderLag {
    pub fn new(gain: f64, time_constant: f64, initial_output: f64) -> Self {
        Self {
            gain,
            time_constant,
            output: initial_output,
        }
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    /// Holds `input` for `dt` seconds and returns the new output.
    pub fn step(&mut self, input: f64, dt: f64) -> f64 {
        let decay = (-dt / self.time_constant).exp();
        self.output = self.gain * input + (self.output - self.gain * input) * decay;
        self.output
    }
}

/// A transport delay of a fixed number of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadTime {
    line: VecDeque<f64>,
}

impl DeadTime {
    /// Creates a delay line of `steps` samples, pre-filled with `initial`.
    pub fn new(steps: usize, initial: f64) -> Self {
        Self {
            line: core::iter::repeat(initial).take(steps).collect(),
        }
    }

    /// Pushes `input` and returns the sample from `steps` steps ago.
    pub fn push(&mut self, input: f64) -> f64 {
        self.line.push_back(input);
        self.line.pop_front().unwrap_or(input)
    }
}

/// Advances `x' = f(x)` by one classical Runge-Kutta step of `dt`.
pub fn rk4_step<F>(f: F, x: na::Vector2<f64>, dt: f64) -> na::Vector2<f64>
where
    F: Fn(na::Vector2<f64>) -> na::Vector2<f64>,
{
    let k1 = f(x);
    let k2 = f(x + k1 * (dt / 2.0));
    let k3 = f(x + k2 * (dt / 2.0));
    let k4 = f(x + k3 * dt);
    x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// Two first-order lags in series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoLagPlant {
    pub gain: f64,
    pub time_constants: (f64, f64),
    state: na::Vector2<f64>,
}

impl TwoLagPlant {
    pub fn new(gain: f64, time_constants: (f64, f64)) -> Self {
        Self {
            gain,
            time_constants,
            state: na::Vector2::zeros(),
        }
    }

    /// Implements the state-space realization of the two-lag system:
    /// ┌     ┐   ┌              ┐┌    ┐   ┌      ┐
    /// │ x₁' │ = │ -1/τ₁   0    ││ x₁ │ + │ K/τ₁ │ u
    /// │ x₂' │   │  1/τ₂  -1/τ₂ ││ x₂ │   │ 0    │
    /// └     ┘   └              ┘└    ┘   └      ┘
    ///     ┌      ┐┌    ┐
    /// y = │ 0  1 ││ x₁ │
    ///     └      ┘│ x₂ │
    ///             └    ┘
    pub fn f(&self, x: na::Vector2<f64>, u: f64) -> na::Vector2<f64> {
        let (tau1, tau2) = self.time_constants;
        let mat_a = na::Matrix2::new(-1.0 / tau1, 0.0, 1.0 / tau2, -1.0 / tau2);
        let mat_b = na::Vector2::new(self.gain / tau1, 0.0);
        mat_a * x + mat_b * u
    }

    pub fn h(&self, x: na::Vector2<f64>) -> f64 {
        x[1]
    }

    pub fn output(&self) -> f64 {
        self.h(self.state)
    }

    /// Holds `input` for `dt` seconds and returns the new output.
    pub fn step(&mut self, input: f64, dt: f64) -> f64 {
        self.state = rk4_step(|x| self.f(x, input), self.state, dt);
        self.output()
    }
}
