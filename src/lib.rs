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

#![warn(missing_docs)]

//! # Discrete PID Autotuning Library
//!
//! This library tunes the gains of a discrete PID (Proportional-Integral-Derivative) controller
//! in Rust, without heap allocation.
//!
//! It provides a relay-feedback autotuner and two online search strategies, all of which write
//! to a [`PidGains`](gains::PidGains) they borrow exclusively while a session runs.
//!
//! ## Features
//!
//! - Relay-feedback (Åström-Hägglund) autotuning:
//!   - Ultimate gain and period from a relay-induced limit cycle, settled by peak analysis.
//!   - Nine classical tuning rules (Ziegler-Nichols, Tyreus-Luyben, Ciancone-Marlin, Pessen,
//!     some/no overshoot), plus the AMIGOf PI rule with an automatic step test and noise-band
//!     adaptation.
//!   - Optional relay bias to symmetrize the oscillation of processes with asymmetric response.
//!   - Fails cleanly with a reason on timeouts or a bad process-gain estimate.
//!
//! - Online tuning strategies behind a common, object-safe [`Tuner`](tuner::Tuner) trait:
//!   - Gradient descent that nudges each gain by a fixed fraction while the loop runs.
//!   - Coordinate descent ("Twiddle") driving a [`PidController`](pid::PidController) with trial
//!     gains.
//!
//! - Explicit support for **discrete-time** control requirements:
//!   - Configurable sampling time: _It's a no-op if a tuner is called before one sampling period
//!     elapsed_.
//!   - Pluggable time source through [`InstantLike`](time::InstantLike).
//!
//! ## Usage
//!
//! ### Relay autotuning
//!
//! Feed the autotuner one process-value sample per control tick and apply its output to the
//! actuator until it reports a terminal status.
//!
//! ```rust
//! use core::time::Duration;
//!
//! use discrete_autotune::autotune::{AutotuneConfigBuilder, AutotuneStatus, RelayAutotuner};
//! use discrete_autotune::rules::TuningRule;
//! use discrete_autotune::time::Millis;
//!
//! let config = AutotuneConfigBuilder::default()
//!     .noise_band(0.5)
//!     .output_step(10.0)
//!     .lookback(Duration::from_secs(5))
//!     .control_rule(TuningRule::ZieglerNicholsPid)
//!     .build()
//!     .expect("Invalid autotune config");
//! let mut autotuner = RelayAutotuner::<Millis, f64>::new(config, 0.0);
//!
//! // A process that follows the relay: ±5 around zero
//! let mut process_value = 0.0;
//! for t in (0..600_000).step_by(250) {
//!     match autotuner.update(process_value, Millis(t)) {
//!         AutotuneStatus::Converged | AutotuneStatus::Failed(_) => break,
//!         _ => {}
//!     }
//!     process_value = if (t / 1000) % 2 == 0 { 5.0 } else { -5.0 };
//! }
//! ```
//!
//! ### Choosing a tuning strategy at runtime
//!
//! ```rust
//! use discrete_autotune::gains::PidGains;
//! use discrete_autotune::time::Millis;
//! use discrete_autotune::tuner::Tuner;
//! use discrete_autotune::twiddle::CoordinateDescentTuner;
//!
//! let mut gains = PidGains::<f64>::default();
//! {
//!     let mut tuner: Box<dyn Tuner<Millis, f64> + '_> =
//!         Box::new(CoordinateDescentTuner::<Millis, f64>::new(&mut gains, Default::default()));
//!     tuner.initialize(0.0, 0.0);
//!     tuner.update(0.5, 1.0, Millis(0));
//!     let _actuator_command = tuner.output();
//! }
//! // The borrow has ended; the gains are usable again
//! let (kp, ki, kd) = gains.parallel();
//! assert!(kp > 0.0 && ki >= 0.0 && kd >= 0.0);
//! ```
//!
//! ### Plugging in your Instant type
//!
//! ``` rust
//! use core::ops::Add;
//! use core::time::Duration;
//! use discrete_autotune::autotune::{AutotuneConfig, AutotuneStatus, RelayAutotuner};
//! use discrete_autotune::time::InstantLike;
//!
//! #[derive(Copy, Clone, Debug, PartialEq)]
//! struct Ticks(u32);
//!
//! impl Add<Duration> for Ticks {
//!     type Output = Self;
//!
//!     fn add(self, rhs: Duration) -> Self {
//!         Ticks(self.0 + rhs.as_millis() as u32)
//!     }
//! }
//!
//! impl InstantLike for Ticks {
//!     fn duration_since(&self, earlier: Self) -> Duration {
//!         Duration::from_millis(self.0.saturating_sub(earlier.0).into())
//!     }
//! }
//!
//! let mut autotuner = RelayAutotuner::new(AutotuneConfig::default(), 0.0);
//! assert_eq!(autotuner.update(1.0, Ticks(1000)), AutotuneStatus::Running);
//! ```
//!
//! ## License
//!
#![no_std]

#[cfg(feature = "std")]
extern crate std;

/// The relay-feedback autotune state machine.
pub mod autotune;

/// Peak detection on a sliding window of process values.
pub mod detector;

/// Errors raised by configuration setters and builders.
pub mod error;

/// PID gains in standard and parallel form.
pub mod gains;

/// The PID controller driven during coordinate-descent tuning.
pub mod pid;

/// The floating-point bound shared by every generic type.
pub mod real;

/// Tuning rules mapping ultimate gain and period to PID gains.
pub mod rules;

/// Online gradient-descent tuning.
pub mod sgd;

/// The module containing time-related utilities to support sampling time handling
pub mod time;

/// The common tuner contract and the relay-feedback tuner.
pub mod tuner;

/// Coordinate-descent ("Twiddle") tuning.
pub mod twiddle;

mod relay_bias;
mod ring;

#[doc(hidden)]
#[cfg(feature = "simulation")]
pub mod sim;

pub use autotune::{AutotuneConfig, AutotuneResult, AutotuneStatus, RelayAutotuner};
pub use error::ConfigError;
pub use gains::PidGains;
pub use rules::{ControlRule, TuningRule};
pub use tuner::Tuner;

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
