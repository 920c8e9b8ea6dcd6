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

//! Classical tuning rules that turn an ultimate gain and period into PID gains.
//!
//! Sources of the divisors:
//!
//! - Tyreus-Luyben and Ciancone-Marlin: C.-C. Yu, *Autotuning of PID Controllers: A Relay
//!   Feedback Approach*, 2nd ed., p. 18. Tyreus-Luyben is more conservative than
//!   Ziegler-Nichols and suits lag-dominated processes; Ciancone-Marlin suits delay-dominated
//!   ones.
//! - Pessen integral, some overshoot, no overshoot: A. S. McCormack and K. R. Godfrey,
//!   "Rule-Based Autotuning Based on Frequency Domain Identification", IEEE TCST 6(1), 1998.
//! - AMIGOf: T. Hägglund and K. J. Åström, "Revisiting the Ziegler-Nichols tuning rules for PI
//!   control - Part II. The frequency response method", Asian Journal of Control 6(4), 2004.

use core::str::FromStr;

use crate::error::ConfigError;
use crate::gains::PidGains;
use crate::real::Real;

/// Selects one of the three divisors of a [`TuningRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divisor {
    /// Divides the ultimate gain to give `Kc`.
    Kp,
    /// Divides the ultimate period to give `Ti`.
    Ti,
    /// Divides the ultimate period to give `Td`.
    Td,
}

/// A Ziegler-Nichols-type rule expressed as three divisors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TuningRule {
    /// Ziegler-Nichols PI. Intended for best disturbance rejection.
    ZieglerNicholsPi,
    /// Ziegler-Nichols PID. Can lack robustness on lag-dominated processes.
    ZieglerNicholsPid,
    /// Tyreus-Luyben PI.
    TyreusLuybenPi,
    /// Tyreus-Luyben PID.
    TyreusLuybenPid,
    /// Ciancone-Marlin PI.
    CianconeMarlinPi,
    /// Ciancone-Marlin PID.
    CianconeMarlinPid,
    /// Pessen integral rule PID.
    PessenIntegralPid,
    /// "Some overshoot" PID.
    SomeOvershootPid,
    /// "No overshoot" PID.
    NoOvershootPid,
}

impl TuningRule {
    /// Every rule in the table.
    pub const ALL: [TuningRule; 9] = [
        TuningRule::ZieglerNicholsPi,
        TuningRule::ZieglerNicholsPid,
        TuningRule::TyreusLuybenPi,
        TuningRule::TyreusLuybenPid,
        TuningRule::CianconeMarlinPi,
        TuningRule::CianconeMarlinPid,
        TuningRule::PessenIntegralPid,
        TuningRule::SomeOvershootPid,
        TuningRule::NoOvershootPid,
    ];

    /// `[Kp, Ti, Td]` divisors; a zero `Td` divisor marks a PI rule.
    const fn divisors(self) -> [f64; 3] {
        match self {
            TuningRule::ZieglerNicholsPi => [2.2, 1.2, 0.0],
            TuningRule::ZieglerNicholsPid => [1.7, 2.0, 8.0],
            TuningRule::TyreusLuybenPi => [3.2, 0.45, 0.0],
            TuningRule::TyreusLuybenPid => [2.2, 0.45, 6.3],
            TuningRule::CianconeMarlinPi => [3.3, 4.0, 0.0],
            TuningRule::CianconeMarlinPid => [3.3, 4.4, 8.1],
            TuningRule::PessenIntegralPid => [1.4, 2.5, 6.65],
            TuningRule::SomeOvershootPid => [3.0, 2.0, 3.0],
            TuningRule::NoOvershootPid => [5.0, 2.0, 3.0],
        }
    }

    /// Returns the requested divisor. PI rules report a zero `Td` divisor.
    pub fn divisor<F: Real>(self, which: Divisor) -> F {
        let [kp, ti, td] = self.divisors();
        F::lit(match which {
            Divisor::Kp => kp,
            Divisor::Ti => ti,
            Divisor::Td => td,
        })
    }

    /// Whether the rule produces a PI controller (no derivative action).
    pub fn is_pi_only(self) -> bool {
        self.divisors()[2] == 0.0
    }

    /// Stable kebab-case name, accepted back by [`TuningRule::from_str`].
    pub fn name(self) -> &'static str {
        match self {
            TuningRule::ZieglerNicholsPi => "ziegler-nichols-pi",
            TuningRule::ZieglerNicholsPid => "ziegler-nichols-pid",
            TuningRule::TyreusLuybenPi => "tyreus-luyben-pi",
            TuningRule::TyreusLuybenPid => "tyreus-luyben-pid",
            TuningRule::CianconeMarlinPi => "ciancone-marlin-pi",
            TuningRule::CianconeMarlinPid => "ciancone-marlin-pid",
            TuningRule::PessenIntegralPid => "pessen-integral-pid",
            TuningRule::SomeOvershootPid => "some-overshoot-pid",
            TuningRule::NoOvershootPid => "no-overshoot-pid",
        }
    }

    /// Applies the rule to an ultimate gain `ku` and ultimate period `pu` (seconds).
    ///
    /// ```text
    /// Kc = Ku / divisor(Kp)
    /// Ti = Pu / divisor(Ti)
    /// Td = 0 for PI rules, Pu / divisor(Td) otherwise
    /// ```
    pub fn gains<F: Real>(self, ku: F, pu: F) -> Result<PidGains<F>, ConfigError> {
        let kc = ku / self.divisor(Divisor::Kp);
        let ti = pu / self.divisor(Divisor::Ti);
        let td = if self.is_pi_only() {
            F::zero()
        } else {
            pu / self.divisor(Divisor::Td)
        };
        PidGains::from_standard(kc, ti, td)
    }
}

impl FromStr for TuningRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TuningRule::ALL
            .into_iter()
            .find(|rule| rule.name().eq_ignore_ascii_case(s))
            .ok_or(ConfigError::UnknownTuningRule)
    }
}

/// The rule the relay autotuner finishes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlRule {
    /// One of the divisor-table rules.
    Classic(TuningRule),
    /// The AMIGOf PI rule, which needs an extra process-gain estimate from a step test.
    ///
    /// Slow to tune, especially for lag-dominated processes, and may never finish on integrating
    /// processes, but gives robust tunings for both lag- and delay-dominated ones.
    AmigofPi,
}

impl Default for ControlRule {
    fn default() -> Self {
        ControlRule::Classic(TuningRule::ZieglerNicholsPi)
    }
}

impl From<TuningRule> for ControlRule {
    fn from(rule: TuningRule) -> Self {
        ControlRule::Classic(rule)
    }
}

impl FromStr for ControlRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("amigof-pi") {
            return Ok(ControlRule::AmigofPi);
        }
        s.parse().map(ControlRule::Classic)
    }
}

/// Phase lag of the relay-induced oscillation, in radians.
///
/// With hysteresis `2 · noise_band` and oscillation amplitude `a`, the lag is
/// `π − arcsin(2 · noise_band / a)`, clamped to `π/2` when the band exceeds the amplitude.
pub fn phase_lag<F: Real>(noise_band: F, amplitude: F) -> F {
    let ratio = F::lit(2.0) * noise_band / amplitude;
    if ratio > F::one() {
        return F::FRAC_PI_2();
    }
    F::PI() - (ratio / (F::one() - ratio * ratio).sqrt()).atan()
}

/// The AMIGOf PI tuning.
///
/// `kappa` is the gain ratio `(1 / Ku) / K_process`. The result has no derivative action, and is
/// rejected when the frequency-response estimate yields a non-positive integral time.
pub fn amigof_pi<F: Real>(
    ku: F,
    pu: F,
    process_gain: F,
    phase_lag: F,
) -> Result<PidGains<F>, ConfigError> {
    let kappa = (F::one() / ku) / process_gain;
    let kc = ((F::lit(2.50) - F::lit(0.92) * phase_lag)
        / (F::one() + (F::lit(10.75) - F::lit(4.01) * phase_lag) * kappa))
        * ku;
    let ti = ((F::lit(-3.05) + F::lit(1.72) * phase_lag)
        / (F::one() + (F::lit(-6.10) + F::lit(3.44) * phase_lag) * kappa).powi(2))
        * pu;
    PidGains::from_standard(kc, ti, F::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pi_rules_have_no_derivative_divisor() {
        let pi_rules = [
            TuningRule::ZieglerNicholsPi,
            TuningRule::TyreusLuybenPi,
            TuningRule::CianconeMarlinPi,
        ];
        for rule in TuningRule::ALL {
            assert_eq!(rule.is_pi_only(), pi_rules.contains(&rule), "{:?}", rule);
        }
    }

    #[test]
    fn test_ziegler_nichols_pid() {
        let gains = TuningRule::ZieglerNicholsPid.gains(1.7, 2.0).unwrap();
        assert_relative_eq!(gains.kc(), 1.0);
        assert_relative_eq!(gains.ti(), 1.0);
        assert_relative_eq!(gains.td(), 0.25);
    }

    #[test]
    fn test_names_parse_back() {
        for rule in TuningRule::ALL {
            assert_eq!(rule.name().parse::<TuningRule>(), Ok(rule));
            assert_eq!(
                rule.name().parse::<ControlRule>(),
                Ok(ControlRule::Classic(rule))
            );
        }
        assert_eq!("AMIGOF-PI".parse::<ControlRule>(), Ok(ControlRule::AmigofPi));
        assert_eq!(
            "cohen-coon".parse::<TuningRule>(),
            Err(ConfigError::UnknownTuningRule)
        );
    }

    #[test]
    fn test_non_positive_ultimate_values_are_rejected() {
        assert!(TuningRule::ZieglerNicholsPi.gains(0.0, 1.0).is_err());
        assert!(TuningRule::ZieglerNicholsPi.gains(1.0, -1.0).is_err());
    }

    #[test]
    fn test_phase_lag() {
        // Hysteresis wider than the oscillation clamps to 90 degrees
        assert_relative_eq!(phase_lag(1.0, 1.0), core::f64::consts::FRAC_PI_2);

        // ratio = 2 * 0.5 / 2 = 0.5 -> asin(0.5) = 30 degrees -> 150 degrees
        assert_relative_eq!(
            phase_lag(0.5, 2.0),
            core::f64::consts::PI * 150.0 / 180.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_amigof_pi() {
        let ku = 2.0;
        let pu = 10.0;
        let process_gain = 1.0;
        let lag = core::f64::consts::PI * 0.75;
        let kappa = 0.5;

        let gains = amigof_pi(ku, pu, process_gain, lag).unwrap();
        let expected_kc = (2.50 - 0.92 * lag) / (1.0 + (10.75 - 4.01 * lag) * kappa) * ku;
        let expected_ti =
            (-3.05 + 1.72 * lag) / (1.0 + (-6.10 + 3.44 * lag) * kappa).powi(2) * pu;
        assert_relative_eq!(gains.kc(), expected_kc, epsilon = 1e-12);
        assert_relative_eq!(gains.ti(), expected_ti, epsilon = 1e-12);
        assert_eq!(gains.td(), 0.0);
    }

    #[test]
    fn test_amigof_rejects_negative_integral_time() {
        // At 90 degrees of lag the integral-time numerator is negative
        assert_eq!(
            amigof_pi(2.0, 10.0, 1.0, core::f64::consts::FRAC_PI_2),
            Err(ConfigError::InvalidIntegralTime)
        );
    }
}
