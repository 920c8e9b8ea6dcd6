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

use crate::error::ConfigError;
use crate::real::Real;

/// PID gains, stored in standard (ideal) form.
///
/// ```text
/// Standard form:   Kc (e + 1/Ti ∫e dt + Td de/dt)
/// Parallel form:   Kp e + Ki ∫e dt + Kd de/dt
///
/// Kp = Kc,   Ki = Kc / Ti,   Kd = Kc · Td
/// ```
///
/// An infinite integral time means no integral action (`Ki == 0`). The gains are owned by the
/// control loop; a tuner borrows them mutably for the duration of one tuning session, so at most
/// one tuner can ever be writing to a given set of gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains<F> {
    kc: F,
    ti: F,
    td: F,
}

impl<F: Real> Default for PidGains<F> {
    /// A unit proportional controller with no integral or derivative action.
    fn default() -> Self {
        Self {
            kc: F::one(),
            ti: F::infinity(),
            td: F::zero(),
        }
    }
}

fn validate_kc<F: Real>(kc: F) -> Result<F, ConfigError> {
    if kc <= F::zero() || !kc.is_finite() {
        return Err(ConfigError::InvalidProportionalGain);
    }
    Ok(kc)
}

fn validate_ti<F: Real>(ti: F) -> Result<F, ConfigError> {
    // +inf is allowed and disables integral action
    if ti.is_nan() || ti <= F::zero() {
        return Err(ConfigError::InvalidIntegralTime);
    }
    Ok(ti)
}

fn validate_td<F: Real>(td: F) -> Result<F, ConfigError> {
    if td < F::zero() || !td.is_finite() {
        return Err(ConfigError::InvalidDerivativeTime);
    }
    Ok(td)
}

fn validate_non_negative<F: Real>(gain: F, error: ConfigError) -> Result<F, ConfigError> {
    if gain < F::zero() || !gain.is_finite() {
        return Err(error);
    }
    Ok(gain)
}

impl<F: Real> PidGains<F> {
    /// Constructs gains from the standard form `(Kc, Ti, Td)`.
    pub fn from_standard(kc: F, ti: F, td: F) -> Result<Self, ConfigError> {
        Ok(Self {
            kc: validate_kc(kc)?,
            ti: validate_ti(ti)?,
            td: validate_td(td)?,
        })
    }

    /// Constructs gains from the parallel form `(Kp, Ki, Kd)`.
    pub fn from_parallel(kp: F, ki: F, kd: F) -> Result<Self, ConfigError> {
        let kc = validate_kc(kp)?;
        let ki = validate_non_negative(ki, ConfigError::InvalidIntegralGain)?;
        let kd = validate_non_negative(kd, ConfigError::InvalidDerivativeGain)?;
        Ok(Self {
            kc,
            ti: Self::integral_time(kc, ki),
            td: kd / kc,
        })
    }

    fn integral_time(kc: F, ki: F) -> F {
        if ki == F::zero() {
            F::infinity()
        } else {
            kc / ki
        }
    }

    /// Returns the controller gain `Kc`.
    pub fn kc(&self) -> F {
        self.kc
    }

    /// Returns the integral time `Ti` in seconds.
    pub fn ti(&self) -> F {
        self.ti
    }

    /// Returns the derivative time `Td` in seconds.
    pub fn td(&self) -> F {
        self.td
    }

    /// Returns the proportional gain, identical to `Kc`.
    pub fn kp(&self) -> F {
        self.kc
    }

    /// Returns the integral gain `Kc / Ti`.
    pub fn ki(&self) -> F {
        if self.ti.is_infinite() {
            F::zero()
        } else {
            self.kc / self.ti
        }
    }

    /// Returns the derivative gain `Kc · Td`.
    pub fn kd(&self) -> F {
        self.kc * self.td
    }

    /// Convenience method returning `(Kc, Ti, Td)`.
    pub fn standard(&self) -> (F, F, F) {
        (self.kc, self.ti, self.td)
    }

    /// Convenience method returning `(Kp, Ki, Kd)`.
    pub fn parallel(&self) -> (F, F, F) {
        (self.kp(), self.ki(), self.kd())
    }

    /// Sets `Kc`, keeping `Ti` and `Td`.
    pub fn set_kc(&mut self, kc: F) -> Result<(), ConfigError> {
        self.kc = validate_kc(kc)?;
        Ok(())
    }

    /// Sets `Ti`. Passing infinity disables integral action.
    pub fn set_ti(&mut self, ti: F) -> Result<(), ConfigError> {
        self.ti = validate_ti(ti)?;
        Ok(())
    }

    /// Sets `Td`.
    pub fn set_td(&mut self, td: F) -> Result<(), ConfigError> {
        self.td = validate_td(td)?;
        Ok(())
    }

    /// Sets the proportional gain through the parallel view.
    ///
    /// `Ki` and `Kd` are preserved: `Ti` and `Td` are rescaled by the ratio of the new to the old
    /// gain.
    pub fn set_kp(&mut self, kp: F) -> Result<(), ConfigError> {
        let kp = validate_kc(kp)?;
        self.td = self.td * (self.kc / kp);
        self.ti = self.ti * (kp / self.kc);
        self.kc = kp;
        Ok(())
    }

    /// Sets the integral gain through the parallel view, keeping `Kc`.
    pub fn set_ki(&mut self, ki: F) -> Result<(), ConfigError> {
        let ki = validate_non_negative(ki, ConfigError::InvalidIntegralGain)?;
        self.ti = Self::integral_time(self.kc, ki);
        Ok(())
    }

    /// Sets the derivative gain through the parallel view, keeping `Kc`.
    pub fn set_kd(&mut self, kd: F) -> Result<(), ConfigError> {
        let kd = validate_non_negative(kd, ConfigError::InvalidDerivativeGain)?;
        self.td = kd / self.kc;
        Ok(())
    }
}
