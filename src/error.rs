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

/// Errors reported when a gain or configuration value is rejected.
///
/// Every setter that can fail leaves the previous value untouched when it returns one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum ConfigError {
    /// The proportional gain was zero, negative or not finite.
    #[cfg_attr(
        feature = "std",
        error("proportional gain must be positive and finite")
    )]
    InvalidProportionalGain,

    /// The integral gain was negative or not finite.
    #[cfg_attr(
        feature = "std",
        error("integral gain must be non-negative and finite")
    )]
    InvalidIntegralGain,

    /// The derivative gain was negative or not finite.
    #[cfg_attr(
        feature = "std",
        error("derivative gain must be non-negative and finite")
    )]
    InvalidDerivativeGain,

    /// The integral time was zero, negative or NaN.
    #[cfg_attr(feature = "std", error("integral time must be positive"))]
    InvalidIntegralTime,

    /// The derivative time was negative or not finite.
    #[cfg_attr(
        feature = "std",
        error("derivative time must be non-negative and finite")
    )]
    InvalidDerivativeTime,

    /// The sample time was zero or too large to represent.
    #[cfg_attr(feature = "std", error("sample time must be positive and bounded"))]
    InvalidSampleTime,

    /// The output limits were unordered or NaN.
    #[cfg_attr(
        feature = "std",
        error("output minimum must be strictly less than output maximum")
    )]
    InvalidOutputLimits,

    /// The relay noise band was negative or not finite.
    #[cfg_attr(feature = "std", error("noise band must be non-negative and finite"))]
    InvalidNoiseBand,

    /// The relay output step was zero, negative or not finite.
    #[cfg_attr(feature = "std", error("output step must be positive and finite"))]
    InvalidOutputStep,

    /// The peak-detection lookback was shorter than one second.
    #[cfg_attr(feature = "std", error("lookback must be at least one second"))]
    InvalidLookback,

    /// The learning rate was outside `(0, 1)`.
    #[cfg_attr(feature = "std", error("learning rate must lie in (0, 1)"))]
    InvalidLearningRate,

    /// The loss tolerance was negative or not finite.
    #[cfg_attr(
        feature = "std",
        error("loss tolerance must be non-negative and finite")
    )]
    InvalidMaxLoss,

    /// A coordinate-descent step size was zero, negative or not finite.
    #[cfg_attr(feature = "std", error("step sizes must be positive and finite"))]
    InvalidStepSize,

    /// The coordinate-descent termination threshold was zero, negative or not finite.
    #[cfg_attr(feature = "std", error("threshold must be positive and finite"))]
    InvalidThreshold,

    /// The tuning rule name was not recognized.
    #[cfg_attr(feature = "std", error("unknown tuning rule"))]
    UnknownTuningRule,
}
