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

use core::fmt::Debug;

use num_traits::{Float, FloatConst};

/// The floating-point scalar every tuner computes in.
///
/// This is [`Float`] plus [`FloatConst`], with an infallible way of spelling numeric literals so
/// tuning constants can be written once as `f64` and used at either precision.
pub trait Real: Float + FloatConst + Debug + Send + Sync + 'static {
    /// Converts an `f64` literal to `Self`, rounding to the nearest representable value.
    fn lit(value: f64) -> Self;
}

impl Real for f32 {
    #[inline]
    fn lit(value: f64) -> Self {
        value as f32
    }
}

impl Real for f64 {
    #[inline]
    fn lit(value: f64) -> Self {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::Real;

    #[test]
    fn test_literals_round_to_target_precision() {
        assert_eq!(<f64 as Real>::lit(0.05), 0.05);
        assert_eq!(<f32 as Real>::lit(0.05), 0.05f32);
    }
}
