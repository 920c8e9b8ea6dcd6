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

use core::time::Duration;

use crate::real::Real;
use crate::ring::RingBuffer;

/// Largest number of past samples a peak is compared against.
pub const MAX_LOOKBACK: usize = 100;

/// Number of peaks retained for the convergence check.
pub const PEAK_HISTORY: usize = 5;

const INPUT_CAPACITY: usize = MAX_LOOKBACK + 1;

/// Classification of a sample against the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakKind {
    /// At or below every sample in the window, within the noise margin.
    Minimum,
    /// Neither extreme.
    NotAPeak,
    /// At or above every sample in the window, within the noise margin. Wins ties with
    /// [`PeakKind::Minimum`].
    Maximum,
}

/// A recorded extreme of the process value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak<F> {
    /// Process value at the extreme.
    pub value: F,
    /// Time since the start of the session.
    pub at: Duration,
}

/// Spread and mean of the newest sample together with the lookback window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats<F> {
    /// Smallest value.
    pub min: F,
    /// Largest value.
    pub max: F,
    /// Arithmetic mean.
    pub mean: F,
}

/// Amplitude and period measured from peaks 1..=4 (the four peaks before the newest).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillation<F> {
    /// Half the mean peak-to-peak distance.
    pub amplitude: F,
    /// Largest of the four peaks.
    pub abs_max: F,
    /// Smallest of the four peaks.
    pub abs_min: F,
    /// Mean of the two full periods spanned by the four peaks, in seconds.
    pub period: F,
}

impl<F: Real> Oscillation<F> {
    /// Whether the amplitude has settled: half the overall peak spread exceeds the mean
    /// amplitude by less than `tolerance` (relative).
    pub fn is_converged(&self, tolerance: F) -> bool {
        let half_spread = F::lit(0.5) * (self.abs_max - self.abs_min);
        (half_spread - self.amplitude) / self.amplitude < tolerance
    }
}

/// Detects the extremes of a relay-induced oscillation.
///
/// Samples are collected into a window of `lookback` past values. Once the window is full, each
/// new sample is compared against the whole window: it is a maximum if it is not below any of
/// them by more than a noise margin, a minimum if it is not above any of them by more than that
/// margin (see [`OscillationDetector::push`]). A *peak event* fires only when the
/// classification flips between maximum and minimum, so plateaus and repeated extremes of the
/// same kind only refresh the newest peak instead of adding new ones.
#[derive(Debug, Clone)]
pub struct OscillationDetector<F: Real> {
    inputs: RingBuffer<F, INPUT_CAPACITY>,
    lookback: usize,
    input_count: usize,
    peaks: RingBuffer<Peak<F>, PEAK_HISTORY>,
    peak_kind: PeakKind,
    peak_count: usize,
    last_peak_event: Duration,
}

impl<F: Real> OscillationDetector<F> {
    /// Creates a detector comparing each sample against `lookback` past samples.
    ///
    /// `lookback` is clamped to `1..=MAX_LOOKBACK`.
    pub fn new(lookback: usize) -> Self {
        Self {
            inputs: RingBuffer::new(F::zero()),
            lookback: lookback.clamp(1, MAX_LOOKBACK),
            input_count: 0,
            peaks: RingBuffer::new(Peak {
                value: F::zero(),
                at: Duration::ZERO,
            }),
            peak_kind: PeakKind::NotAPeak,
            peak_count: 0,
            last_peak_event: Duration::ZERO,
        }
    }

    /// Forgets every sample and peak. `at` becomes the reference for the peak timeout.
    pub fn reset(&mut self, at: Duration) {
        self.inputs.reset(F::zero());
        self.input_count = 0;
        self.peaks.reset(Peak {
            value: F::zero(),
            at,
        });
        self.peak_kind = PeakKind::NotAPeak;
        self.peak_count = 0;
        self.last_peak_event = at;
    }

    /// Requires the window to fill again before the next classification. Peaks are kept.
    pub fn restart_window(&mut self) {
        self.input_count = 0;
    }

    /// Moves the reference of the peak timeout to `at`.
    pub fn restart_timer(&mut self, at: Duration) {
        self.last_peak_event = at;
    }

    /// Number of past samples each new sample is compared against.
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Adds a sample and classifies it against the window.
    ///
    /// A sample within `margin` of the window maximum counts as a maximum, and likewise for the
    /// minimum, so that noise smaller than the margin does not break a plateau into several
    /// extremes. When the window is too narrow to tell the two apart with the margin, the sample
    /// has to reach the window extreme itself.
    ///
    /// Returns `None` while the window is still filling.
    pub fn push(&mut self, value: F, margin: F) -> Option<PeakKind> {
        self.input_count += 1;
        if self.input_count <= self.lookback {
            self.inputs.push(value);
            return None;
        }
        self.input_count = self.lookback;

        let newest = self.inputs.get(0);
        let (min, max) = self
            .inputs
            .recent(self.lookback)
            .fold((newest, newest), |(min, max), past| (min.min(past), max.max(past)));
        self.inputs.push(value);

        let near_max = value >= max - margin;
        let near_min = value <= min + margin;
        Some(match (near_max, near_min) {
            (true, false) => PeakKind::Maximum,
            (false, true) => PeakKind::Minimum,
            (false, false) => PeakKind::NotAPeak,
            (true, true) if value >= max => PeakKind::Maximum,
            (true, true) if value <= min => PeakKind::Minimum,
            (true, true) => PeakKind::NotAPeak,
        })
    }

    /// Min, max and mean over the newest sample and the full window behind it.
    pub fn window_stats(&self) -> WindowStats<F> {
        let newest = self.inputs.get(0);
        let (min, max, sum) = self.inputs.recent(self.lookback + 1).fold(
            (newest, newest, F::zero()),
            |(min, max, sum), value| (min.min(value), max.max(value), sum + value),
        );
        WindowStats {
            min,
            max,
            mean: sum / F::lit((self.lookback + 1) as f64),
        }
    }

    /// Records the classification of the sample `value` taken at `at`.
    ///
    /// While the same kind of extreme repeats, the tracked peak keeps the most extreme value and
    /// takes the latest time.
    ///
    /// Returns `true` if this was a peak event, i.e. a transition between maximum and minimum.
    pub fn record(&mut self, kind: PeakKind, value: F, at: Duration) -> bool {
        let previous = self.peak_kind;
        let event = matches!(
            (previous, kind),
            (PeakKind::Minimum, PeakKind::Maximum) | (PeakKind::Maximum, PeakKind::Minimum)
        );
        if kind == PeakKind::NotAPeak {
            return false;
        }
        self.peak_kind = kind;

        if event {
            self.peak_count += 1;
            self.last_peak_event = at;
            self.peaks.push(Peak { value, at });
            return true;
        }

        let newest = self.peaks.newest_mut();
        let value = match (previous, kind) {
            (PeakKind::Maximum, PeakKind::Maximum) => newest.value.max(value),
            (PeakKind::Minimum, PeakKind::Minimum) => newest.value.min(value),
            _ => value,
        };
        *newest = Peak { value, at };
        false
    }

    /// Kind of the most recent extreme.
    pub fn peak_kind(&self) -> PeakKind {
        self.peak_kind
    }

    /// Number of peak events since the last reset.
    pub fn peak_count(&self) -> usize {
        self.peak_count
    }

    /// The peak recorded `age` peak events ago; age 0 is the extreme currently being tracked.
    pub fn peak(&self, age: usize) -> Peak<F> {
        self.peaks.get(age.min(PEAK_HISTORY - 1))
    }

    /// Time elapsed from the last peak event (or the reset) to `at`.
    pub fn since_last_peak(&self, at: Duration) -> Duration {
        at.saturating_sub(self.last_peak_event)
    }

    /// Measures the oscillation from peaks 1..=4, which covers one and a half cycles.
    ///
    /// Only meaningful once more than four peak events have been recorded.
    pub fn oscillation(&self) -> Oscillation<F> {
        let first = self.peaks.get(1).value;
        let (travel, abs_max, abs_min) =
            (2..PEAK_HISTORY).fold((F::zero(), first, first), |(travel, max, min), age| {
                let value = self.peaks.get(age).value;
                let previous = self.peaks.get(age - 1).value;
                (travel + (value - previous).abs(), max.max(value), min.min(value))
            });

        let secs = |age: usize| F::lit(self.peaks.get(age).at.as_secs_f64());
        let period = F::lit(0.5) * ((secs(1) - secs(3)) + (secs(2) - secs(4)));

        Oscillation {
            // Three peak-to-peak distances, each twice the amplitude
            amplitude: travel / F::lit(6.0),
            abs_max,
            abs_min,
            period,
        }
    }
}
