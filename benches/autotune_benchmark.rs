//! Benchmark for the tuners
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

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use discrete_autotune::autotune::{AutotuneConfig, RelayAutotuner};
use discrete_autotune::gains::PidGains;
use discrete_autotune::pid::{PidConfigBuilder, PidController};
use discrete_autotune::sgd::GradientDescentTuner;
use discrete_autotune::time::Millis;
use discrete_autotune::tuner::Tuner;
use discrete_autotune::twiddle::CoordinateDescentTuner;

/// A triangle wave of amplitude 10 and period 2 s
fn triangle(now: Millis) -> f64 {
    let phase = (now.0 + 500) % 2000;
    if phase < 1000 {
        -10.0 + 0.02 * phase as f64
    } else {
        10.0 - 0.02 * (phase - 1000) as f64
    }
}

/// Every accepted sample scans the full lookback window, so the default 40-sample window is the
/// dominant cost of the relay autotuner.
fn bench_relay_autotuner(c: &mut Criterion) {
    let mut autotuner = RelayAutotuner::<Millis, f64>::new(AutotuneConfig::default(), 0.0);
    let mut now = Millis(0);

    c.bench_function("relay autotuner", |b| {
        b.iter(|| {
            let status = autotuner.update(black_box(triangle(now)), now);
            if autotuner.state().is_terminal() {
                // Start over to keep measuring the running path
                autotuner.cancel();
            }
            now.0 += 250;
            black_box(status);
        });
    });
}

fn bench_gradient_descent(c: &mut Criterion) {
    let mut gains = PidGains::from_parallel(1.0, 0.5, 0.1).unwrap();
    let mut tuner = GradientDescentTuner::<Millis, f64>::new(&mut gains, Default::default());
    tuner.initialize(0.0, 0.0);
    let setpoint = 1.0;
    let mut measurement = 0.9;
    let mut now = Millis(0);

    c.bench_function("gradient descent", |b| {
        b.iter(|| {
            tuner.update(black_box(measurement), black_box(setpoint), now);
            measurement += 0.0001; // prevent constant inputs
            now.0 += 100;
            black_box(tuner.output());
        });
    });
}

/// Includes the cost of the PID controller driven with the trial gains.
fn bench_coordinate_descent(c: &mut Criterion) {
    let mut gains = PidGains::from_parallel(1.0, 0.5, 0.1).unwrap();
    let mut tuner = CoordinateDescentTuner::<Millis, f64>::new(&mut gains, Default::default());
    tuner.initialize(0.0, 0.0);
    let setpoint = 1.0;
    let mut measurement = 0.9;
    let mut now = Millis(0);

    c.bench_function("coordinate descent", |b| {
        b.iter(|| {
            tuner.update(black_box(measurement), black_box(setpoint), now);
            if tuner.ended() {
                tuner.interrupt();
                tuner.initialize(measurement, 0.0);
            }
            measurement += 0.0001; // prevent constant inputs
            now.0 += 10;
            black_box(tuner.output());
        });
    });
}

fn bench_pid(c: &mut Criterion) {
    let config = PidConfigBuilder::default()
        .kp(1.0)
        .ki(0.5)
        .kd(0.1)
        .output_limits(-10.0, 10.0)
        .build()
        .unwrap();
    let mut pid = PidController::<Millis, f64>::new(config);
    let setpoint = 1.0;
    let mut measurement = 0.9;
    let mut now = Millis(0);

    c.bench_function("PID", |b| {
        b.iter(|| {
            let output = pid.compute(black_box(measurement), black_box(setpoint), now, None);
            measurement += 0.0001; // prevent constant inputs
            now.0 += 10;
            black_box(output);
        });
    });
}

criterion_group!(
    benches,
    bench_relay_autotuner,
    bench_gradient_descent,
    bench_coordinate_descent,
    bench_pid,
);
criterion_main!(benches);
