//! Relay autotuning of a two-lag process with dead time, then a step response with the tuned gains
//! This example requires the `--features simulation` flag to be enabled.
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

#[cfg(feature = "simulation")]
pub fn main() {
    use std::time::Duration;

    use discrete_autotune::autotune::{AutotuneConfigBuilder, AutotuneStatus, RelayAutotuner};
    use discrete_autotune::pid::{PidConfig, PidController};
    use discrete_autotune::rules::TuningRule;
    use discrete_autotune::sim::{DeadTime, TwoLagPlant};
    use discrete_autotune::time::Millis;

    const FIXED_STEP_SIZE_MS: u64 = 50;
    const FIXED_STEP_SIZE_S: f64 = FIXED_STEP_SIZE_MS as f64 * 0.001;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let rule = std::env::args()
        .nth(1)
        .map(|name| name.parse::<TuningRule>())
        .transpose()
        .unwrap_or_else(|err| {
            eprintln!("{}", err);
            std::process::exit(2);
        })
        .unwrap_or(TuningRule::ZieglerNicholsPid);

    let config = AutotuneConfigBuilder::default()
        .noise_band(0.2)
        .output_step(5.0)
        .lookback(Duration::from_secs(2))
        .control_rule(rule)
        .build()
        .unwrap();

    let make_plant = || {
        (
            TwoLagPlant::new(1.5, (20.0, 5.0)),
            DeadTime::new((4_000 / FIXED_STEP_SIZE_MS) as usize, 0.0),
        )
    };

    let (mut plant, mut delay) = make_plant();
    let mut autotuner = RelayAutotuner::<Millis, f64>::new(config, 0.0);
    let mut timestamp = Millis(0);
    let status = loop {
        let status = autotuner.update(plant.output(), timestamp);
        plant.step(delay.push(autotuner.output()), FIXED_STEP_SIZE_S);
        if matches!(status, AutotuneStatus::Converged | AutotuneStatus::Failed(_)) {
            break status;
        }
        timestamp = timestamp + Duration::from_millis(FIXED_STEP_SIZE_MS);
    };

    let Some(result) = autotuner.result() else {
        eprintln!("Autotuning did not converge: {:?}", status);
        std::process::exit(1);
    };
    println!(
        "{} after {:.1} s: Ku = {:.3}, Pu = {:.2} s",
        rule.name(),
        timestamp.0 as f64 / 1000.0,
        result.ultimate_gain,
        result.ultimate_period
    );
    let (kp, ki, kd) = result.gains.parallel();
    println!("Kp = {:.4}, Ki = {:.4}, Kd = {:.4}", kp, ki, kd);

    let mut pid_config = PidConfig::default();
    pid_config.set_gains(result.gains);
    pid_config.set_sample_time(Duration::from_millis(250)).unwrap();
    pid_config.set_output_limits(-20.0, 20.0).unwrap();
    pid_config.set_use_derivative_on_measurement(true);
    let mut pid = PidController::new(pid_config);

    let (mut plant, mut delay) = make_plant();
    let setpoint = 1.0;
    for i in 0..=6000u64 {
        let timestamp = Millis(i * FIXED_STEP_SIZE_MS);
        let control = pid.compute(plant.output(), setpoint, timestamp, None);
        plant.step(delay.push(control), FIXED_STEP_SIZE_S);
        if i % 200 == 0 {
            println!(
                "t = {:6.1} s  u = {:8.4}  y = {:8.4}",
                timestamp.0 as f64 / 1000.0,
                control,
                plant.output()
            );
        }
    }
}

#[cfg(not(feature = "simulation"))]
fn main() {
    eprintln!("This example requires `--features simulation` to run.");
}
