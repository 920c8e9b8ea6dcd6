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

use fixtures::signals;

use core::f64::consts::PI;
use core::time::Duration;

use discrete_autotune::autotune::*;
use discrete_autotune::rules::{ControlRule, TuningRule};
use discrete_autotune::time::Millis;

use approx::assert_relative_eq;

/// Feeds `signal` every 50 ms until the autotuner reaches a terminal status or `duration_ms`
/// runs out. Returns the terminal status and when it was reached.
fn run(
    autotuner: &mut RelayAutotuner<Millis, f64>,
    duration_ms: u64,
    signal: impl Fn(Millis) -> f64,
) -> Option<(AutotuneStatus, Millis)> {
    signals::ticks(50, duration_ms).find_map(|t| match autotuner.update(signal(t), t) {
        status @ (AutotuneStatus::Converged | AutotuneStatus::Failed(_)) => Some((status, t)),
        _ => None,
    })
}

fn make_autotuner(rule: impl Into<ControlRule>) -> RelayAutotuner<Millis, f64> {
    let config = AutotuneConfigBuilder::default()
        .control_rule(rule)
        .build()
        .unwrap();
    RelayAutotuner::new(config, 0.0)
}

mod test_relay_convergence {

    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_triangle_wave_converges_to_ziegler_nichols_pid() {
        let mut autotuner = make_autotuner(TuningRule::ZieglerNicholsPid);

        let (status, at) = run(&mut autotuner, 60_000, signals::triangle).unwrap();
        assert_eq!(status, AutotuneStatus::Converged);
        // 40 samples of warm-up, then five alternating peaks one second apart
        assert_eq!(at, Millis(15_500));
        assert_eq!(autotuner.state(), AutotuneState::Converged);
        assert_eq!(autotuner.output(), 0.0);

        let result = autotuner.result().unwrap();
        assert_relative_eq!(result.ultimate_gain, 4.0 / PI, epsilon = 1e-9);
        assert_relative_eq!(result.ultimate_period, 2.0, epsilon = 1e-9);
        assert_eq!(result.process_gain, None);
        assert_eq!(result.phase_lag, None);

        assert_relative_eq!(result.gains.kc(), 4.0 / PI / 1.7, epsilon = 1e-9);
        assert_relative_eq!(result.gains.ti(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(result.gains.td(), 0.25, epsilon = 1e-9);
        assert_eq!(autotuner.kp(), Some(result.gains.kp()));
        assert_eq!(autotuner.kd(), Some(result.gains.kd()));
    }

    #[test]
    fn test_every_rule_matches_its_divisors() {
        let ku = 4.0 / PI;
        let pu = 2.0;
        for rule in TuningRule::ALL {
            let mut autotuner = make_autotuner(rule);
            let (status, _) = run(&mut autotuner, 60_000, signals::triangle).unwrap();
            assert_eq!(status, AutotuneStatus::Converged, "{}", rule.name());

            let gains = autotuner.result().unwrap().gains;
            let [kp_div, ti_div, td_div] = match rule {
                TuningRule::ZieglerNicholsPi => [2.2, 1.2, 0.0],
                TuningRule::ZieglerNicholsPid => [1.7, 2.0, 8.0],
                TuningRule::TyreusLuybenPi => [3.2, 0.45, 0.0],
                TuningRule::TyreusLuybenPid => [2.2, 0.45, 6.3],
                TuningRule::CianconeMarlinPi => [3.3, 4.0, 0.0],
                TuningRule::CianconeMarlinPid => [3.3, 4.4, 8.1],
                TuningRule::PessenIntegralPid => [1.4, 2.5, 6.65],
                TuningRule::SomeOvershootPid => [3.0, 2.0, 3.0],
                TuningRule::NoOvershootPid => [5.0, 2.0, 3.0],
            };
            assert_relative_eq!(gains.kc(), ku / kp_div, epsilon = 1e-9);
            assert_relative_eq!(gains.ti(), pu / ti_div, epsilon = 1e-9);
            let expected_td = if rule.is_pi_only() { 0.0 } else { pu / td_div };
            assert_relative_eq!(gains.td(), expected_td, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_relay_output_alternates_around_start() {
        let config = AutotuneConfigBuilder::default()
            .output_step(5.0)
            .build()
            .unwrap();
        let mut autotuner = RelayAutotuner::<Millis, f64>::new(config, 20.0);

        let mut outputs = Vec::new();
        for t in signals::ticks(250, 4_000) {
            if autotuner.update(signals::triangle(t), t) == AutotuneStatus::Running {
                outputs.push(autotuner.output());
            }
        }
        assert!(outputs.iter().all(|&u| u == 15.0 || u == 25.0));
        assert!(outputs.contains(&15.0) && outputs.contains(&25.0));
        assert!(autotuner.relay_flips() >= 3);
    }

    proptest! {
        #[test]
        fn test_square_wave_yields_describing_function_gain(
            amplitude in 1.0f64..100.0,
            half_periods in 2u64..40,
        ) {
            let period_ms = 500 * half_periods;
            let mut autotuner = make_autotuner(TuningRule::ZieglerNicholsPi);

            let outcome = run(&mut autotuner, 200_000, |t| signals::square(t, amplitude, period_ms));
            prop_assert!(matches!(outcome, Some((AutotuneStatus::Converged, _))));

            let result = autotuner.result().unwrap();
            let expected_ku = 4.0 * 10.0 / (PI * amplitude);
            let expected_pu = period_ms as f64 / 1000.0;
            prop_assert!((result.ultimate_gain - expected_ku).abs() <= 0.02 * expected_ku);
            prop_assert!((result.ultimate_period - expected_pu).abs() <= 0.02 * expected_pu);
        }
    }
}

mod test_relay_failures {

    use super::*;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_flat_input_times_out_waiting_for_peaks() {
        let mut autotuner = make_autotuner(TuningRule::ZieglerNicholsPi);

        let (status, at) = run(&mut autotuner, 400_000, |_| 1.0).unwrap();
        assert_eq!(status, AutotuneStatus::Failed(FailureReason::PeakTimeout));
        assert!(at > Millis(300_000) && at <= Millis(301_000), "{:?}", at);
        assert_eq!(autotuner.output(), 0.0);
        assert!(autotuner.result().is_none());
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let mut autotuner = make_autotuner(TuningRule::ZieglerNicholsPi);
        let (status, at) = run(&mut autotuner, 400_000, |_| 1.0).unwrap();

        let later = at + Duration::from_secs(1);
        assert_eq!(autotuner.update(1.0, later), status);
        assert_eq!(autotuner.update(50.0, later + Duration::from_secs(1)), status);
    }

    #[test]
    fn test_amigof_on_unresponsive_process_fails_step_test() {
        let mut autotuner = make_autotuner(ControlRule::AmigofPi);

        let (status, at) = run(&mut autotuner, 60_000, |_| 3.0).unwrap();
        assert_eq!(
            status,
            AutotuneStatus::Failed(FailureReason::BadProcessGainEstimate)
        );
        // Two settled windows of 40 samples each
        assert_eq!(at, Millis(20_250));
        assert_eq!(autotuner.output(), 0.0);
    }

    #[test]
    fn test_noise_inside_band_does_not_change_peak_count() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut clean = make_autotuner(TuningRule::ZieglerNicholsPi);
        let mut noisy = make_autotuner(TuningRule::ZieglerNicholsPi);

        let mut clean_status = clean.update(0.0, Millis(0));
        let mut noisy_status = noisy.update(0.0, Millis(0));
        for t in signals::ticks(250, 120_000).skip(1) {
            let value = signals::square(t, 5.0, 2000);
            let noise = rng.random_range(-0.45..0.45);
            let both_running = clean_status == AutotuneStatus::Running
                && noisy_status == AutotuneStatus::Running;
            if clean_status == AutotuneStatus::Running {
                clean_status = clean.update(value, t);
            }
            if noisy_status == AutotuneStatus::Running {
                noisy_status = noisy.update(value + noise, t);
            }
            if both_running {
                assert_eq!(noisy.peak_count(), clean.peak_count(), "at {:?}", t);
                assert_eq!(noisy.relay_flips(), clean.relay_flips(), "at {:?}", t);
            }
        }
        assert_eq!(clean_status, AutotuneStatus::Converged);
        assert_eq!(noisy_status, AutotuneStatus::Converged);

        // Peak times are those of the clean wave; only the peak values carry the noise
        let result = noisy.result().unwrap();
        assert_relative_eq!(result.ultimate_period, 2.0, max_relative = 0.02);
        assert_relative_eq!(result.ultimate_gain, 40.0 / (PI * 5.0), max_relative = 0.1);
    }

    #[test]
    fn test_growing_oscillation_exhausts_peak_budget() {
        let mut autotuner = make_autotuner(TuningRule::ZieglerNicholsPi);

        let (status, _) = run(&mut autotuner, 120_000, |t| {
            signals::triangle(t) * 1.3f64.powf(t.0 as f64 / 1000.0)
        })
        .unwrap();
        assert_eq!(status, AutotuneStatus::Failed(FailureReason::TooManyPeaks));
        assert_eq!(autotuner.peak_count(), MAX_PEAKS);
        assert_eq!(autotuner.output(), 0.0);
        assert!(autotuner.result().is_none());
    }

    /// Crosses the band once at 250 ms, then swings between 10 and 13 with a 40 s period
    fn offset_wave(t: Millis) -> f64 {
        if t.0 == 0 {
            return 0.0;
        }
        let phase = t.0 % 40_000;
        let rise = if phase < 20_000 { phase } else { 40_000 - phase };
        10.0 + 3.0 * rise as f64 / 20_000.0
    }

    #[test]
    fn test_relay_bias_times_out_without_relay_steps() {
        let config = AutotuneConfigBuilder::default()
            .use_relay_bias(true)
            .build()
            .unwrap();
        let mut autotuner = RelayAutotuner::<Millis, f64>::new(config, 0.0);

        let (status, at) = run(&mut autotuner, 400_000, offset_wave).unwrap();
        assert_eq!(
            status,
            AutotuneStatus::Failed(FailureReason::RelayStepTimeout)
        );
        assert!(at > Millis(300_250) && at <= Millis(301_000), "{:?}", at);
        assert_eq!(autotuner.relay_flips(), 1);
        assert!(autotuner.peak_count() < MAX_PEAKS);
        assert_eq!(autotuner.output(), 0.0);
    }

    #[test]
    fn test_without_relay_bias_the_same_input_converges() {
        let mut autotuner = make_autotuner(TuningRule::ZieglerNicholsPi);

        let (status, at) = run(&mut autotuner, 400_000, offset_wave).unwrap();
        assert_eq!(status, AutotuneStatus::Converged);
        assert!(at < Millis(300_000));
        let result = autotuner.result().unwrap();
        assert_relative_eq!(result.ultimate_period, 40.0, epsilon = 1e-9);
        assert_relative_eq!(result.ultimate_gain, 40.0 / (PI * 1.5), epsilon = 1e-9);
    }
}

mod test_relay_cancel {

    use super::*;

    #[test]
    fn test_cancel_is_idempotent() {
        let mut autotuner = RelayAutotuner::<Millis, f64>::new(AutotuneConfig::default(), 7.0);
        autotuner.update(0.0, Millis(0));
        autotuner.cancel();
        let snapshot = (autotuner.state(), autotuner.output());
        autotuner.cancel();
        assert_eq!((autotuner.state(), autotuner.output()), snapshot);
        assert_eq!(snapshot, (AutotuneState::Off, 7.0));
    }

    #[test]
    fn test_restart_after_cancel_forgets_history() {
        let mut autotuner = make_autotuner(TuningRule::ZieglerNicholsPi);
        for t in signals::ticks(50, 13_000) {
            autotuner.update(signals::triangle(t), t);
        }
        assert!(autotuner.peak_count() > 0);
        assert!(autotuner.relay_flips() > 0);

        autotuner.cancel();
        assert_eq!(
            autotuner.update(42.0, Millis(20_000)),
            AutotuneStatus::Running
        );
        assert_eq!(autotuner.peak_count(), 0);
        assert_eq!(autotuner.relay_flips(), 0);
        assert_eq!(autotuner.setpoint(), 42.0);
    }

    #[test]
    fn test_cancel_then_rerun_converges_again() {
        let mut autotuner = make_autotuner(TuningRule::ZieglerNicholsPid);
        let (first, _) = run(&mut autotuner, 60_000, signals::triangle).unwrap();
        let first_result = *autotuner.result().unwrap();
        autotuner.cancel();

        let (second, _) = run(&mut autotuner, 60_000, signals::triangle).unwrap();
        assert_eq!(first, AutotuneStatus::Converged);
        assert_eq!(second, AutotuneStatus::Converged);
        assert_eq!(*autotuner.result().unwrap(), first_result);
    }
}
