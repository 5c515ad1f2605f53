use tracing::info;

use crate::constants::{TWR_KD, TWR_KI, TWR_KP};
use crate::control::mission::AscentTarget;
use crate::errors::AscentError;
use crate::telemetry_system::sample::TelemetrySample;

struct PIDController {
    kp: f64, // Proportional gain
    ki: f64, // Integral gain
    kd: f64, // Derivative gain
    previous_error: Option<f64>,
    integral: f64,
    output_limits: (f64, f64),
    output: f64,
}

impl PIDController {
    fn new(kp: f64, ki: f64, kd: f64, output_limits: (f64, f64)) -> Self {
        PIDController {
            kp,
            ki,
            kd,
            previous_error: None,
            integral: 0.0,
            output_limits,
            output: 0.0,
        }
    }

    /// Preloads the integral term so the first outputs stay near
    /// `last_output` instead of jumping from zero.
    fn start_from(mut self, last_output: f64) -> Self {
        if self.ki != 0.0 {
            self.integral = self.clamp_integral(last_output / self.ki);
        }
        self.output = last_output.clamp(self.output_limits.0, self.output_limits.1);
        self
    }

    // Anti-windup: the integral contribution alone never leaves the output limits.
    fn clamp_integral(&self, integral: f64) -> f64 {
        if self.ki == 0.0 {
            return integral;
        }
        let (low, high) = self.output_limits;
        let a = low / self.ki;
        let b = high / self.ki;
        integral.clamp(a.min(b), a.max(b))
    }

    fn calculate(&mut self, error: f64, delta_time: f64) -> f64 {
        let mut derivative = 0.0;
        if delta_time > 0.0 {
            self.integral = self.clamp_integral(self.integral + error * delta_time);
            if let Some(previous_error) = self.previous_error {
                derivative = (error - previous_error) / delta_time;
            }
        }
        self.previous_error = Some(error);
        let raw = self.kp * error + self.ki * self.integral + self.kd * derivative;
        self.output = raw.clamp(self.output_limits.0, self.output_limits.1);
        self.output
    }
}

/// Exponential smoothing of the target metric. `alpha` of 1 is no smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricFilter {
    alpha: f64,
    value: Option<f64>,
}

impl MetricFilter {
    pub fn new(alpha: f64) -> Result<Self, AscentError> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(AscentError::InvalidConfig(format!(
                "smoothing factor must be in (0, 1], got {}",
                alpha
            )));
        }
        Ok(MetricFilter { alpha, value: None })
    }

    pub fn apply(&mut self, raw: f64) -> f64 {
        let filtered = match self.value {
            Some(previous) if raw.is_finite() => self.alpha * raw + (1.0 - self.alpha) * previous,
            Some(previous) => previous,
            None => raw,
        };
        if filtered.is_finite() {
            self.value = Some(filtered);
        }
        filtered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ThrottleMode {
    /// Bang-bang: full throttle until the target is met.
    #[default]
    Full,
    /// Holds thrust-to-weight ratio near `target_twr` with a PID loop.
    TwrHold { target_twr: f64 },
}

impl ThrottleMode {
    pub fn validate(&self) -> Result<(), AscentError> {
        match self {
            ThrottleMode::Full => Ok(()),
            ThrottleMode::TwrHold { target_twr } if target_twr.is_finite() && *target_twr > 0.0 => {
                Ok(())
            }
            ThrottleMode::TwrHold { target_twr } => Err(AscentError::InvalidConfig(format!(
                "target TWR must be positive, got {}",
                target_twr
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceOutput {
    pub throttle: f64,
    pub done: bool,
    pub measured: f64,
}

pub struct AscentController {
    target: AscentTarget,
    mode: ThrottleMode,
    filter: Option<MetricFilter>,
    twr_controller: PIDController,
    done: bool,
}

impl AscentController {
    pub fn new(
        target: AscentTarget,
        mode: ThrottleMode,
        smoothing: Option<f64>,
    ) -> Result<Self, AscentError> {
        mode.validate()?;
        let filter = smoothing.map(MetricFilter::new).transpose()?;
        Ok(AscentController {
            target,
            mode,
            filter,
            twr_controller: PIDController::new(TWR_KP, TWR_KI, TWR_KD, (0.0, 1.0)).start_from(1.0),
            done: false,
        })
    }

    pub fn target(&self) -> &AscentTarget {
        &self.target
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Once the target is met the controller latches: throttle stays at zero
    /// even if the metric later sags below the target.
    pub fn update(&mut self, sample: &TelemetrySample, delta_time: f64) -> GuidanceOutput {
        let raw = self.target.metric().read(sample);
        let measured = match self.filter.as_mut() {
            Some(filter) => filter.apply(raw),
            None => raw,
        };

        if self.done {
            return GuidanceOutput {
                throttle: 0.0,
                done: true,
                measured,
            };
        }

        if self.target.is_reached_by(measured) {
            self.done = true;
            info!(
                metric = %self.target.metric(),
                measured,
                goal = self.target.value(),
                "Target reached, cutting throttle"
            );
            return GuidanceOutput {
                throttle: 0.0,
                done: true,
                measured,
            };
        }

        let throttle = match self.mode {
            ThrottleMode::Full => 1.0,
            ThrottleMode::TwrHold { target_twr } => match sample.thrust_to_weight() {
                Some(twr) => self.twr_controller.calculate(target_twr - twr, delta_time),
                None => 1.0,
            },
        };

        GuidanceOutput {
            throttle,
            done: false,
            measured,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::mission::TargetMetric;
    use approx::assert_relative_eq;

    fn altitude_sample(altitude: f64) -> TelemetrySample {
        TelemetrySample::new(100.0, altitude, altitude + 5_000.0)
    }

    #[test]
    fn test_pid_controller() {
        let mut pid = PIDController::new(0.1, 0.01, 0.05, (-1.0, 1.0));
        let mut error = 100.0;
        let delta_time = 0.1;

        for _ in 0..10 {
            let output = pid.calculate(error, delta_time);
            error -= output * 10.0; // Simulate error reduction
        }

        assert!(error.abs() < 50.0, "PID should reduce error over time");
    }

    #[test]
    fn test_pid_output_respects_limits() {
        let mut pid = PIDController::new(0.005, 0.5, 0.0, (0.0, 1.0)).start_from(1.0);
        assert_relative_eq!(pid.output, 1.0);

        for _ in 0..100 {
            let output = pid.calculate(5.0, 0.1);
            assert!((0.0..=1.0).contains(&output));
        }
        for _ in 0..100 {
            let output = pid.calculate(-5.0, 0.1);
            assert!((0.0..=1.0).contains(&output));
        }
        assert_relative_eq!(pid.output, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bang_bang_altitude_scenario() {
        let target = AscentTarget::altitude(90_000.0).unwrap();
        let mut controller = AscentController::new(target, ThrottleMode::Full, None).unwrap();

        let climbing = controller.update(&altitude_sample(50_000.0), 0.1);
        assert_eq!(climbing.throttle, 1.0);
        assert!(!climbing.done);

        let reached = controller.update(&altitude_sample(90_000.0), 0.1);
        assert_eq!(reached.throttle, 0.0);
        assert!(reached.done);

        let sagging = controller.update(&altitude_sample(85_000.0), 0.1);
        assert_eq!(sagging.throttle, 0.0, "Throttle must not re-engage after done");
        assert!(sagging.done);
    }

    #[test]
    fn test_done_is_sticky() {
        let target = AscentTarget::apoapsis(10_000.0).unwrap();
        let mut controller = AscentController::new(target, ThrottleMode::Full, None).unwrap();
        controller.update(&TelemetrySample::new(5.0, 4_000.0, 10_500.0), 0.1);
        assert!(controller.is_done());

        for apoapsis in [9_000.0, 0.0, -100.0, 2_000.0, f64::NAN] {
            let output = controller.update(&TelemetrySample::new(5.0, 4_000.0, apoapsis), 0.1);
            assert!(output.done);
            assert_eq!(output.throttle, 0.0);
        }
    }

    #[test]
    fn test_tolerance_ends_early() {
        let target = AscentTarget::with_tolerance(TargetMetric::Altitude, 1_000.0, 50.0).unwrap();
        let mut controller = AscentController::new(target, ThrottleMode::Full, None).unwrap();
        assert!(!controller.update(&altitude_sample(949.0), 0.1).done);
        assert!(controller.update(&altitude_sample(950.0), 0.1).done);
    }

    #[test]
    fn test_smoothing_ignores_single_spike() {
        let target = AscentTarget::altitude(10_000.0).unwrap();
        let mut raw = AscentController::new(target, ThrottleMode::Full, None).unwrap();
        let mut smoothed = AscentController::new(target, ThrottleMode::Full, Some(0.2)).unwrap();

        let readings = [8_000.0, 8_050.0, 12_000.0, 8_150.0];
        let raw_done: Vec<bool> = readings
            .iter()
            .map(|&alt| raw.update(&altitude_sample(alt), 0.1).done)
            .collect();
        let smoothed_done: Vec<bool> = readings
            .iter()
            .map(|&alt| smoothed.update(&altitude_sample(alt), 0.1).done)
            .collect();

        assert_eq!(raw_done, vec![false, false, true, true]);
        assert_eq!(smoothed_done, vec![false, false, false, false]);
    }

    #[test]
    fn test_metric_filter() {
        let mut filter = MetricFilter::new(0.5).unwrap();
        assert_relative_eq!(filter.apply(100.0), 100.0);
        assert_relative_eq!(filter.apply(200.0), 150.0);
        assert_relative_eq!(filter.apply(f64::NAN), 150.0);

        assert!(MetricFilter::new(0.0).is_err());
        assert!(MetricFilter::new(1.5).is_err());
    }

    #[test]
    fn test_twr_hold_throttles_down_when_too_heavy_on_thrust() {
        let target = AscentTarget::apoapsis(90_000.0).unwrap();
        let mut controller =
            AscentController::new(target, ThrottleMode::TwrHold { target_twr: 1.6 }, None)
                .unwrap();

        // TWR 2.5 at full thrust
        let sample = TelemetrySample::new(245_250.0, 2_000.0, 3_000.0).with_mass(10_000.0, 9.81);
        let mut throttle = 1.0;
        for _ in 0..20 {
            throttle = controller.update(&sample, 0.1).throttle;
        }
        assert!(
            throttle < 1.0,
            "Throttle should drop when TWR exceeds the target, got {}",
            throttle
        );
        assert!(throttle >= 0.0);
    }

    #[test]
    fn test_twr_hold_without_mass_falls_back_to_full() {
        let target = AscentTarget::apoapsis(90_000.0).unwrap();
        let mut controller =
            AscentController::new(target, ThrottleMode::TwrHold { target_twr: 1.6 }, None)
                .unwrap();
        let output = controller.update(&TelemetrySample::new(5_000.0, 100.0, 200.0), 0.1);
        assert_eq!(output.throttle, 1.0);
    }

    #[test]
    fn test_invalid_modes_rejected() {
        let target = AscentTarget::altitude(1_000.0).unwrap();
        assert!(
            AscentController::new(target, ThrottleMode::TwrHold { target_twr: 0.0 }, None)
                .is_err()
        );
        assert!(AscentController::new(target, ThrottleMode::Full, Some(-0.3)).is_err());
    }
}
