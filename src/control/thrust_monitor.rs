use crate::constants::THRUST_EPSILON;
use crate::errors::AscentError;
use crate::telemetry_system::sample::TelemetrySample;

/// Classifies raw thrust into "actively thrusting" or not. It does not care
/// which engine or stage the thrust comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrustMonitor {
    thrust_epsilon: f64,
}

impl ThrustMonitor {
    pub fn new(thrust_epsilon: f64) -> Result<Self, AscentError> {
        if !(thrust_epsilon.is_finite() && thrust_epsilon > 0.0) {
            return Err(AscentError::InvalidConfig(format!(
                "thrust epsilon must be a small positive number, got {}",
                thrust_epsilon
            )));
        }
        Ok(ThrustMonitor { thrust_epsilon })
    }

    pub fn thrust_epsilon(&self) -> f64 {
        self.thrust_epsilon
    }

    // NaN compares false, so an unreadable sensor counts as no thrust.
    pub fn is_thrusting(&self, sample: &TelemetrySample) -> bool {
        sample.thrust > self.thrust_epsilon
    }
}

impl Default for ThrustMonitor {
    fn default() -> Self {
        ThrustMonitor {
            thrust_epsilon: THRUST_EPSILON,
        }
    }
}
