use std::fmt;

use crate::errors::AscentError;
use crate::telemetry_system::sample::TelemetrySample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMetric {
    Altitude,
    Apoapsis,
}

impl TargetMetric {
    pub fn read(&self, sample: &TelemetrySample) -> f64 {
        match self {
            TargetMetric::Altitude => sample.altitude,
            TargetMetric::Apoapsis => sample.apoapsis,
        }
    }
}

impl fmt::Display for TargetMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetMetric::Altitude => write!(f, "altitude"),
            TargetMetric::Apoapsis => write!(f, "apoapsis"),
        }
    }
}

/// What the ascent drives toward. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AscentTarget {
    metric: TargetMetric,
    value: f64,
    tolerance: f64,
}

impl AscentTarget {
    pub fn new(metric: TargetMetric, value: f64) -> Result<Self, AscentError> {
        Self::with_tolerance(metric, value, 0.0)
    }

    pub fn with_tolerance(
        metric: TargetMetric,
        value: f64,
        tolerance: f64,
    ) -> Result<Self, AscentError> {
        if !(value.is_finite() && value > 0.0) {
            return Err(AscentError::InvalidTarget(format!(
                "target {} must be positive, got {}",
                metric, value
            )));
        }
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(AscentError::InvalidTarget(format!(
                "tolerance must be non-negative, got {}",
                tolerance
            )));
        }
        Ok(AscentTarget {
            metric,
            value,
            tolerance,
        })
    }

    pub fn altitude(value: f64) -> Result<Self, AscentError> {
        Self::new(TargetMetric::Altitude, value)
    }

    pub fn apoapsis(value: f64) -> Result<Self, AscentError> {
        Self::new(TargetMetric::Apoapsis, value)
    }

    pub fn metric(&self) -> TargetMetric {
        self.metric
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn threshold(&self) -> f64 {
        self.value - self.tolerance
    }

    pub fn is_reached_by(&self, current_value: f64) -> bool {
        current_value >= self.threshold()
    }
}

impl fmt::Display for AscentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.0} m", self.metric, self.value)?;
        if self.tolerance > 0.0 {
            write!(f, " (±{:.0} m)", self.tolerance)?;
        }
        Ok(())
    }
}
