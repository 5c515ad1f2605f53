use tracing::info;

use crate::constants::{
    GRAVITY_TURN_A, GRAVITY_TURN_B, GRAVITY_TURN_C, MAX_PITCH, MIN_PITCH, ROLL_MAX_TIME,
    ROLL_VERTICAL_SPEED,
};
use crate::errors::AscentError;
use crate::telemetry_system::link::Attitude;
use crate::telemetry_system::sample::TelemetrySample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttitudeProfile {
    Hold { pitch: f64, heading: f64 },
    GravityTurn { heading: f64 },
}

impl AttitudeProfile {
    pub fn validate(&self) -> Result<(), AscentError> {
        let heading = match self {
            AttitudeProfile::Hold { pitch, heading } => {
                if !(-90.0..=90.0).contains(pitch) {
                    return Err(AscentError::InvalidConfig(format!(
                        "pitch must be within ±90°, got {}",
                        pitch
                    )));
                }
                heading
            }
            AttitudeProfile::GravityTurn { heading } => heading,
        };
        if !(0.0..=360.0).contains(heading) {
            return Err(AscentError::InvalidConfig(format!(
                "heading must be within 0..=360°, got {}",
                heading
            )));
        }
        Ok(())
    }

    pub fn heading(&self) -> f64 {
        match *self {
            AttitudeProfile::Hold { heading, .. } | AttitudeProfile::GravityTurn { heading } => {
                heading
            }
        }
    }

    pub fn attitude_at(&self, altitude: f64) -> Attitude {
        match *self {
            AttitudeProfile::Hold { pitch, heading } => Attitude { pitch, heading },
            AttitudeProfile::GravityTurn { heading } => Attitude {
                pitch: gravity_turn_pitch(altitude),
                heading,
            },
        }
    }
}

/// Runs a profile for one ascent. A gravity turn starts with the roll
/// program: straight up on the current heading until the vehicle is clear of
/// the pad, then over to the compass heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeProgram {
    profile: AttitudeProfile,
    rolled: bool,
}

impl AttitudeProgram {
    pub fn new(profile: AttitudeProfile) -> Self {
        AttitudeProgram {
            profile,
            rolled: !matches!(profile, AttitudeProfile::GravityTurn { .. }),
        }
    }

    pub fn profile(&self) -> AttitudeProfile {
        self.profile
    }

    pub fn is_rolled(&self) -> bool {
        self.rolled
    }

    pub fn attitude_for(&mut self, sample: &TelemetrySample, elapsed_time: f64) -> Attitude {
        if !self.rolled {
            if sample.vertical_speed < ROLL_VERTICAL_SPEED && elapsed_time <= ROLL_MAX_TIME {
                return Attitude {
                    pitch: MAX_PITCH,
                    heading: sample.heading.unwrap_or_else(|| self.profile.heading()),
                };
            }
            self.rolled = true;
            info!(
                heading = self.profile.heading(),
                vertical_speed = sample.vertical_speed,
                elapsed_time,
                "Roll program complete"
            );
        }
        self.profile.attitude_at(sample.altitude)
    }
}

/// Pitch in degrees for the given altitude. Vertical on the pad, tipping
/// toward the horizon and never flatter than `MIN_PITCH`.
pub fn gravity_turn_pitch(altitude: f64) -> f64 {
    // Past the vertex the quadratic turns back up; hold the flattest pitch.
    let vertex = -GRAVITY_TURN_B / (2.0 * GRAVITY_TURN_A);
    let altitude = altitude.clamp(0.0, vertex);
    let pitch = GRAVITY_TURN_A * altitude.powi(2) + GRAVITY_TURN_B * altitude + GRAVITY_TURN_C;
    pitch.clamp(MIN_PITCH, MAX_PITCH)
}
