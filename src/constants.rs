use std::time::Duration;

// Physical Constants
pub const GRAVITY: f64 = 9.81; // m/s²

// Thrust Monitor
pub const THRUST_EPSILON: f64 = 1e-3; // N, absorbs sensor noise around zero
pub const PROPELLANT_EPSILON: f64 = 1e-6; // units of resource

// Control Loop Parameters
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_RESTAGE_CYCLES: u32 = 10; // ~1 s between separations while coasting

// Ascent Target Defaults
pub const DEFAULT_TARGET_VALUE: f64 = 90_000.0; // m
pub const DEFAULT_COMPASS_HEADING: f64 = 90.0; // degrees

// Gravity Turn Profile (pitch in degrees as a function of altitude in m)
pub const GRAVITY_TURN_A: f64 = 1.48272e-8;
pub const GRAVITY_TURN_B: f64 = -0.00229755;
pub const GRAVITY_TURN_C: f64 = 90.0;
pub const MIN_PITCH: f64 = 2.0; // degrees
pub const MAX_PITCH: f64 = 90.0; // degrees
pub const ROLL_VERTICAL_SPEED: f64 = 60.0; // m/s
pub const ROLL_MAX_TIME: f64 = 15.0; // s

// Auto Throttle (TWR hold)
pub const DEFAULT_TARGET_TWR: f64 = 1.6;
pub const TWR_KP: f64 = 0.005;
pub const TWR_KI: f64 = 0.5;
pub const TWR_KD: f64 = 0.0;

// Simulated Vehicle
pub const SIM_TIME_STEP: f64 = 0.1; // s
pub const SIM_PAYLOAD_MASS: f64 = 1_500.0; // kg
