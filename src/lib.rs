pub mod constants;
pub mod control;
pub mod errors;
pub mod sim;
pub mod telemetry_system;

pub use constants::*;
pub use control::attitude::{AttitudeProfile, AttitudeProgram};
pub use control::control_loop::{ControlLoop, LoopConfig, RunOutcome, RunReport, StopHandle};
pub use control::guidance::{AscentController, GuidanceOutput, ThrottleMode};
pub use control::mission::{AscentTarget, TargetMetric};
pub use control::staging::{
    StagingEvent, StagingPolicy, StagingReason, StagingState, StagingStateMachine, VehicleState,
};
pub use control::thrust_monitor::ThrustMonitor;
pub use errors::AscentError;

// Re-export commonly used items from sim
pub use sim::stage::StageSpec;
pub use sim::vehicle::{SimConfig, SimHandle, SimulatedVehicle};

// Re-export commonly used items from telemetry_system
pub use telemetry_system::flight_log::FlightLog;
pub use telemetry_system::link::{Attitude, CommandSink, ControlCommand, TelemetrySource};
pub use telemetry_system::sample::{ResourceKind, TelemetrySample};
