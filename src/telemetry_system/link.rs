//! Seams to the vehicle: where telemetry comes from and where commands go.
//!
//! Both sides are blocking request/response calls. The control loop is their
//! only client and never overlaps a read with a send.

use crate::errors::AscentError;
use crate::telemetry_system::sample::TelemetrySample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub pitch: f64,   // degrees above the horizon
    pub heading: f64, // compass degrees
}

/// Everything the vehicle is told in a single control cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCommand {
    pub throttle: f64,
    pub staged: bool,
    pub attitude: Option<Attitude>,
}

impl ControlCommand {
    pub fn new(throttle: f64, staged: bool) -> Self {
        ControlCommand {
            throttle: throttle.clamp(0.0, 1.0),
            staged,
            attitude: None,
        }
    }

    pub fn with_attitude(mut self, attitude: Option<Attitude>) -> Self {
        self.attitude = attitude;
        self
    }
}

pub trait TelemetrySource {
    /// Fails with [`AscentError::TelemetryUnavailable`] once the link is lost.
    fn get_telemetry(&mut self) -> Result<TelemetrySample, AscentError>;
}

pub trait CommandSink {
    /// Fails with [`AscentError::CommandRejected`] when the vehicle refuses
    /// the command.
    fn send_command(&mut self, command: &ControlCommand) -> Result<(), AscentError>;
}

impl<T: TelemetrySource + ?Sized> TelemetrySource for Box<T> {
    fn get_telemetry(&mut self) -> Result<TelemetrySample, AscentError> {
        (**self).get_telemetry()
    }
}

impl<C: CommandSink + ?Sized> CommandSink for Box<C> {
    fn send_command(&mut self, command: &ControlCommand) -> Result<(), AscentError> {
        (**self).send_command(command)
    }
}
