//! The driver that owns one ascent from first poll to termination.
//!
//! Every cycle is a strict read → decide → send round-trip against the
//! vehicle link. Cancellation through [`StopHandle`] is only looked at between
//! cycles, so a read or a send that has started always completes.
//!
//! Time steps come from the vehicle clock (`universal_time`) when the source
//! reports one and from the wall clock otherwise.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::constants::POLL_INTERVAL;
use crate::control::attitude::{AttitudeProfile, AttitudeProgram};
use crate::control::guidance::{AscentController, ThrottleMode};
use crate::control::mission::AscentTarget;
use crate::control::staging::{StagingPolicy, StagingStateMachine, VehicleState};
use crate::control::thrust_monitor::ThrustMonitor;
use crate::errors::AscentError;
use crate::telemetry_system::flight_log::FlightLog;
use crate::telemetry_system::link::{CommandSink, ControlCommand, TelemetrySource};
use crate::telemetry_system::sample::TelemetrySample;

#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    pub poll_interval: Duration,
    pub max_cycles: Option<u64>,
    pub throttle_mode: ThrottleMode,
    pub staging_policy: StagingPolicy,
    pub smoothing: Option<f64>,
    pub attitude: Option<AttitudeProfile>,
    pub thrust_monitor: ThrustMonitor,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            poll_interval: POLL_INTERVAL,
            max_cycles: None,
            throttle_mode: ThrottleMode::Full,
            staging_policy: StagingPolicy::default(),
            smoothing: None,
            attitude: None,
            thrust_monitor: ThrustMonitor::default(),
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<(), AscentError> {
        if self.max_cycles == Some(0) {
            return Err(AscentError::InvalidConfig(
                "cycle limit must be at least one".to_string(),
            ));
        }
        self.throttle_mode.validate()?;
        self.staging_policy.validate()?;
        if let Some(profile) = &self.attitude {
            profile.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    TargetReached,
    Cancelled,
    CycleLimit,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::TargetReached => 0,
            RunOutcome::CycleLimit => 5,
            RunOutcome::Cancelled => 130,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub cycles: u64,
    pub vehicle_state: VehicleState,
    pub flight_log: FlightLog,
}

pub struct ControlLoop<S, C> {
    source: S,
    sink: C,
    config: LoopConfig,
    monitor: ThrustMonitor,
    staging: StagingStateMachine,
    controller: AscentController,
    attitude: Option<AttitudeProgram>,
    flight_log: FlightLog,
    stop: StopHandle,
    cycles: u64,
    launch_time: Option<f64>,
    last_vehicle_time: Option<f64>,
}

impl<S: TelemetrySource, C: CommandSink> ControlLoop<S, C> {
    pub fn new(
        source: S,
        sink: C,
        target: AscentTarget,
        config: LoopConfig,
    ) -> Result<Self, AscentError> {
        config.validate()?;
        let staging = StagingStateMachine::new(config.staging_policy)?;
        let controller = AscentController::new(target, config.throttle_mode, config.smoothing)?;
        let attitude = config.attitude.map(AttitudeProgram::new);
        Ok(ControlLoop {
            source,
            sink,
            monitor: config.thrust_monitor,
            config,
            staging,
            controller,
            attitude,
            flight_log: FlightLog::new(),
            stop: StopHandle::new(),
            cycles: 0,
            launch_time: None,
            last_vehicle_time: None,
        })
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Polls until the target is reached, the operator stops the run, or the
    /// cycle limit runs out. A failed read or a rejected command ends the run
    /// on the spot.
    pub fn run(mut self) -> Result<RunReport, AscentError> {
        info!(
            goal = %self.controller.target(),
            thrust_epsilon = self.monitor.thrust_epsilon(),
            "Ascent started"
        );
        let started = Instant::now();
        let mut previous_cycle: Option<Instant> = None;

        let outcome = loop {
            if self.stop.is_stopped() {
                info!(cycles = self.cycles, "Ascent interrupted by operator");
                break RunOutcome::Cancelled;
            }
            if let Some(limit) = self.config.max_cycles {
                if self.cycles >= limit {
                    info!(cycles = self.cycles, "Cycle limit reached before target");
                    break RunOutcome::CycleLimit;
                }
            }

            let now = Instant::now();
            let wall_delta = previous_cycle.map_or(0.0, |p| (now - p).as_secs_f64());
            previous_cycle = Some(now);

            match self.step(wall_delta, (now - started).as_secs_f64()) {
                Ok(true) => break RunOutcome::TargetReached,
                Ok(false) => {}
                Err(e) => {
                    error!(cycle = self.cycles, error = %e, "Ascent aborted");
                    return Err(e);
                }
            }

            if !self.config.poll_interval.is_zero() {
                thread::sleep(self.config.poll_interval);
            }
        };

        info!(?outcome, cycles = self.cycles, "Ascent terminated");
        Ok(RunReport {
            outcome,
            cycles: self.cycles,
            vehicle_state: self.staging.into_vehicle_state(),
            flight_log: self.flight_log,
        })
    }

    /// One full cycle. Returns whether the target has been reached. The wall
    /// clock figures are used only when the sample carries no vehicle time.
    pub fn step(&mut self, wall_delta: f64, wall_elapsed: f64) -> Result<bool, AscentError> {
        let sample = self.source.get_telemetry()?;
        let (delta_time, elapsed_time) = self.vehicle_clock(&sample, wall_delta, wall_elapsed);

        let is_thrusting = self.monitor.is_thrusting(&sample);
        let staging = self.staging.advance(is_thrusting, &sample);
        let guidance = self.controller.update(&sample, delta_time);

        let attitude = self
            .attitude
            .as_mut()
            .map(|program| program.attitude_for(&sample, elapsed_time));
        let command =
            ControlCommand::new(guidance.throttle, staging.is_some()).with_attitude(attitude);
        self.sink.send_command(&command)?;

        debug!(
            cycle = self.cycles,
            thrust = sample.thrust,
            altitude = sample.altitude,
            apoapsis = sample.apoapsis,
            is_thrusting,
            state = %self.staging.state(),
            throttle = command.throttle,
            staged = command.staged,
            "Cycle complete"
        );

        self.flight_log.record_cycle(
            elapsed_time,
            &sample,
            self.staging.state(),
            staging.as_ref(),
            &command,
        );
        self.cycles += 1;
        Ok(guidance.done)
    }

    fn vehicle_clock(
        &mut self,
        sample: &TelemetrySample,
        wall_delta: f64,
        wall_elapsed: f64,
    ) -> (f64, f64) {
        let Some(now) = sample.universal_time.filter(|t| t.is_finite()) else {
            return (wall_delta, wall_elapsed);
        };
        let launch = *self.launch_time.get_or_insert(now);
        let delta_time = self
            .last_vehicle_time
            .map_or(0.0, |previous| (now - previous).max(0.0));
        self.last_vehicle_time = Some(now);
        (delta_time, now - launch)
    }
}
