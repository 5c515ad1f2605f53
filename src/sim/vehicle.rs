use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::constants::{GRAVITY, SIM_PAYLOAD_MASS, SIM_TIME_STEP};
use crate::errors::AscentError;
use crate::sim::stage::{SimStage, StageSpec, StageStatus};
use crate::telemetry_system::link::{CommandSink, ControlCommand, TelemetrySource};
use crate::telemetry_system::sample::{ResourceKind, TelemetrySample};

// Share of stage propellant reported as liquid fuel, the rest is oxidizer.
const LIQUID_FUEL_SHARE: f64 = 0.45;
const ELECTRIC_CHARGE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub time_step: f64,
    pub stages: Vec<StageSpec>,
    pub payload_mass: f64,
    pub thrust_noise: f64,
    pub seed: u64,
    pub fail_telemetry_from: Option<u64>,
    pub reject_commands_from: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            time_step: SIM_TIME_STEP,
            stages: vec![
                StageSpec::new(6_000.0, 1_500.0, 100.0, 250_000.0),
                StageSpec::new(6_000.0, 800.0, 40.0, 120_000.0),
            ],
            payload_mass: SIM_PAYLOAD_MASS,
            thrust_noise: 0.0,
            seed: 0,
            fail_telemetry_from: None,
            reject_commands_from: None,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), AscentError> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(AscentError::InvalidConfig(format!(
                "simulation time step must be positive, got {}",
                self.time_step
            )));
        }
        if !(0.0..1.0).contains(&self.thrust_noise) {
            return Err(AscentError::InvalidConfig(format!(
                "thrust noise must be in [0, 1), got {}",
                self.thrust_noise
            )));
        }
        // The payload keeps the vehicle mass positive once every stage is gone.
        if !(self.payload_mass.is_finite() && self.payload_mass > 0.0) {
            return Err(AscentError::InvalidConfig(format!(
                "payload mass must be positive, got {}",
                self.payload_mass
            )));
        }
        Ok(())
    }
}

/// Vertical point-mass flight over a flat body with constant gravity. Just
/// enough of a vehicle to exercise staging and guidance end to end.
pub struct SimulatedVehicle {
    stages: Vec<SimStage>,
    active: Option<usize>,
    next: usize,
    payload_mass: f64,
    altitude: f64,
    vertical_speed: f64,
    elapsed_time: f64,
    time_step: f64,
    thrust_noise: f64,
    rng: StdRng,
    polls: u64,
    commands: u64,
    stage_commands: u64,
    last_command: Option<ControlCommand>,
    fail_telemetry_from: Option<u64>,
    reject_commands_from: Option<u64>,
}

impl SimulatedVehicle {
    pub fn new(config: SimConfig) -> Result<Self, AscentError> {
        config.validate()?;
        Ok(SimulatedVehicle {
            stages: config.stages.into_iter().map(SimStage::new).collect(),
            active: None,
            next: 0,
            payload_mass: config.payload_mass,
            altitude: 0.0,
            vertical_speed: 0.0,
            elapsed_time: 0.0,
            time_step: config.time_step,
            thrust_noise: config.thrust_noise,
            rng: StdRng::seed_from_u64(config.seed),
            polls: 0,
            commands: 0,
            stage_commands: 0,
            last_command: None,
            fail_telemetry_from: config.fail_telemetry_from,
            reject_commands_from: config.reject_commands_from,
        })
    }

    /// Jettisons the burning stage and ignites the next one. With nothing
    /// left to separate this does nothing.
    pub fn stage(&mut self) {
        if let Some(index) = self.active.take() {
            self.stages[index].jettison();
        }
        if let Some(stage) = self.stages.get_mut(self.next) {
            stage.ignite();
            self.active = Some(self.next);
            self.next += 1;
        }
        debug!(active = ?self.active, "Simulated vehicle staged");
    }

    pub fn step(&mut self, throttle: f64, delta_time: f64) {
        let thrust = match self.active {
            Some(index) => self.stages[index].burn(throttle, delta_time),
            None => 0.0,
        };
        let acceleration = thrust / self.get_total_mass() - GRAVITY;

        self.vertical_speed += acceleration * delta_time;
        self.altitude += self.vertical_speed * delta_time;
        if self.altitude <= 0.0 {
            self.altitude = 0.0;
            self.vertical_speed = self.vertical_speed.max(0.0);
        }
        self.elapsed_time += delta_time;
    }

    pub fn sample(&mut self) -> TelemetrySample {
        let mut thrust = self.current_thrust();
        if thrust > 0.0 && self.thrust_noise > 0.0 {
            thrust *= 1.0 + self.rng.gen_range(-self.thrust_noise..=self.thrust_noise);
        }
        let propellant = self.active.map_or(0.0, |i| self.stages[i].fuel_mass);

        TelemetrySample::new(thrust, self.altitude, self.apoapsis())
            .with_vertical_speed(self.vertical_speed)
            .with_universal_time(self.elapsed_time)
            .with_resource(ResourceKind::LiquidFuel, propellant * LIQUID_FUEL_SHARE)
            .with_resource(ResourceKind::Oxidizer, propellant * (1.0 - LIQUID_FUEL_SHARE))
            .with_resource(ResourceKind::ElectricCharge, ELECTRIC_CHARGE)
            .with_mass(self.get_total_mass(), GRAVITY)
    }

    pub fn current_thrust(&self) -> f64 {
        self.active.map_or(0.0, |i| self.stages[i].current_thrust)
    }

    /// Ballistic estimate of the highest point of the current trajectory.
    pub fn apoapsis(&self) -> f64 {
        if self.vertical_speed > 0.0 {
            self.altitude + self.vertical_speed.powi(2) / (2.0 * GRAVITY)
        } else {
            self.altitude
        }
    }

    pub fn get_total_mass(&self) -> f64 {
        self.payload_mass
            + self
                .stages
                .iter()
                .filter(|stage| stage.is_attached())
                .map(SimStage::get_total_mass)
                .sum::<f64>()
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    pub fn vertical_speed(&self) -> f64 {
        self.vertical_speed
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn stage_commands(&self) -> u64 {
        self.stage_commands
    }

    pub fn commands_received(&self) -> u64 {
        self.commands
    }

    pub fn last_command(&self) -> Option<ControlCommand> {
        self.last_command
    }

    pub fn stages_remaining(&self) -> usize {
        self.stages
            .iter()
            .filter(|stage| stage.status != StageStatus::Jettisoned)
            .count()
    }
}

impl TelemetrySource for SimulatedVehicle {
    fn get_telemetry(&mut self) -> Result<TelemetrySample, AscentError> {
        self.polls += 1;
        if matches!(self.fail_telemetry_from, Some(n) if self.polls >= n) {
            return Err(AscentError::TelemetryUnavailable(format!(
                "simulated link dropped on poll {}",
                self.polls
            )));
        }
        Ok(self.sample())
    }
}

impl CommandSink for SimulatedVehicle {
    fn send_command(&mut self, command: &ControlCommand) -> Result<(), AscentError> {
        self.commands += 1;
        if matches!(self.reject_commands_from, Some(n) if self.commands >= n) {
            return Err(AscentError::CommandRejected(format!(
                "simulated vehicle not controllable on command {}",
                self.commands
            )));
        }
        if command.staged {
            self.stage_commands += 1;
            self.stage();
        }
        self.step(command.throttle, self.time_step);
        self.last_command = Some(*command);
        Ok(())
    }
}

/// Cloneable handle so one simulated vehicle can serve as both the telemetry
/// source and the command sink of a control loop.
#[derive(Clone)]
pub struct SimHandle {
    inner: Arc<Mutex<SimulatedVehicle>>,
}

impl SimHandle {
    pub fn new(vehicle: SimulatedVehicle) -> Self {
        SimHandle {
            inner: Arc::new(Mutex::new(vehicle)),
        }
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, SimulatedVehicle>, AscentError> {
        self.inner
            .lock()
            .map_err(|_| AscentError::TelemetryUnavailable("simulated vehicle poisoned".to_string()))
    }
}

impl TelemetrySource for SimHandle {
    fn get_telemetry(&mut self) -> Result<TelemetrySample, AscentError> {
        self.lock()?.get_telemetry()
    }
}

impl CommandSink for SimHandle {
    fn send_command(&mut self, command: &ControlCommand) -> Result<(), AscentError> {
        let mut vehicle = self
            .inner
            .lock()
            .map_err(|_| AscentError::CommandRejected("simulated vehicle poisoned".to_string()))?;
        vehicle.send_command(command)
    }
}
