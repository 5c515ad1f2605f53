use std::fmt;
use std::time::Instant;

use tracing::{info, warn};

use crate::errors::AscentError;
use crate::telemetry_system::sample::TelemetrySample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingState {
    Powered,
    CoastingNoThrust,
    StagingIssued,
}

impl fmt::Display for StagingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagingState::Powered => write!(f, "POWERED"),
            StagingState::CoastingNoThrust => write!(f, "COASTING_NO_THRUST"),
            StagingState::StagingIssued => write!(f, "STAGING_ISSUED"),
        }
    }
}

/// Why a separation was commanded. None of these stops the ascent: a thrust
/// loss with propellant left is staged just the same, only louder in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingReason {
    Ignition,
    ResourcesDepleted,
    ThrustLost,
}

impl fmt::Display for StagingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagingReason::Ignition => write!(f, "ignition"),
            StagingReason::ResourcesDepleted => write!(f, "resources depleted"),
            StagingReason::ThrustLost => write!(f, "thrust lost"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingEvent {
    pub stage_index: u32,
    pub reason: StagingReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub current_stage_index: u32,
    pub is_thrusting: bool,
    pub last_staging_event_time: Option<Instant>,
}

impl VehicleState {
    fn new() -> Self {
        VehicleState {
            current_stage_index: 0,
            is_thrusting: false,
            last_staging_event_time: None,
        }
    }
}

/// `restage_after: Some(n)` stages again after `n` consecutive coasting
/// cycles without thrust. `None` stages only on a thrust-loss edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StagingPolicy {
    pub restage_after: Option<u32>,
}

impl StagingPolicy {
    pub fn validate(&self) -> Result<(), AscentError> {
        match self.restage_after {
            Some(0) => Err(AscentError::InvalidConfig(
                "re-stage interval must be at least one cycle".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

pub struct StagingStateMachine {
    state: StagingState,
    vehicle: VehicleState,
    policy: StagingPolicy,
    coast_cycles: u32,
    thrust_seen: bool,
}

impl StagingStateMachine {
    /// Starts armed in `Powered`, so a vehicle on the pad with no thrust is
    /// staged (ignited) on the first cycle.
    pub fn new(policy: StagingPolicy) -> Result<Self, AscentError> {
        policy.validate()?;
        Ok(StagingStateMachine {
            state: StagingState::Powered,
            vehicle: VehicleState::new(),
            policy,
            coast_cycles: 0,
            thrust_seen: false,
        })
    }

    pub fn state(&self) -> StagingState {
        self.state
    }

    pub fn vehicle_state(&self) -> &VehicleState {
        &self.vehicle
    }

    pub fn into_vehicle_state(self) -> VehicleState {
        self.vehicle
    }

    /// Runs one cycle. Returns the staging event when separation has to be
    /// commanded this cycle; at most one per call and never two calls in a
    /// row.
    pub fn advance(
        &mut self,
        is_thrusting: bool,
        sample: &TelemetrySample,
    ) -> Option<StagingEvent> {
        self.vehicle.is_thrusting = is_thrusting;

        if is_thrusting {
            self.thrust_seen = true;
            self.coast_cycles = 0;
            self.state = StagingState::Powered;
            return None;
        }

        match self.state {
            StagingState::Powered => Some(self.issue(sample)),
            StagingState::StagingIssued => {
                // Cooldown: telemetry may lag one tick behind the separation.
                self.coast_cycles = 1;
                self.state = StagingState::CoastingNoThrust;
                None
            }
            StagingState::CoastingNoThrust => {
                self.coast_cycles = self.coast_cycles.saturating_add(1);
                match self.policy.restage_after {
                    Some(interval) if self.coast_cycles >= interval => Some(self.issue(sample)),
                    _ => None,
                }
            }
        }
    }

    fn issue(&mut self, sample: &TelemetrySample) -> StagingEvent {
        let reason = if !self.thrust_seen {
            StagingReason::Ignition
        } else if sample.is_stage_depleted() {
            StagingReason::ResourcesDepleted
        } else {
            StagingReason::ThrustLost
        };

        self.vehicle.current_stage_index = self.vehicle.current_stage_index.saturating_add(1);
        self.vehicle.last_staging_event_time = Some(Instant::now());
        self.coast_cycles = 0;
        self.state = StagingState::StagingIssued;

        let stage_index = self.vehicle.current_stage_index;
        match reason {
            StagingReason::ThrustLost => warn!(
                stage_index,
                propellant = sample.total_propellant(),
                altitude = sample.altitude,
                "Thrust is zero with propellant remaining, staging anyway"
            ),
            _ => info!(stage_index, %reason, altitude = sample.altitude, "Activating next stage"),
        }

        StagingEvent {
            stage_index,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::thrust_monitor::ThrustMonitor;
    use crate::telemetry_system::sample::ResourceKind;

    fn run_thrust_sequence(
        machine: &mut StagingStateMachine,
        thrusts: &[f64],
    ) -> Vec<Option<StagingEvent>> {
        let monitor = ThrustMonitor::default();
        thrusts
            .iter()
            .map(|&thrust| {
                let sample = TelemetrySample::new(thrust, 20_000.0, 30_000.0);
                machine.advance(monitor.is_thrusting(&sample), &sample)
            })
            .collect()
    }

    fn staged_cycles(events: &[Option<StagingEvent>]) -> Vec<usize> {
        events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.map(|_| i))
            .collect()
    }

    #[test]
    fn test_staging_on_first_thrust_loss_only() {
        let mut machine = StagingStateMachine::new(StagingPolicy::default()).unwrap();
        let events = run_thrust_sequence(&mut machine, &[5.0, 0.0, 0.0, 6.0]);

        assert_eq!(staged_cycles(&events), vec![1]);
        assert_eq!(machine.state(), StagingState::Powered);
        assert_eq!(machine.vehicle_state().current_stage_index, 1);
    }

    #[test]
    fn test_consecutive_zero_thrust_stages_once() {
        let mut machine = StagingStateMachine::new(StagingPolicy::default()).unwrap();
        let mut thrusts = vec![100.0];
        thrusts.extend(std::iter::repeat(0.0).take(25));
        let events = run_thrust_sequence(&mut machine, &thrusts);

        assert_eq!(
            staged_cycles(&events),
            vec![1],
            "A run of zero-thrust samples must yield exactly one staging command"
        );
        assert_eq!(machine.state(), StagingState::CoastingNoThrust);
    }

    #[test]
    fn test_state_transitions() {
        let mut machine = StagingStateMachine::new(StagingPolicy::default()).unwrap();
        let sample = TelemetrySample::new(0.0, 0.0, 0.0);

        machine.advance(true, &sample);
        assert_eq!(machine.state(), StagingState::Powered);
        machine.advance(false, &sample);
        assert_eq!(machine.state(), StagingState::StagingIssued);
        machine.advance(false, &sample);
        assert_eq!(machine.state(), StagingState::CoastingNoThrust);
        machine.advance(true, &sample);
        assert_eq!(machine.state(), StagingState::Powered);
    }

    #[test]
    fn test_thrust_relost_after_recovery_stages_again() {
        let mut machine = StagingStateMachine::new(StagingPolicy::default()).unwrap();
        let events = run_thrust_sequence(&mut machine, &[5.0, 0.0, 0.0, 6.0, 0.0, 0.0]);

        assert_eq!(staged_cycles(&events), vec![1, 4]);
        assert_eq!(machine.vehicle_state().current_stage_index, 2);
    }

    #[test]
    fn test_never_stages_in_consecutive_cycles() {
        for interval in 1..5 {
            let mut machine = StagingStateMachine::new(StagingPolicy {
                restage_after: Some(interval),
            })
            .unwrap();
            let events = run_thrust_sequence(&mut machine, &[0.0; 40]);
            let staged = staged_cycles(&events);

            assert!(!staged.is_empty());
            for pair in staged.windows(2) {
                assert!(
                    pair[1] - pair[0] >= 2,
                    "Interval {} staged at consecutive cycles {:?}",
                    interval,
                    pair
                );
            }
        }
    }

    #[test]
    fn test_restage_policy_cadence() {
        let mut machine = StagingStateMachine::new(StagingPolicy {
            restage_after: Some(10),
        })
        .unwrap();
        let mut thrusts = vec![50.0];
        thrusts.extend(std::iter::repeat(0.0).take(31));
        let events = run_thrust_sequence(&mut machine, &thrusts);

        assert_eq!(staged_cycles(&events), vec![1, 11, 21, 31]);
    }

    #[test]
    fn test_stage_index_is_monotonic() {
        let mut machine = StagingStateMachine::new(StagingPolicy {
            restage_after: Some(3),
        })
        .unwrap();
        let monitor = ThrustMonitor::default();
        let mut last_index = 0;

        for i in 0..60 {
            let thrust = if i % 7 < 3 { 10.0 } else { 0.0 };
            let sample = TelemetrySample::new(thrust, 0.0, 0.0);
            machine.advance(monitor.is_thrusting(&sample), &sample);
            let index = machine.vehicle_state().current_stage_index;
            assert!(index >= last_index, "Stage index went backwards at cycle {}", i);
            last_index = index;
        }
    }

    #[test]
    fn test_is_thrusting_tracks_latest_sample() {
        let mut machine = StagingStateMachine::new(StagingPolicy::default()).unwrap();
        let sample = TelemetrySample::new(0.0, 0.0, 0.0);

        machine.advance(true, &sample);
        assert!(machine.vehicle_state().is_thrusting);
        machine.advance(false, &sample);
        assert!(!machine.vehicle_state().is_thrusting);
    }

    #[test]
    fn test_staging_reasons() {
        let mut machine = StagingStateMachine::new(StagingPolicy::default()).unwrap();
        let on_pad = TelemetrySample::new(0.0, 0.0, 0.0)
            .with_resource(ResourceKind::LiquidFuel, 500.0);
        let ignition = machine.advance(false, &on_pad).unwrap();
        assert_eq!(ignition.reason, StagingReason::Ignition);
        assert_eq!(ignition.stage_index, 1);

        machine.advance(true, &on_pad);
        let dry = TelemetrySample::new(0.0, 9_000.0, 14_000.0)
            .with_resource(ResourceKind::LiquidFuel, 0.0);
        let separation = machine.advance(false, &dry).unwrap();
        assert_eq!(separation.reason, StagingReason::ResourcesDepleted);

        machine.advance(true, &dry);
        let throttled_down = TelemetrySample::new(0.0, 12_000.0, 20_000.0)
            .with_resource(ResourceKind::LiquidFuel, 120.0);
        let ambiguous = machine.advance(false, &throttled_down).unwrap();
        assert_eq!(
            ambiguous.reason,
            StagingReason::ThrustLost,
            "Thrust absence with fuel left is still staged"
        );
        assert!(machine.vehicle_state().last_staging_event_time.is_some());
    }

    #[test]
    fn test_thrust_loss_without_resource_readings_is_depletion() {
        let mut machine = StagingStateMachine::new(StagingPolicy::default()).unwrap();
        let bare = TelemetrySample::new(0.0, 1_000.0, 1_000.0);

        machine.advance(true, &bare);
        let event = machine.advance(false, &bare).unwrap();
        assert_eq!(event.reason, StagingReason::ResourcesDepleted);
        assert_eq!(event.stage_index, 1);
    }

    #[test]
    fn test_zero_restage_interval_rejected() {
        let result = StagingStateMachine::new(StagingPolicy {
            restage_after: Some(0),
        });
        assert!(matches!(result, Err(AscentError::InvalidConfig(_))));
    }
}
