use std::fmt;

use crate::control::staging::{StagingEvent, StagingReason, StagingState};
use crate::telemetry_system::link::ControlCommand;
use crate::telemetry_system::sample::TelemetrySample;

#[derive(Debug, Clone, PartialEq)]
pub struct StagingRecord {
    pub cycle: u64,
    pub elapsed_time: f64,
    pub stage_index: u32,
    pub reason: StagingReason,
    pub altitude: f64,
}

/// Running record of one ascent: peaks, staging events and state changes.
#[derive(Debug, Clone, Default)]
pub struct FlightLog {
    cycles: u64,
    elapsed_time: f64,
    max_altitude: f64,
    max_apoapsis: f64,
    min_propellant: Option<f64>,
    last_throttle: f64,
    staging_events: Vec<StagingRecord>,
    state_times: Vec<(StagingState, f64)>,
}

impl FlightLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(
        &mut self,
        elapsed_time: f64,
        sample: &TelemetrySample,
        state: StagingState,
        staging: Option<&StagingEvent>,
        command: &ControlCommand,
    ) {
        self.cycles += 1;
        self.elapsed_time = elapsed_time;
        self.last_throttle = command.throttle;

        if sample.altitude > self.max_altitude {
            self.max_altitude = sample.altitude;
        }
        if sample.apoapsis > self.max_apoapsis {
            self.max_apoapsis = sample.apoapsis;
        }
        if !sample.stage_resources.is_empty() {
            let propellant = sample.total_propellant();
            self.min_propellant = Some(self.min_propellant.map_or(propellant, |m| m.min(propellant)));
        }

        if let Some(event) = staging {
            self.staging_events.push(StagingRecord {
                cycle: self.cycles - 1,
                elapsed_time,
                stage_index: event.stage_index,
                reason: event.reason,
                altitude: sample.altitude,
            });
        }

        match self.state_times.last() {
            Some((last_state, _)) if *last_state == state => {}
            _ => self.state_times.push((state, elapsed_time)),
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn max_altitude(&self) -> f64 {
        self.max_altitude
    }

    pub fn max_apoapsis(&self) -> f64 {
        self.max_apoapsis
    }

    pub fn min_propellant(&self) -> Option<f64> {
        self.min_propellant
    }

    pub fn last_throttle(&self) -> f64 {
        self.last_throttle
    }

    pub fn staging_events(&self) -> &[StagingRecord] {
        &self.staging_events
    }

    pub fn state_times(&self) -> &[(StagingState, f64)] {
        &self.state_times
    }

    pub fn format_time(elapsed_time: f64) -> String {
        if elapsed_time >= 3600.0 {
            let hours = (elapsed_time / 3600.0).floor();
            let minutes = ((elapsed_time % 3600.0) / 60.0).floor();
            let seconds = elapsed_time % 60.0;
            format!("{:.0}h {:.0}m {:.2}s", hours, minutes, seconds)
        } else if elapsed_time >= 60.0 {
            let minutes = (elapsed_time / 60.0).floor();
            let seconds = elapsed_time % 60.0;
            format!("{:.0}m {:.2}s", minutes, seconds)
        } else {
            format!("{:.2}s", elapsed_time)
        }
    }

    pub fn format_altitude(altitude: f64) -> String {
        if altitude.abs() >= 1000.0 {
            format!("{:.2} km", altitude / 1000.0)
        } else {
            format!("{:.2} m", altitude)
        }
    }

    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FlightLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Ascent Summary ---")?;
        writeln!(f, "Cycles: {}", self.cycles)?;
        writeln!(f, "Elapsed: {}", Self::format_time(self.elapsed_time))?;
        writeln!(f, "Max Altitude: {}", Self::format_altitude(self.max_altitude))?;
        writeln!(f, "Max Apoapsis: {}", Self::format_altitude(self.max_apoapsis))?;
        if let Some(propellant) = self.min_propellant {
            writeln!(f, "Min Propellant: {:.2}", propellant)?;
        }
        writeln!(f, "Final Throttle: {:.2}", self.last_throttle)?;

        writeln!(f, "\n--- Staging Events ---")?;
        if self.staging_events.is_empty() {
            writeln!(f, "none")?;
        }
        for record in &self.staging_events {
            writeln!(
                f,
                "Stage {} ({}) at {} | cycle {} | altitude {}",
                record.stage_index,
                record.reason,
                Self::format_time(record.elapsed_time),
                record.cycle,
                Self::format_altitude(record.altitude)
            )?;
        }

        writeln!(f, "\n--- State Transitions ---")?;
        for (state, time) in &self.state_times {
            writeln!(f, "State {} reached at: {}", state, Self::format_time(*time))?;
        }
        Ok(())
    }
}
