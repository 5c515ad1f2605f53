use std::process::ExitCode;
use std::time::Duration;

use ascent_autopilot::*;
use clap::{Parser, ValueEnum};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Unit {
    M,
    Km,
}

impl Unit {
    fn meters(&self, value: f64) -> f64 {
        match self {
            Unit::M => value,
            Unit::Km => value * 1000.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Metric {
    Apoapsis,
    Altitude,
}

/// Flies a powered ascent: stages whenever thrust is lost and keeps the
/// throttle open until the target altitude or apoapsis is reached.
#[derive(Parser, Debug)]
#[command(name = "ascent")]
#[command(version)]
#[command(about = "Automated powered ascent with auto staging")]
struct Cli {
    /// Target value, in the unit selected by --unit
    #[arg(long, default_value_t = DEFAULT_TARGET_VALUE)]
    target: f64,

    /// Unit of --target and --tolerance
    #[arg(long, value_enum, default_value_t = Unit::M)]
    unit: Unit,

    /// Which reading has to reach the target
    #[arg(long, value_enum, default_value_t = Metric::Apoapsis)]
    metric: Metric,

    /// How far below the target still counts as reached
    #[arg(long, default_value_t = 0.0)]
    tolerance: f64,

    /// Compass heading for the gravity turn, in degrees
    #[arg(long, default_value_t = DEFAULT_COMPASS_HEADING)]
    compass: f64,

    /// Hold thrust-to-weight ratio instead of running at full throttle
    #[arg(long)]
    auto_throttle: bool,

    /// Thrust-to-weight ratio held by --auto-throttle
    #[arg(long, default_value_t = DEFAULT_TARGET_TWR)]
    target_twr: f64,

    /// Stage again after this many coasting cycles without thrust (0 disables)
    #[arg(long, default_value_t = DEFAULT_RESTAGE_CYCLES)]
    restage_cycles: u32,

    /// Exponential smoothing factor in (0, 1] for the target reading
    #[arg(long)]
    smoothing: Option<f64>,

    /// Wait between telemetry polls, in milliseconds
    #[arg(long, env = "ASCENT_POLL_MS", default_value_t = 100)]
    poll_ms: u64,

    /// Give up after this many cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Simulated seconds per control cycle
    #[arg(long, default_value_t = SIM_TIME_STEP)]
    sim_dt: f64,

    /// Relative thrust sensor noise of the simulated vehicle
    #[arg(long, default_value_t = 0.0)]
    thrust_noise: f64,

    /// Seed for the simulated sensor noise
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn ascent_target(&self) -> Result<AscentTarget, AscentError> {
        let metric = match self.metric {
            Metric::Apoapsis => TargetMetric::Apoapsis,
            Metric::Altitude => TargetMetric::Altitude,
        };
        AscentTarget::with_tolerance(
            metric,
            self.unit.meters(self.target),
            self.unit.meters(self.tolerance),
        )
    }

    fn loop_config(&self) -> LoopConfig {
        let throttle_mode = if self.auto_throttle {
            ThrottleMode::TwrHold {
                target_twr: self.target_twr,
            }
        } else {
            ThrottleMode::Full
        };
        LoopConfig {
            poll_interval: Duration::from_millis(self.poll_ms),
            max_cycles: self.max_cycles,
            throttle_mode,
            staging_policy: StagingPolicy {
                restage_after: Some(self.restage_cycles).filter(|&n| n > 0),
            },
            smoothing: self.smoothing,
            attitude: Some(AttitudeProfile::GravityTurn {
                heading: self.compass,
            }),
            thrust_monitor: ThrustMonitor::default(),
        }
    }

    fn sim_config(&self) -> SimConfig {
        SimConfig {
            time_step: self.sim_dt,
            thrust_noise: self.thrust_noise,
            seed: self.seed,
            ..SimConfig::default()
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

fn fly(
    target: AscentTarget,
    config: LoopConfig,
    sim_config: SimConfig,
    stop: StopHandle,
) -> Result<RunReport, AscentError> {
    let vehicle = SimHandle::new(SimulatedVehicle::new(sim_config)?);
    ControlLoop::new(vehicle.clone(), vehicle, target, config)?
        .with_stop_handle(stop)
        .run()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let target = match cli.ascent_target() {
        Ok(target) => target,
        Err(e) => {
            error!(error = %e, "Invalid arguments");
            return ExitCode::from(e.exit_code());
        }
    };
    let config = cli.loop_config();
    let sim_config = cli.sim_config();

    let stop = StopHandle::new();
    let interrupt = stop.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, stopping after the current cycle");
            interrupt.stop();
        }
    });

    info!(goal = %target, auto_throttle = cli.auto_throttle, "Launching");
    match tokio::task::spawn_blocking(move || fly(target, config, sim_config, stop)).await {
        Ok(Ok(report)) => {
            println!("{}", report.flight_log.summary());
            match report.outcome {
                RunOutcome::TargetReached => info!("Ascent complete"),
                RunOutcome::Cancelled => warn!("Ascent sequence interrupted by operator"),
                RunOutcome::CycleLimit => warn!(cycles = report.cycles, "Cycle limit reached"),
            }
            ExitCode::from(report.outcome.exit_code())
        }
        Ok(Err(e)) if e.is_fatal() => {
            error!(error = %e, "Ascent failed, vehicle link lost");
            ExitCode::from(e.exit_code())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Ascent not started");
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            error!(error = %e, "Control loop task failed");
            ExitCode::FAILURE
        }
    }
}
