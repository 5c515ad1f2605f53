#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSpec {
    pub fuel_mass: f64,  // kg
    pub dry_mass: f64,   // kg
    pub burn_rate: f64,  // kg/s at full throttle
    pub max_thrust: f64, // N at full throttle
}

impl StageSpec {
    pub fn new(fuel_mass: f64, dry_mass: f64, burn_rate: f64, max_thrust: f64) -> Self {
        StageSpec {
            fuel_mass,
            dry_mass,
            burn_rate,
            max_thrust,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Stacked,
    Burning,
    Jettisoned,
}

pub struct SimStage {
    pub spec: StageSpec,
    pub fuel_mass: f64,
    pub current_thrust: f64,
    pub status: StageStatus,
}

impl SimStage {
    pub fn new(spec: StageSpec) -> Self {
        SimStage {
            spec,
            fuel_mass: spec.fuel_mass,
            current_thrust: 0.0,
            status: StageStatus::Stacked,
        }
    }

    pub fn ignite(&mut self) {
        if self.status == StageStatus::Stacked {
            self.status = StageStatus::Burning;
        }
    }

    pub fn jettison(&mut self) {
        self.status = StageStatus::Jettisoned;
        self.current_thrust = 0.0;
    }

    /// Burns for `delta_time` seconds and returns the average thrust over the
    /// step. A stage that runs dry part way only pushes for the time it had.
    pub fn burn(&mut self, throttle: f64, delta_time: f64) -> f64 {
        let throttle = throttle.clamp(0.0, 1.0);
        if self.status != StageStatus::Burning || self.is_depleted() || delta_time <= 0.0 {
            self.current_thrust = 0.0;
            return 0.0;
        }

        let demand = throttle * self.spec.burn_rate * delta_time;
        if demand <= 0.0 {
            self.current_thrust = 0.0;
            return 0.0;
        }

        let consumed = demand.min(self.fuel_mass);
        self.fuel_mass -= consumed;
        let average_thrust = self.spec.max_thrust * throttle * (consumed / demand);
        self.current_thrust = if self.is_depleted() {
            0.0
        } else {
            self.spec.max_thrust * throttle
        };
        average_thrust
    }

    pub fn is_depleted(&self) -> bool {
        self.fuel_mass <= 0.0
    }

    pub fn is_attached(&self) -> bool {
        self.status != StageStatus::Jettisoned
    }

    pub fn get_total_mass(&self) -> f64 {
        self.fuel_mass + self.spec.dry_mass
    }
}
